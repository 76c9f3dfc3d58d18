//! # Auction Lifecycle Tests
//!
//! End-to-end scenarios driven through the inbound ports with the in-memory
//! store and bank.
//!
//! ## Test Categories
//!
//! 1. **Fixed-price matching** - immediate fills, partial fills, sold out
//! 2. **Batch clearing** - single clearing price, eligibility, refunds
//! 3. **Tick semantics** - idempotence, per-auction isolation
//! 4. **Cancellation and admission** - state machine guards
//! 5. **Allow-list caps** - cumulative limits without side effects
//! 6. **Vesting** - weighted releases, Finished transition
//! 7. **Queries** - filter composition, string filters

use std::cell::Cell;
use std::rc::Rc;

use fundraising::{
    query_auctions, query_bids, Address, AllowedBidder, AuctionFilter, AuctionSpec, AuctionStatus,
    AuctionType, AuctionsRequest, Bank, BankError, BatchOperation, BidFilter, BidsRequest,
    CallContext, Coin, Dec, FundraisingApi, FundraisingError, FundraisingParams,
    FundraisingQueryApi, FundraisingService, InMemoryBank, InMemoryKVStore, KeyValueStore,
    LedgerOp, MissingAllowancePolicy, Reserve, StoreError, VestingSchedule,
};
use proptest::prelude::*;

// =============================================================================
// TEST HELPERS
// =============================================================================

const AUCTIONEER: u64 = 1;
const M: u128 = 1_000_000;
const INITIAL: u128 = 1_000 * M;

type Service = FundraisingService<InMemoryKVStore, InMemoryBank>;

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn ctx(sender: u64, now: u64) -> CallContext {
    CallContext::new(addr(sender), now)
}

fn dec(s: &str) -> Dec {
    s.parse().unwrap()
}

fn paying(amount: u128) -> Coin {
    Coin::new("denom2", amount)
}

fn funded_bank() -> InMemoryBank {
    let mut bank = InMemoryBank::new();
    bank.mint(addr(AUCTIONEER), Coin::new("denom1", INITIAL));
    for bidder in 2..=6 {
        bank.mint(addr(bidder), paying(INITIAL));
    }
    bank
}

fn service() -> Service {
    FundraisingService::new(InMemoryKVStore::new(), funded_bank())
}

fn service_with(params: FundraisingParams) -> Service {
    FundraisingService::with_params(InMemoryKVStore::new(), funded_bank(), params).unwrap()
}

/// Fixed-price auction selling `supply` denom1 at `price`, open over [10, 20).
fn fixed_price(svc: &mut Service, price: &str, supply: u128) -> u64 {
    let spec = AuctionSpec::fixed_price(dec(price), Coin::new("denom1", supply), "denom2", 10, 20);
    svc.create_fixed_price_auction(ctx(AUCTIONEER, 0), spec)
        .unwrap()
        .id
}

/// Batch auction with floor 0.5 selling `supply` denom1, open over [10, 20).
fn batch(svc: &mut Service, supply: u128, schedules: Vec<VestingSchedule>) -> u64 {
    let spec = AuctionSpec::batch(dec("1"), dec("0.5"), Coin::new("denom1", supply), "denom2", 10, 20)
        .with_vesting(schedules);
    svc.create_batch_auction(ctx(AUCTIONEER, 0), spec)
        .unwrap()
        .id
}

fn balance(svc: &Service, who: u64, denom: &str) -> u128 {
    svc.bank().balance(&addr(who), denom)
}

fn sequences(bids: &[fundraising::Bid]) -> Vec<(u64, u64)> {
    bids.iter().map(|b| (b.auction_id, b.sequence)).collect()
}

/// Bank that refuses any movement touching one auction's selling reserve.
struct FrozenReserveBank {
    inner: InMemoryBank,
    frozen: Option<u64>,
}

impl Bank for FrozenReserveBank {
    fn spendable(&self, account: &Address, denom: &str) -> u128 {
        self.inner.spendable(account, denom)
    }

    fn reserve_balance(&self, reserve: &Reserve, denom: &str) -> u128 {
        self.inner.reserve_balance(reserve, denom)
    }

    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), BankError> {
        let touches_frozen = ops.iter().any(|op| match op {
            LedgerOp::Escrow { into: r, .. } | LedgerOp::Release { from: r, .. } => {
                Some(*r) == self.frozen.map(Reserve::Selling)
            }
        });
        if touches_frozen {
            return Err(BankError::Overflow {
                account: "frozen".into(),
            });
        }
        self.inner.apply(ops)
    }
}

/// Store whose batch writes fail while `failing` is set.
struct FailingStore {
    inner: InMemoryKVStore,
    failing: Rc<Cell<bool>>,
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        if self.failing.get() {
            return Err(StoreError::Io {
                message: "disk full".into(),
            });
        }
        self.inner.atomic_batch_write(operations)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.inner.prefix_scan(prefix)
    }
}

fn failing_store_service() -> (FundraisingService<FailingStore, InMemoryBank>, Rc<Cell<bool>>) {
    let failing = Rc::new(Cell::new(false));
    let store = FailingStore {
        inner: InMemoryKVStore::new(),
        failing: Rc::clone(&failing),
    };
    (FundraisingService::new(store, funded_bank()), failing)
}

// =============================================================================
// 1. FIXED-PRICE MATCHING
// =============================================================================

#[test]
fn test_fixed_price_bid_fully_filled() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1.0", 1_000);
    svc.on_logical_tick(10).unwrap();

    let bid = svc
        .place_bid(ctx(2, 11), id, dec("1.0"), paying(100))
        .unwrap();
    assert_eq!(bid.sequence, 1);
    assert!(bid.eligible);

    let allocation = &svc.allocations(id).unwrap()[0];
    assert_eq!(allocation.selling_amount, 100);
    assert_eq!(allocation.paying_amount, 100);
    assert_eq!(balance(&svc, 2, "denom2"), INITIAL - 100);
    assert_eq!(svc.auction(id).unwrap().remaining_selling_coin.amount, 900);
}

#[test]
fn test_fixed_price_bid_against_short_supply_is_refunded() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1.0", 160);
    svc.on_logical_tick(10).unwrap();

    svc.place_bid(ctx(2, 11), id, dec("1.0"), paying(100))
        .unwrap();
    svc.place_bid(ctx(3, 12), id, dec("1.0"), paying(100))
        .unwrap();

    let allocations = svc.allocations(id).unwrap();
    assert_eq!(allocations[1].selling_amount, 60);
    assert_eq!(allocations[1].paying_amount, 60);
    // 40 refunded immediately
    assert_eq!(balance(&svc, 3, "denom2"), INITIAL - 60);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Paying(id), "denom2"), 160);

    let auction = svc.auction(id).unwrap();
    assert!(auction.is_sold_out());
    assert_eq!(auction.status, AuctionStatus::Started);

    let summary = svc.on_logical_tick(13).unwrap();
    assert_eq!(summary.settled, vec![id]);
    assert_eq!(svc.auction(id).unwrap().status, AuctionStatus::Finished);
    assert_eq!(balance(&svc, 3, "denom1"), 60);
    assert_eq!(balance(&svc, AUCTIONEER, "denom2"), 160);
}

#[test]
fn test_fixed_price_rejects_other_prices() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1.0", 1_000);
    svc.on_logical_tick(10).unwrap();

    assert!(matches!(
        svc.place_bid(ctx(2, 11), id, dec("1.1"), paying(100)),
        Err(FundraisingError::PriceMismatch { .. })
    ));
}

// =============================================================================
// 2. BATCH CLEARING
// =============================================================================

#[test]
fn test_batch_clearing_scenario() {
    let mut svc = service();
    let id = batch(&mut svc, 50 * M, vec![]);
    svc.on_logical_tick(10).unwrap();

    svc.place_bid(ctx(2, 11), id, dec("2"), paying(40 * M)).unwrap();
    svc.place_bid(ctx(3, 11), id, dec("1.5"), paying(30 * M)).unwrap();
    svc.place_bid(ctx(4, 11), id, dec("1"), paying(60 * M)).unwrap();
    // same price as the third bid, later sequence
    svc.place_bid(ctx(5, 12), id, dec("1"), paying(10 * M)).unwrap();

    let pending = svc.bids(BidFilter::for_auction(id).eligible(true)).unwrap();
    assert!(pending.is_empty());

    let summary = svc.on_logical_tick(20).unwrap();
    assert_eq!(summary.settled, vec![id]);
    assert_eq!(summary.finished, vec![id]);

    let auction = svc.auction(id).unwrap();
    assert_eq!(auction.clearing_price, Some(dec("1")));
    assert_eq!(auction.remaining_selling_coin.amount, 0);
    assert_eq!(auction.status, AuctionStatus::Finished);

    let eligible: Vec<_> = svc
        .bids(BidFilter::for_auction(id))
        .unwrap()
        .iter()
        .map(|b| b.eligible)
        .collect();
    assert_eq!(eligible, vec![true, true, true, false]);

    let allocations: Vec<_> = svc
        .allocations(id)
        .unwrap()
        .iter()
        .map(|a| (a.sequence, a.selling_amount, a.paying_amount))
        .collect();
    assert_eq!(
        allocations,
        vec![(1, 20 * M, 20 * M), (2, 20 * M, 20 * M), (3, 10 * M, 10 * M)]
    );

    // everyone pays the clearing price, the rest comes back
    assert_eq!(balance(&svc, 2, "denom2"), INITIAL - 20 * M);
    assert_eq!(balance(&svc, 3, "denom2"), INITIAL - 20 * M);
    assert_eq!(balance(&svc, 4, "denom2"), INITIAL - 10 * M);
    assert_eq!(balance(&svc, 5, "denom2"), INITIAL);
    assert_eq!(balance(&svc, 2, "denom1"), 20 * M);
    assert_eq!(balance(&svc, 4, "denom1"), 10 * M);
    assert_eq!(balance(&svc, AUCTIONEER, "denom2"), 50 * M);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Paying(id), "denom2"), 0);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Selling(id), "denom1"), 0);
}

#[test]
fn test_undersubscribed_batch_clears_at_floor() {
    let mut svc = service();
    let id = batch(&mut svc, 100 * M, vec![]);
    svc.on_logical_tick(10).unwrap();

    svc.place_bid(ctx(2, 11), id, dec("2"), paying(20 * M)).unwrap();
    svc.on_logical_tick(20).unwrap();

    let auction = svc.auction(id).unwrap();
    assert_eq!(auction.clearing_price, Some(dec("0.5")));
    // 10M units demanded at 2, paid at the 0.5 floor
    assert_eq!(balance(&svc, 2, "denom1"), 10 * M);
    assert_eq!(balance(&svc, 2, "denom2"), INITIAL - 5 * M);
    assert_eq!(auction.remaining_selling_coin.amount, 90 * M);
    assert_eq!(balance(&svc, AUCTIONEER, "denom1"), INITIAL - 10 * M);
}

#[test]
fn test_batch_rejects_bids_below_floor() {
    let mut svc = service();
    let id = batch(&mut svc, 50 * M, vec![]);
    svc.on_logical_tick(10).unwrap();

    assert!(matches!(
        svc.place_bid(ctx(2, 11), id, dec("0.4"), paying(M)),
        Err(FundraisingError::BelowMinimumPrice { .. })
    ));
}

// =============================================================================
// 3. TICK SEMANTICS
// =============================================================================

#[test]
fn test_repeated_tick_changes_nothing() {
    let mut svc = service();
    let id = batch(
        &mut svc,
        50 * M,
        vec![
            VestingSchedule::new(20, dec("0.5")),
            VestingSchedule::new(30, dec("0.5")),
        ],
    );
    svc.on_logical_tick(10).unwrap();
    svc.place_bid(ctx(2, 11), id, dec("2"), paying(40 * M)).unwrap();
    svc.place_bid(ctx(3, 11), id, dec("1"), paying(60 * M)).unwrap();

    let first = svc.on_logical_tick(20).unwrap();
    assert_eq!(first.settled, vec![id]);
    assert_eq!(first.releases, 1);

    let store = svc.store().clone();
    let bank = svc.bank().clone();

    let second = svc.on_logical_tick(20).unwrap();
    assert!(second.is_noop());
    assert_eq!(svc.store(), &store);
    assert_eq!(svc.bank(), &bank);
}

#[test]
fn test_failing_auction_does_not_block_others() {
    let bank = FrozenReserveBank {
        inner: funded_bank(),
        frozen: None,
    };
    let mut svc = FundraisingService::new(InMemoryKVStore::new(), bank);
    for _ in 0..2 {
        let spec = AuctionSpec::fixed_price(Dec::ONE, Coin::new("denom1", 100), "denom2", 10, 20);
        svc.create_fixed_price_auction(ctx(AUCTIONEER, 0), spec)
            .unwrap();
    }
    svc.on_logical_tick(10).unwrap();
    svc.place_bid(ctx(2, 11), 1, Dec::ONE, paying(50)).unwrap();
    svc.place_bid(ctx(2, 11), 2, Dec::ONE, paying(50)).unwrap();

    svc.bank_mut().frozen = Some(1);
    let summary = svc.on_logical_tick(20).unwrap();
    assert_eq!(summary.settled, vec![2]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, 1);
    assert_eq!(svc.auction(1).unwrap().status, AuctionStatus::Started);
    assert_eq!(svc.auction(2).unwrap().status, AuctionStatus::Finished);
    assert!(svc.allocations(1).unwrap().len() == 1);

    svc.bank_mut().frozen = None;
    let summary = svc.on_logical_tick(21).unwrap();
    assert_eq!(summary.settled, vec![1]);
    assert_eq!(svc.auction(1).unwrap().status, AuctionStatus::Finished);
    assert_eq!(svc.bank().inner.balance(&addr(2), "denom1"), 100);
}

#[test]
fn test_late_first_tick_runs_every_due_transition() {
    let mut svc = service();
    let id = batch(&mut svc, 50 * M, vec![VestingSchedule::new(25, Dec::ONE)]);

    let summary = svc.on_logical_tick(30).unwrap();
    assert_eq!(summary.started, vec![id]);
    assert_eq!(summary.settled, vec![id]);
    assert_eq!(summary.finished, vec![id]);

    let auction = svc.auction(id).unwrap();
    assert_eq!(auction.status, AuctionStatus::Finished);
    // no bids: the whole supply goes back
    assert_eq!(balance(&svc, AUCTIONEER, "denom1"), INITIAL);
}

#[test]
fn test_failed_store_write_reverses_bid_escrow() {
    let (mut svc, failing) = failing_store_service();
    let spec = AuctionSpec::fixed_price(Dec::ONE, Coin::new("denom1", 1_000), "denom2", 10, 20);
    let id = svc
        .create_fixed_price_auction(ctx(AUCTIONEER, 0), spec)
        .unwrap()
        .id;
    svc.on_logical_tick(10).unwrap();

    failing.set(true);
    assert!(matches!(
        svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(300)),
        Err(FundraisingError::Store(StoreError::Io { .. }))
    ));
    assert_eq!(svc.bank().balance(&addr(2), "denom2"), INITIAL);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Paying(id), "denom2"), 0);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Selling(id), "denom1"), 1_000);

    failing.set(false);
    assert!(svc.bids(BidFilter::for_auction(id)).unwrap().is_empty());
    svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(300)).unwrap();
    assert_eq!(svc.bank().balance(&addr(2), "denom2"), INITIAL - 300);
    assert_eq!(svc.bids(BidFilter::for_auction(id)).unwrap().len(), 1);
}

#[test]
fn test_failed_store_write_reverses_cancel_refund() {
    let (mut svc, failing) = failing_store_service();
    let spec = AuctionSpec::fixed_price(Dec::ONE, Coin::new("denom1", 1_000), "denom2", 10, 20);
    let id = svc
        .create_fixed_price_auction(ctx(AUCTIONEER, 0), spec)
        .unwrap()
        .id;

    failing.set(true);
    assert!(svc.cancel_auction(ctx(AUCTIONEER, 5), id).is_err());
    assert_eq!(svc.bank().balance(&addr(AUCTIONEER), "denom1"), INITIAL - 1_000);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Selling(id), "denom1"), 1_000);

    failing.set(false);
    assert_eq!(svc.auction(id).unwrap().status, AuctionStatus::Standby);
    svc.cancel_auction(ctx(AUCTIONEER, 5), id).unwrap();
    assert_eq!(svc.bank().balance(&addr(AUCTIONEER), "denom1"), INITIAL);
}

// =============================================================================
// 4. CANCELLATION AND ADMISSION
// =============================================================================

#[test]
fn test_cancel_standby_auction_returns_escrow() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1", 1_000);
    assert_eq!(balance(&svc, AUCTIONEER, "denom1"), INITIAL - 1_000);

    assert!(matches!(
        svc.cancel_auction(ctx(2, 5), id),
        Err(FundraisingError::Unauthorized(_))
    ));

    let cancelled = svc.cancel_auction(ctx(AUCTIONEER, 5), id).unwrap();
    assert_eq!(cancelled.status, AuctionStatus::Cancelled);
    assert_eq!(balance(&svc, AUCTIONEER, "denom1"), INITIAL);

    let summary = svc.on_logical_tick(10).unwrap();
    assert!(summary.is_noop());
    assert_eq!(svc.auction(id).unwrap().status, AuctionStatus::Cancelled);
}

#[test]
fn test_cancel_after_start_is_illegal() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1", 1_000);
    svc.on_logical_tick(10).unwrap();

    assert!(matches!(
        svc.cancel_auction(ctx(AUCTIONEER, 11), id),
        Err(FundraisingError::IllegalTransition {
            from: AuctionStatus::Started,
            to: AuctionStatus::Cancelled,
            ..
        })
    ));

    svc.on_logical_tick(20).unwrap();
    assert!(matches!(
        svc.cancel_auction(ctx(AUCTIONEER, 21), id),
        Err(FundraisingError::IllegalTransition { .. })
    ));
}

#[test]
fn test_bids_outside_window_are_rejected() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1", 1_000);

    assert!(matches!(
        svc.place_bid(ctx(2, 5), id, Dec::ONE, paying(10)),
        Err(FundraisingError::AuctionNotStarted { .. })
    ));
    svc.on_logical_tick(10).unwrap();
    assert!(matches!(
        svc.place_bid(ctx(2, 20), id, Dec::ONE, paying(10)),
        Err(FundraisingError::AuctionNotStarted { .. })
    ));
    assert!(matches!(
        svc.place_bid(ctx(2, 11), 99, Dec::ONE, paying(10)),
        Err(FundraisingError::NotFound(_))
    ));
}

#[test]
fn test_insufficient_funds_leaves_no_bid() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1", 1_000);
    svc.on_logical_tick(10).unwrap();

    assert!(matches!(
        svc.place_bid(ctx(9, 11), id, Dec::ONE, paying(10)),
        Err(FundraisingError::InsufficientFunds {
            required: 10,
            available: 0
        })
    ));
    assert!(svc.bids(BidFilter::for_auction(id)).unwrap().is_empty());
}

#[test]
fn test_invalid_specs_are_rejected() {
    let mut svc = service();
    let inverted = AuctionSpec::fixed_price(Dec::ONE, Coin::new("denom1", 10), "denom2", 20, 10);
    assert!(matches!(
        svc.create_fixed_price_auction(ctx(AUCTIONEER, 0), inverted),
        Err(FundraisingError::InvalidAuctionSpec(_))
    ));

    let bad_weights = AuctionSpec::fixed_price(Dec::ONE, Coin::new("denom1", 10), "denom2", 10, 20)
        .with_vesting(vec![
            VestingSchedule::new(30, dec("0.5")),
            VestingSchedule::new(40, dec("0.4")),
        ]);
    assert!(matches!(
        svc.create_fixed_price_auction(ctx(AUCTIONEER, 0), bad_weights),
        Err(FundraisingError::InvalidVestingSchedule(_))
    ));
    assert!(svc.auctions(AuctionFilter::default()).unwrap().is_empty());
    assert_eq!(balance(&svc, AUCTIONEER, "denom1"), INITIAL);
}

// =============================================================================
// 5. ALLOW-LIST CAPS
// =============================================================================

fn allow_list_params(policy: MissingAllowancePolicy) -> FundraisingParams {
    FundraisingParams {
        enable_allowed_bidder_limits: true,
        missing_allowance_policy: policy,
        ..Default::default()
    }
}

#[test]
fn test_cap_applies_across_bids() {
    let mut svc = service_with(allow_list_params(MissingAllowancePolicy::Disallowed));
    let id = batch(&mut svc, 500 * M, vec![]);
    svc.add_allowed_bidders(ctx(7, 5), id, vec![AllowedBidder::new(addr(2), 100 * M)])
        .unwrap();
    svc.on_logical_tick(10).unwrap();

    svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(60 * M)).unwrap();
    assert_eq!(
        svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(50 * M)),
        Err(FundraisingError::AllowedAmountExceeded {
            cap: 100 * M,
            attempted: 110 * M
        })
    );
    // the rejected bid escrowed nothing
    assert_eq!(balance(&svc, 2, "denom2"), INITIAL - 60 * M);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Paying(id), "denom2"), 60 * M);
    assert_eq!(svc.bids(BidFilter::for_auction(id)).unwrap().len(), 1);

    svc.place_bid(ctx(2, 12), id, Dec::ONE, paying(40 * M)).unwrap();
    assert!(matches!(
        svc.place_bid(ctx(2, 12), id, Dec::ONE, paying(1)),
        Err(FundraisingError::AllowedAmountExceeded { .. })
    ));

    assert_eq!(
        svc.place_bid(ctx(3, 12), id, Dec::ONE, paying(M)),
        Err(FundraisingError::BidderNotAllowed(id))
    );
}

#[test]
fn test_auctioneer_updates_cap() {
    let mut svc = service_with(allow_list_params(MissingAllowancePolicy::Disallowed));
    let spec = AuctionSpec::batch(dec("1"), dec("0.5"), Coin::new("denom1", 500 * M), "denom2", 10, 20)
        .with_allowed_bidders(vec![AllowedBidder::new(addr(2), 10 * M)]);
    let id = svc.create_batch_auction(ctx(AUCTIONEER, 0), spec).unwrap().id;
    svc.on_logical_tick(10).unwrap();

    assert!(svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(20 * M)).is_err());
    assert_eq!(
        svc.update_allowed_bidder(ctx(2, 11), id, addr(2), 30 * M),
        Err(FundraisingError::Unauthorized(id))
    );
    svc.update_allowed_bidder(ctx(AUCTIONEER, 11), id, addr(2), 30 * M)
        .unwrap();
    svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(20 * M)).unwrap();

    assert_eq!(
        svc.allowed_bidder(id, addr(2)).unwrap(),
        AllowedBidder::new(addr(2), 30 * M)
    );
    assert!(matches!(
        svc.allowed_bidder(id, addr(3)),
        Err(FundraisingError::NotFound(_))
    ));
}

#[test]
fn test_missing_entry_uses_default_cap() {
    let params = FundraisingParams {
        default_max_bid_amount: Some(5 * M),
        ..allow_list_params(MissingAllowancePolicy::Unlimited)
    };
    let mut svc = service_with(params);
    let id = batch(&mut svc, 500 * M, vec![]);
    svc.on_logical_tick(10).unwrap();

    svc.place_bid(ctx(3, 11), id, Dec::ONE, paying(5 * M)).unwrap();
    assert!(matches!(
        svc.place_bid(ctx(3, 11), id, Dec::ONE, paying(1)),
        Err(FundraisingError::AllowedAmountExceeded { .. })
    ));
}

#[test]
fn test_allow_list_ignored_when_disabled() {
    let mut svc = service();
    let spec = AuctionSpec::batch(dec("1"), dec("0.5"), Coin::new("denom1", 500 * M), "denom2", 10, 20)
        .with_allowed_bidders(vec![AllowedBidder::new(addr(2), M)]);
    let id = svc.create_batch_auction(ctx(AUCTIONEER, 0), spec).unwrap().id;

    assert_eq!(
        svc.add_allowed_bidders(ctx(2, 5), id, vec![AllowedBidder::new(addr(3), M)]),
        Err(FundraisingError::AllowListDisabled)
    );

    svc.on_logical_tick(10).unwrap();
    svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(10 * M)).unwrap();
    svc.place_bid(ctx(3, 11), id, Dec::ONE, paying(10 * M)).unwrap();
    assert_eq!(svc.allowed_bidders(id).unwrap().len(), 1);
}

// =============================================================================
// 6. VESTING
// =============================================================================

#[test]
fn test_batch_vesting_releases_pro_rata() {
    let mut svc = service();
    let id = batch(
        &mut svc,
        30 * M,
        vec![
            VestingSchedule::new(30, dec("0.25")),
            VestingSchedule::new(40, dec("0.25")),
            VestingSchedule::new(50, dec("0.5")),
        ],
    );
    svc.on_logical_tick(10).unwrap();
    svc.place_bid(ctx(2, 11), id, dec("1"), paying(10 * M + 1)).unwrap();
    svc.place_bid(ctx(3, 11), id, dec("1"), paying(20 * M - 1)).unwrap();

    let summary = svc.on_logical_tick(20).unwrap();
    assert_eq!(summary.settled, vec![id]);
    assert!(summary.finished.is_empty());
    assert_eq!(svc.auction(id).unwrap().status, AuctionStatus::Vesting);
    assert_eq!(svc.vestings(id).unwrap().len(), 3);
    assert_eq!(balance(&svc, 2, "denom1"), 0);

    svc.on_logical_tick(35).unwrap();
    // floor(0.25 * 10_000_001)
    assert_eq!(balance(&svc, 2, "denom1"), 2_500_000);
    assert_eq!(balance(&svc, AUCTIONEER, "denom2"), 7_500_000);

    // skipping past both remaining releases disburses them in one tick
    let summary = svc.on_logical_tick(60).unwrap();
    assert_eq!(summary.releases, 2);
    assert_eq!(summary.finished, vec![id]);
    assert_eq!(balance(&svc, 2, "denom1"), 10 * M + 1);
    assert_eq!(balance(&svc, 3, "denom1"), 20 * M - 1);
    assert_eq!(balance(&svc, AUCTIONEER, "denom2"), 30 * M);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Selling(id), "denom1"), 0);
    assert_eq!(svc.bank().reserve_balance(&Reserve::Paying(id), "denom2"), 0);
    assert!(svc.vestings(id).unwrap().iter().all(|v| v.released));
}

// =============================================================================
// 7. QUERIES
// =============================================================================

#[test]
fn test_bid_filters_compose_as_intersection() {
    let mut svc = service();
    let a = batch(&mut svc, 30 * M, vec![]);
    let b = batch(&mut svc, 30 * M, vec![]);
    svc.on_logical_tick(10).unwrap();

    for (bidder, auction, price, amount) in [
        (2, a, "2", 20 * M),
        (3, a, "1", 40 * M),
        (2, a, "0.5", 10 * M),
        (2, b, "1", 10 * M),
        (4, a, "1.5", 15 * M),
        (2, a, "1", 5 * M),
    ] {
        svc.place_bid(ctx(bidder, 11), auction, dec(price), paying(amount))
            .unwrap();
    }
    svc.on_logical_tick(20).unwrap();

    let filtered = svc
        .bids(BidFilter::for_auction(a).bidder(addr(2)).eligible(true))
        .unwrap();

    let by_bidder = svc
        .bids(BidFilter {
            bidder: Some(addr(2)),
            ..Default::default()
        })
        .unwrap();
    let eligible_in_a = svc.bids(BidFilter::for_auction(a).eligible(true)).unwrap();
    let intersection: Vec<_> = eligible_in_a
        .iter()
        .filter(|bid| by_bidder.contains(bid))
        .cloned()
        .collect();

    assert!(!filtered.is_empty());
    assert_eq!(sequences(&filtered), sequences(&intersection));
    assert!(filtered.iter().all(|b| b.bidder == addr(2) && b.eligible));
    assert_eq!(by_bidder.len(), 4);
}

#[test]
fn test_auction_queries_with_string_filters() {
    let mut svc = service();
    let f = fixed_price(&mut svc, "1", 1_000);
    let b = batch(&mut svc, 1_000, vec![]);
    let spec = AuctionSpec::batch(dec("1"), dec("0.5"), Coin::new("denom1", 1_000), "denom2", 50, 60);
    let later = svc.create_batch_auction(ctx(AUCTIONEER, 0), spec).unwrap().id;
    svc.on_logical_tick(10).unwrap();

    let ids = |request: AuctionsRequest| -> Vec<u64> {
        query_auctions(&svc, &request)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect()
    };

    assert_eq!(ids(AuctionsRequest::default()), vec![f, b, later]);
    assert_eq!(
        ids(AuctionsRequest {
            auction_type: Some("AUCTION_TYPE_BATCH".into()),
            status: None,
        }),
        vec![b, later]
    );
    assert_eq!(
        ids(AuctionsRequest {
            auction_type: Some("AUCTION_TYPE_BATCH".into()),
            status: Some("AUCTION_STATUS_STARTED".into()),
        }),
        vec![b]
    );
    assert!(matches!(
        query_auctions(
            &svc,
            &AuctionsRequest {
                auction_type: None,
                status: Some("AUCTION_STATUS_PAUSED".into()),
            }
        ),
        Err(FundraisingError::InvalidRequest(_))
    ));

    assert_eq!(
        svc.auctions(AuctionFilter {
            auction_type: Some(AuctionType::FixedPrice),
            status: Some(AuctionStatus::Standby),
        })
        .unwrap()
        .len(),
        0
    );
}

#[test]
fn test_bid_queries_with_string_filters() {
    let mut svc = service();
    let id = fixed_price(&mut svc, "1", 1_000);
    svc.on_logical_tick(10).unwrap();
    svc.place_bid(ctx(2, 11), id, Dec::ONE, paying(10)).unwrap();
    svc.place_bid(ctx(3, 11), id, Dec::ONE, paying(10)).unwrap();

    let request = BidsRequest {
        auction_id: Some(id),
        bidder: Some(format!("{:#x}", addr(3))),
        eligible: Some("true".into()),
    };
    let bids = query_bids(&svc, &request).unwrap();
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].bidder, addr(3));

    let missing = BidsRequest {
        auction_id: Some(42),
        ..Default::default()
    };
    assert!(matches!(
        query_bids(&svc, &missing),
        Err(FundraisingError::NotFound(_))
    ));
    assert_eq!(svc.params(), FundraisingParams::default());
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_remaining_selling_coin_never_increases(
        amounts in prop::collection::vec(1u128..600, 1..25),
    ) {
        let mut svc = service();
        let id = fixed_price(&mut svc, "1", 2_000);
        svc.on_logical_tick(10).unwrap();

        let mut last = 2_000u128;
        for (i, amount) in amounts.iter().enumerate() {
            let bidder = 2 + (i as u64 % 5);
            let _ = svc.place_bid(ctx(bidder, 11), id, Dec::ONE, paying(*amount));
            let remaining = svc.auction(id).unwrap().remaining_selling_coin.amount;
            prop_assert!(remaining <= last);
            last = remaining;
        }

        svc.on_logical_tick(20).unwrap();
        let auction = svc.auction(id).unwrap();
        prop_assert_eq!(auction.remaining_selling_coin.amount, last);
        let sold: u128 = svc.allocations(id).unwrap().iter().map(|a| a.selling_amount).sum();
        prop_assert_eq!(sold + last, 2_000);
    }

    #[test]
    fn prop_batch_settlement_conserves_funds(
        bids in prop::collection::vec((5u128..30, 1_000u128..1_000_000, 2u64..7), 1..15),
        supply in 1_000u128..5_000_000,
    ) {
        let mut svc = service();
        let id = batch(&mut svc, supply, vec![]);
        svc.on_logical_tick(10).unwrap();

        for (tenths, amount, bidder) in &bids {
            let price = Dec::from_ratio(*tenths, 10).unwrap();
            svc.place_bid(ctx(*bidder, 11), id, price, paying(*amount)).unwrap();
        }
        svc.on_logical_tick(20).unwrap();

        let selling: u128 = (1..=6).map(|who| balance(&svc, who, "denom1")).sum();
        let paying_total: u128 = (1..=6).map(|who| balance(&svc, who, "denom2")).sum();
        prop_assert_eq!(selling, INITIAL);
        prop_assert_eq!(paying_total, 5 * INITIAL);
        prop_assert_eq!(svc.bank().reserve_balance(&Reserve::Selling(id), "denom1"), 0);
        prop_assert_eq!(svc.bank().reserve_balance(&Reserve::Paying(id), "denom2"), 0);
        prop_assert_eq!(svc.auction(id).unwrap().status, AuctionStatus::Finished);
    }
}
