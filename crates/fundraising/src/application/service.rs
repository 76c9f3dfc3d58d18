//! Fundraising Service
//!
//! Implements `FundraisingApi` and `FundraisingQueryApi` over the store and
//! bank ports.
//!
//! Every state-changing call follows the same pipeline:
//! 1. Stage store writes in a `StoreTx` overlay
//! 2. Collect fund movements as `LedgerOp`s
//! 3. Check invariants
//! 4. Apply the ledger ops (all-or-nothing)
//! 5. Commit the store batch
//!
//! An error before step 4 drops the overlay, so nothing changes. A failed
//! commit in step 5 reverses the ledger ops applied in step 4.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use super::bid_ledger::BidLedger;
use super::keys;
use super::overlay::StoreTx;
use super::registry::AuctionRegistry;
use super::vesting_queue::VestingQueue;
use crate::algorithms::{batch, fixed_price};
use crate::config::{FundraisingParams, MissingAllowancePolicy};
use crate::domain::decimal::Dec;
use crate::domain::entities::{
    AllowedBidder, Allocation, Auction, AuctionSpec, Bid, VestingQueueEntry,
};
use crate::domain::errors::FundraisingError;
use crate::domain::invariants::{
    invariant_escrow_covered, invariant_paying_conservation, invariant_remaining_monotonic,
    invariant_selling_conservation,
};
use crate::domain::value_objects::{
    Address, AuctionId, AuctionStatus, AuctionType, Coin, Reserve, Sequence, Timestamp,
};
use crate::domain::vesting;
use crate::ports::inbound::{
    AuctionFilter, BidFilter, CallContext, FundraisingApi, FundraisingQueryApi, TickSummary,
};
use crate::ports::outbound::{Bank, BatchOperation, KeyValueStore, LedgerOp};

/// Auction settlement state machine.
pub struct FundraisingService<S: KeyValueStore, B: Bank> {
    store: S,
    bank: B,
    params: FundraisingParams,
}

impl<S: KeyValueStore, B: Bank> FundraisingService<S, B> {
    /// Create a new service with default params
    pub fn new(store: S, bank: B) -> Self {
        Self {
            store,
            bank,
            params: FundraisingParams::default(),
        }
    }

    /// Create a new service with custom params
    pub fn with_params(store: S, bank: B, params: FundraisingParams) -> Result<Self, FundraisingError> {
        params.validate()?;
        Ok(Self {
            store,
            bank,
            params,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Time of the last processed tick.
    pub fn last_tick(&self) -> Result<Option<Timestamp>, FundraisingError> {
        StoreTx::new(&self.store).get_value(&keys::last_tick())
    }

    fn create_auction(
        &mut self,
        ctx: CallContext,
        spec: AuctionSpec,
        expected: AuctionType,
    ) -> Result<Auction, FundraisingError> {
        let actual = spec.kind.auction_type();
        if actual != expected {
            return Err(FundraisingError::InvalidAuctionSpec(format!(
                "expected {expected} spec, got {actual}"
            )));
        }
        let allowed = spec.allowed_bidders.clone();

        let mut tx = StoreTx::new(&self.store);
        let auction = AuctionRegistry::new(&mut tx).create(
            ctx.sender,
            spec,
            ctx.now,
            self.params.max_vesting_schedules,
        )?;
        let mut ledger = BidLedger::new(&mut tx);
        for entry in &allowed {
            ledger.set_allowed_bidder(auction.id, entry)?;
        }

        let mut ops = vec![LedgerOp::Escrow {
            from: ctx.sender,
            into: Reserve::Selling(auction.id),
            coin: auction.selling_coin.clone(),
        }];
        if let Some(fee) = &self.params.auction_creation_fee {
            ops.push(LedgerOp::Escrow {
                from: ctx.sender,
                into: Reserve::FeeCollector,
                coin: fee.clone(),
            });
        }

        let batch = tx.into_batch();
        self.commit(batch, &ops)?;

        info!(
            auction_id = auction.id,
            auction_type = %auction.auction_type(),
            auctioneer = ?auction.auctioneer,
            selling_coin = %auction.selling_coin,
            start_time = auction.start_time,
            end_time = auction.end_time,
            "Auction created"
        );
        Ok(auction)
    }

    /// Apply `ops` to the bank, then write `batch` to the store.
    ///
    /// A failed store write is compensated by applying the inverse ops in
    /// reverse order before the store error is returned.
    fn commit(&mut self, batch: Vec<BatchOperation>, ops: &[LedgerOp]) -> Result<(), FundraisingError> {
        self.check_escrow(ops)?;
        if !ops.is_empty() {
            self.bank.apply(ops)?;
        }
        if batch.is_empty() {
            return Ok(());
        }
        if let Err(store_err) = self.store.atomic_batch_write(batch) {
            let undo: Vec<LedgerOp> = ops.iter().rev().map(LedgerOp::inverse).collect();
            if !undo.is_empty() {
                if let Err(bank_err) = self.bank.apply(&undo) {
                    error!(
                        error = %bank_err,
                        store_error = %store_err,
                        ops = undo.len(),
                        "Failed to reverse ledger ops after store write failure"
                    );
                    return Err(bank_err.into());
                }
                warn!(
                    error = %store_err,
                    ops = undo.len(),
                    "Store write failed; ledger ops reversed"
                );
            }
            return Err(store_err.into());
        }
        Ok(())
    }

    /// Every reserve can cover what `ops` take out of it.
    fn check_escrow(&self, ops: &[LedgerOp]) -> Result<(), FundraisingError> {
        let overflow = || FundraisingError::InvariantViolation("escrow flow overflow".into());
        let mut flows: BTreeMap<(Reserve, &str), (u128, u128)> = BTreeMap::new();

        for op in ops {
            match op {
                LedgerOp::Escrow { into, coin, .. } => {
                    let flow = flows.entry((*into, coin.denom.as_str())).or_default();
                    flow.0 = flow.0.checked_add(coin.amount).ok_or_else(overflow)?;
                }
                LedgerOp::Release { from, coin, .. } => {
                    let flow = flows.entry((*from, coin.denom.as_str())).or_default();
                    flow.1 = flow.1.checked_add(coin.amount).ok_or_else(overflow)?;
                }
            }
        }

        for ((reserve, denom), (inflow, outflow)) in flows {
            let held = self
                .bank
                .reserve_balance(&reserve, denom)
                .checked_add(inflow)
                .ok_or_else(overflow)?;
            invariant_escrow_covered(outflow, held)?;
        }
        Ok(())
    }

    /// Run every transition of auction `id` due at `now` as one atomic unit.
    fn advance(&mut self, id: AuctionId, now: Timestamp) -> Result<Progress, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        let mut ops = Vec::new();
        let mut progress = Progress::default();

        let before = AuctionRegistry::new(&mut tx).get(id)?;
        let mut auction = before.clone();

        loop {
            match auction.status {
                AuctionStatus::Standby if now >= auction.start_time => {
                    auction = AuctionRegistry::new(&mut tx).update_status(id, AuctionStatus::Started)?;
                    progress.started = true;
                    info!(auction_id = id, now, "Auction started");
                }
                AuctionStatus::Started if settlement_due(&auction, now) => {
                    auction = settle(&mut tx, auction, &mut ops)?;
                    progress.settled = true;
                    progress.finished = auction.status == AuctionStatus::Finished;
                }
                AuctionStatus::Vesting => {
                    let (released, done) = release_due(&mut tx, &auction, now, &mut ops)?;
                    progress.releases += released;
                    if done {
                        auction =
                            AuctionRegistry::new(&mut tx).update_status(id, AuctionStatus::Finished)?;
                        progress.finished = true;
                        info!(auction_id = id, "Vesting complete, auction finished");
                    }
                    break;
                }
                _ => break,
            }
        }

        if tx.is_empty() && ops.is_empty() {
            return Ok(progress);
        }

        let allocations = BidLedger::new(&mut tx).allocations(id)?;
        invariant_remaining_monotonic(&before, &auction)?;
        invariant_selling_conservation(&auction, &allocations)?;

        let batch = tx.into_batch();
        self.commit(batch, &ops)?;
        Ok(progress)
    }
}

impl<S: KeyValueStore, B: Bank> FundraisingApi for FundraisingService<S, B> {
    fn create_fixed_price_auction(
        &mut self,
        ctx: CallContext,
        spec: AuctionSpec,
    ) -> Result<Auction, FundraisingError> {
        self.create_auction(ctx, spec, AuctionType::FixedPrice)
    }

    fn create_batch_auction(
        &mut self,
        ctx: CallContext,
        spec: AuctionSpec,
    ) -> Result<Auction, FundraisingError> {
        self.create_auction(ctx, spec, AuctionType::Batch)
    }

    fn cancel_auction(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
    ) -> Result<Auction, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        let auction = AuctionRegistry::new(&mut tx).get(auction_id)?;

        if auction.status != AuctionStatus::Standby || ctx.now >= auction.start_time {
            return Err(FundraisingError::IllegalTransition {
                auction_id,
                from: auction.status,
                to: AuctionStatus::Cancelled,
            });
        }
        if auction.auctioneer != ctx.sender {
            return Err(FundraisingError::Unauthorized(auction_id));
        }

        let cancelled =
            AuctionRegistry::new(&mut tx).update_status(auction_id, AuctionStatus::Cancelled)?;
        let ops = [LedgerOp::Release {
            from: Reserve::Selling(auction_id),
            to: cancelled.auctioneer,
            coin: cancelled.remaining_selling_coin.clone(),
        }];

        let batch = tx.into_batch();
        self.commit(batch, &ops)?;

        info!(auction_id, "Auction cancelled");
        Ok(cancelled)
    }

    fn place_bid(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
        price: Dec,
        coin: Coin,
    ) -> Result<Bid, FundraisingError> {
        let overflow = || FundraisingError::InvariantViolation("bid quantity overflow".into());

        let mut tx = StoreTx::new(&self.store);
        let mut auction = AuctionRegistry::new(&mut tx).get(auction_id)?;
        let before = auction.clone();

        // 1. Admission window
        if !auction.is_bidding_open(ctx.now) {
            return Err(FundraisingError::AuctionNotStarted {
                auction_id,
                status: auction.status,
            });
        }

        // 2. Coin and price
        if coin.denom != auction.paying_coin_denom {
            return Err(FundraisingError::InvalidBid(format!(
                "bid denom {} does not match paying denom {}",
                coin.denom, auction.paying_coin_denom
            )));
        }
        if coin.is_zero() {
            return Err(FundraisingError::InvalidBid("bid amount must be positive".into()));
        }
        auction.kind.check_bid_price(auction.start_price, price)?;

        // 3. Quantity
        let fill = match auction.auction_type() {
            AuctionType::FixedPrice => {
                if auction.is_sold_out() {
                    return Err(FundraisingError::AuctionSoldOut(auction_id));
                }
                Some(fixed_price::fill(
                    coin.amount,
                    auction.start_price,
                    auction.remaining_selling_coin.amount,
                )?)
            }
            AuctionType::Batch => None,
        };
        let quantity = match &fill {
            Some(fill) => fill.selling_amount,
            None => price.quo_floor(coin.amount).ok_or_else(overflow)?,
        };
        if quantity == 0 {
            return Err(FundraisingError::InvalidBid(format!(
                "{coin} buys no selling coin at price {price}"
            )));
        }

        // 4. Allow-list cap
        check_allowance(&self.params, &mut tx, auction_id, &ctx.sender, coin.amount)?;

        // 5. Funds
        let available = self.bank.spendable(&ctx.sender, &coin.denom);
        if available < coin.amount {
            return Err(FundraisingError::InsufficientFunds {
                required: coin.amount,
                available,
            });
        }

        let mut ops = vec![LedgerOp::Escrow {
            from: ctx.sender,
            into: Reserve::Paying(auction_id),
            coin: coin.clone(),
        }];

        let mut ledger = BidLedger::new(&mut tx);
        let bid = ledger.append(
            auction_id,
            ctx.sender,
            price,
            coin.clone(),
            fill.is_some(),
            ctx.now,
        )?;

        if let Some(fill) = fill {
            invariant_paying_conservation(coin.amount, fill.paying_amount, fill.refund)?;
            ledger.put_allocation(&Allocation {
                auction_id,
                sequence: bid.sequence,
                bidder: ctx.sender,
                selling_amount: fill.selling_amount,
                paying_amount: fill.paying_amount,
            })?;
            if fill.refund > 0 {
                ops.push(LedgerOp::Release {
                    from: Reserve::Paying(auction_id),
                    to: ctx.sender,
                    coin: Coin::new(&coin.denom, fill.refund),
                });
            }

            auction.allocate(fill.selling_amount)?;
            let allocations = ledger.allocations(auction_id)?;
            invariant_selling_conservation(&auction, &allocations)?;
            invariant_remaining_monotonic(&before, &auction)?;
            AuctionRegistry::new(&mut tx).save(&auction)?;

            debug!(
                auction_id,
                sequence = bid.sequence,
                selling_amount = %fill.selling_amount,
                paying_amount = %fill.paying_amount,
                refund = %fill.refund,
                "Fixed-price bid matched"
            );
            if auction.is_sold_out() {
                info!(auction_id, "Fixed-price auction sold out");
            }
        }

        let batch = tx.into_batch();
        self.commit(batch, &ops)?;

        info!(
            auction_id,
            sequence = bid.sequence,
            bidder = ?bid.bidder,
            price = %bid.price,
            coin = %bid.coin,
            "Bid placed"
        );
        Ok(bid)
    }

    fn add_allowed_bidders(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
        entries: Vec<AllowedBidder>,
    ) -> Result<(), FundraisingError> {
        if !self.params.enable_allowed_bidder_limits {
            return Err(FundraisingError::AllowListDisabled);
        }
        if entries.is_empty() {
            return Err(FundraisingError::InvalidRequest(
                "no allowed bidders given".into(),
            ));
        }
        for (i, entry) in entries.iter().enumerate() {
            if entry.max_bid_amount == 0 {
                return Err(FundraisingError::InvalidRequest(format!(
                    "zero cap for allowed bidder {:?}",
                    entry.bidder
                )));
            }
            if entries[..i].iter().any(|e| e.bidder == entry.bidder) {
                return Err(FundraisingError::InvalidRequest(format!(
                    "duplicate allowed bidder {:?}",
                    entry.bidder
                )));
            }
        }

        let mut tx = StoreTx::new(&self.store);
        let auction = AuctionRegistry::new(&mut tx).get(auction_id)?;
        ensure_allow_list_mutable(&auction)?;

        let mut ledger = BidLedger::new(&mut tx);
        for entry in &entries {
            ledger.set_allowed_bidder(auction_id, entry)?;
        }

        let batch = tx.into_batch();
        self.commit(batch, &[])?;

        info!(auction_id, sender = ?ctx.sender, count = entries.len(), "Allowed bidders added");
        Ok(())
    }

    fn update_allowed_bidder(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
        bidder: Address,
        max_bid_amount: u128,
    ) -> Result<(), FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        let auction = AuctionRegistry::new(&mut tx).get(auction_id)?;
        if auction.auctioneer != ctx.sender {
            return Err(FundraisingError::Unauthorized(auction_id));
        }
        ensure_allow_list_mutable(&auction)?;
        if max_bid_amount == 0 {
            return Err(FundraisingError::InvalidRequest(
                "maximum bid amount must be positive".into(),
            ));
        }

        BidLedger::new(&mut tx)
            .set_allowed_bidder(auction_id, &AllowedBidder::new(bidder, max_bid_amount))?;

        let batch = tx.into_batch();
        self.commit(batch, &[])?;

        info!(auction_id, bidder = ?bidder, max_bid_amount = %max_bid_amount, "Allowed bidder updated");
        Ok(())
    }

    fn on_logical_tick(&mut self, now: Timestamp) -> Result<TickSummary, FundraisingError> {
        let last = self.last_tick()?;
        if let Some(last) = last {
            if now < last {
                warn!(now, last_tick = last, "Ignoring tick with regressed clock");
                return Ok(TickSummary::default());
            }
        }

        let mut ids = Vec::new();
        {
            let mut tx = StoreTx::new(&self.store);
            let registry = AuctionRegistry::new(&mut tx);
            for status in [
                AuctionStatus::Standby,
                AuctionStatus::Started,
                AuctionStatus::Vesting,
            ] {
                ids.extend(registry.ids_with_status(status)?);
            }
        }
        ids.sort_unstable();
        ids.dedup();

        let mut summary = TickSummary::default();
        for id in ids {
            match self.advance(id, now) {
                Ok(progress) => progress.record(id, &mut summary),
                Err(err) => {
                    warn!(auction_id = id, error = %err, "Auction transition abandoned");
                    summary.failed.push((id, err));
                }
            }
        }

        if last != Some(now) {
            self.store.atomic_batch_write(vec![BatchOperation::put(
                keys::last_tick(),
                keys::encode(&now)?,
            )])?;
        }

        if summary.is_noop() {
            debug!(now, "Logical tick processed, nothing due");
        } else {
            info!(
                now,
                started = summary.started.len(),
                settled = summary.settled.len(),
                finished = summary.finished.len(),
                releases = summary.releases,
                failed = summary.failed.len(),
                "Logical tick processed"
            );
        }
        Ok(summary)
    }
}

impl<S: KeyValueStore, B: Bank> FundraisingQueryApi for FundraisingService<S, B> {
    fn params(&self) -> FundraisingParams {
        self.params.clone()
    }

    fn auction(&self, auction_id: AuctionId) -> Result<Auction, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        AuctionRegistry::new(&mut tx).get(auction_id)
    }

    fn auctions(&self, filter: AuctionFilter) -> Result<Vec<Auction>, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        let registry = AuctionRegistry::new(&mut tx);
        let auctions = registry.list(filter)?.collect::<Result<Vec<_>, _>>();
        auctions
    }

    fn bid(&self, auction_id: AuctionId, sequence: Sequence) -> Result<Bid, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        BidLedger::new(&mut tx).get(auction_id, sequence)
    }

    fn bids(&self, filter: BidFilter) -> Result<Vec<Bid>, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        if let Some(auction_id) = filter.auction_id {
            AuctionRegistry::new(&mut tx).get(auction_id)?;
            return BidLedger::new(&mut tx).by_auction_filtered(
                auction_id,
                filter.bidder.as_ref(),
                filter.eligible,
            );
        }

        let ledger = BidLedger::new(&mut tx);
        let bids = match &filter.bidder {
            Some(bidder) => ledger.by_bidder(bidder)?,
            None => ledger.all()?,
        };
        Ok(bids.into_iter().filter(|b| filter.matches(b)).collect())
    }

    fn allocations(&self, auction_id: AuctionId) -> Result<Vec<Allocation>, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        AuctionRegistry::new(&mut tx).get(auction_id)?;
        BidLedger::new(&mut tx).allocations(auction_id)
    }

    fn vestings(&self, auction_id: AuctionId) -> Result<Vec<VestingQueueEntry>, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        AuctionRegistry::new(&mut tx).get(auction_id)?;
        VestingQueue::new(&mut tx).entries(auction_id)
    }

    fn allowed_bidders(&self, auction_id: AuctionId) -> Result<Vec<AllowedBidder>, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        AuctionRegistry::new(&mut tx).get(auction_id)?;
        BidLedger::new(&mut tx).allowed_bidders(auction_id)
    }

    fn allowed_bidder(
        &self,
        auction_id: AuctionId,
        bidder: Address,
    ) -> Result<AllowedBidder, FundraisingError> {
        let mut tx = StoreTx::new(&self.store);
        AuctionRegistry::new(&mut tx).get(auction_id)?;
        BidLedger::new(&mut tx)
            .allowed_bidder(auction_id, &bidder)?
            .ok_or_else(|| {
                FundraisingError::NotFound(format!("allowed bidder {bidder:?} of auction {auction_id}"))
            })
    }
}

/// Transitions applied to one auction in one tick.
#[derive(Debug, Default)]
struct Progress {
    started: bool,
    settled: bool,
    finished: bool,
    releases: usize,
}

impl Progress {
    fn record(self, id: AuctionId, summary: &mut TickSummary) {
        if self.started {
            summary.started.push(id);
        }
        if self.settled {
            summary.settled.push(id);
        }
        if self.finished {
            summary.finished.push(id);
        }
        summary.releases += self.releases;
    }
}

/// Bidding is over: end time reached, or a fixed-price auction sold out.
fn settlement_due(auction: &Auction, now: Timestamp) -> bool {
    now >= auction.end_time
        || (auction.auction_type() == AuctionType::FixedPrice && auction.is_sold_out())
}

fn ensure_allow_list_mutable(auction: &Auction) -> Result<(), FundraisingError> {
    match auction.status {
        AuctionStatus::Standby | AuctionStatus::Started => Ok(()),
        status => Err(FundraisingError::InvalidRequest(format!(
            "auction {} is {status}, allow-list is frozen",
            auction.id
        ))),
    }
}

/// Enforce the per-bidder cap on cumulative committed paying coin.
fn check_allowance(
    params: &FundraisingParams,
    tx: &mut StoreTx<'_>,
    auction_id: AuctionId,
    bidder: &Address,
    amount: u128,
) -> Result<(), FundraisingError> {
    if !params.enable_allowed_bidder_limits {
        return Ok(());
    }

    let ledger = BidLedger::new(tx);
    let cap = match ledger.allowed_bidder(auction_id, bidder)? {
        Some(entry) => Some(entry.max_bid_amount),
        None => match params.missing_allowance_policy {
            MissingAllowancePolicy::Unlimited => params.default_max_bid_amount,
            MissingAllowancePolicy::Disallowed => {
                return Err(FundraisingError::BidderNotAllowed(auction_id))
            }
        },
    };
    let Some(cap) = cap else {
        return Ok(());
    };

    let attempted = ledger
        .committed_by(auction_id, bidder)?
        .checked_add(amount)
        .ok_or_else(|| FundraisingError::InvariantViolation("committed amount overflow".into()))?;
    if attempted > cap {
        return Err(FundraisingError::AllowedAmountExceeded { cap, attempted });
    }
    Ok(())
}

/// Clear the auction, hand back unsold supply and either disburse
/// everything or queue the vesting releases.
fn settle(
    tx: &mut StoreTx<'_>,
    mut auction: Auction,
    ops: &mut Vec<LedgerOp>,
) -> Result<Auction, FundraisingError> {
    let id = auction.id;

    match auction.min_bid_price() {
        None => auction.clearing_price = Some(auction.start_price),
        Some(floor) => {
            let mut ledger = BidLedger::new(tx);
            let bids = ledger.by_auction(id)?;
            let result = batch::clear(&bids, auction.remaining_selling_coin.amount, floor)?;

            let committed = bids
                .iter()
                .try_fold(0u128, |acc, b| acc.checked_add(b.coin.amount))
                .ok_or_else(|| FundraisingError::InvariantViolation("committed overflow".into()))?;
            invariant_paying_conservation(committed, result.total_paid, result.total_refunded)?;

            for (bid, outcome) in bids.iter().zip(&result.outcomes) {
                ledger.mark_eligible(id, bid.sequence, outcome.eligible)?;
                if outcome.eligible {
                    ledger.put_allocation(&Allocation {
                        auction_id: id,
                        sequence: bid.sequence,
                        bidder: bid.bidder,
                        selling_amount: outcome.selling_amount,
                        paying_amount: outcome.paying_amount,
                    })?;
                }
                if outcome.refund > 0 {
                    ops.push(LedgerOp::Release {
                        from: Reserve::Paying(id),
                        to: bid.bidder,
                        coin: Coin::new(&auction.paying_coin_denom, outcome.refund),
                    });
                }
            }

            auction.allocate(result.total_sold)?;
            auction.clearing_price = Some(result.clearing_price);
            debug!(
                auction_id = id,
                clearing_price = %result.clearing_price,
                eligible_bids = result.eligible().count(),
                total_sold = %result.total_sold,
                total_refunded = %result.total_refunded,
                "Batch auction cleared"
            );
        }
    }

    let unsold = auction.remaining_selling_coin.amount;
    if unsold > 0 {
        ops.push(LedgerOp::Release {
            from: Reserve::Selling(id),
            to: auction.auctioneer,
            coin: Coin::new(&auction.selling_coin.denom, unsold),
        });
    }
    AuctionRegistry::new(tx).save(&auction)?;

    let next = if auction.vesting_schedules.is_empty() {
        let allocations = BidLedger::new(tx).allocations(id)?;
        disburse(&auction, &allocations, Dec::ZERO, Dec::ONE, ops)?;
        AuctionStatus::Finished
    } else {
        VestingQueue::new(tx).enqueue(&auction)?;
        AuctionStatus::Vesting
    };
    let auction = AuctionRegistry::new(tx).update_status(id, next)?;

    info!(
        auction_id = id,
        status = %next,
        sold = %auction.sold_amount(),
        unsold = %unsold,
        clearing_price = ?auction.clearing_price.map(|p| p.to_string()),
        "Auction settled"
    );
    Ok(auction)
}

/// Disburse every queued release due at `now`.
///
/// Returns the number of releases and whether the queue is exhausted.
fn release_due(
    tx: &mut StoreTx<'_>,
    auction: &Auction,
    now: Timestamp,
    ops: &mut Vec<LedgerOp>,
) -> Result<(usize, bool), FundraisingError> {
    let entries = VestingQueue::new(tx).entries(auction.id)?;
    let due = vesting::due_releases(&entries, now);
    if due.is_empty() {
        return Ok((0, vesting::is_fully_released(&entries)));
    }

    let allocations = BidLedger::new(tx).allocations(auction.id)?;
    for entry in &due {
        let before = vesting::cumulative_weight_before(&entries, entry.release_time)?;
        disburse(auction, &allocations, before, entry.weight, ops)?;
        VestingQueue::new(tx).mark_released(entry)?;
        debug!(
            auction_id = auction.id,
            release_time = entry.release_time,
            weight = %entry.weight,
            "Vesting release disbursed"
        );
    }

    let entries = VestingQueue::new(tx).entries(auction.id)?;
    Ok((due.len(), vesting::is_fully_released(&entries)))
}

/// Pay out the `(before, before + weight]` share of proceeds to the
/// auctioneer and of each allocation to its bidder.
fn disburse(
    auction: &Auction,
    allocations: &[Allocation],
    before: Dec,
    weight: Dec,
    ops: &mut Vec<LedgerOp>,
) -> Result<(), FundraisingError> {
    let total_paid = allocations
        .iter()
        .try_fold(0u128, |acc, a| acc.checked_add(a.paying_amount))
        .ok_or_else(|| FundraisingError::InvariantViolation("proceeds overflow".into()))?;

    let proceeds = vesting::release_amount(total_paid, before, weight)?;
    if proceeds > 0 {
        ops.push(LedgerOp::Release {
            from: Reserve::Paying(auction.id),
            to: auction.auctioneer,
            coin: Coin::new(&auction.paying_coin_denom, proceeds),
        });
    }

    for allocation in allocations {
        let amount = vesting::release_amount(allocation.selling_amount, before, weight)?;
        if amount > 0 {
            ops.push(LedgerOp::Release {
                from: Reserve::Selling(auction.id),
                to: allocation.bidder,
                coin: Coin::new(&auction.selling_coin.denom, amount),
            });
        }
    }
    Ok(())
}
