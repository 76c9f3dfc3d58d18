//! Inbound Ports (Driving Ports / API)
//!
//! Operations invoked by the host's message router and tick hook, plus the
//! read-only surface used by query services.

use crate::config::FundraisingParams;
use crate::domain::decimal::Dec;
use crate::domain::entities::{
    AllowedBidder, Allocation, Auction, AuctionSpec, Bid, VestingQueueEntry,
};
use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::{
    Address, AuctionId, AuctionStatus, AuctionType, Coin, Sequence, Timestamp,
};

/// Caller identity and logical time of an inbound operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(sender: Address, now: Timestamp) -> Self {
        Self { sender, now }
    }
}

/// What one logical tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Auctions moved Standby -> Started.
    pub started: Vec<AuctionId>,
    /// Auctions cleared and settled.
    pub settled: Vec<AuctionId>,
    /// Auctions that reached Finished.
    pub finished: Vec<AuctionId>,
    /// Vesting queue entries disbursed.
    pub releases: usize,
    /// Auctions whose transition was abandoned this tick.
    pub failed: Vec<(AuctionId, FundraisingError)>,
}

impl TickSummary {
    /// Nothing changed.
    pub fn is_noop(&self) -> bool {
        self.started.is_empty()
            && self.settled.is_empty()
            && self.finished.is_empty()
            && self.releases == 0
            && self.failed.is_empty()
    }
}

/// Auction listing filter; `None` fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuctionFilter {
    pub auction_type: Option<AuctionType>,
    pub status: Option<AuctionStatus>,
}

impl AuctionFilter {
    pub fn matches(&self, auction: &Auction) -> bool {
        self.auction_type.map_or(true, |t| auction.auction_type() == t)
            && self.status.map_or(true, |s| auction.status == s)
    }
}

/// Bid listing filter. All given predicates apply together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BidFilter {
    pub auction_id: Option<AuctionId>,
    pub bidder: Option<Address>,
    pub eligible: Option<bool>,
}

impl BidFilter {
    pub fn for_auction(auction_id: AuctionId) -> Self {
        Self {
            auction_id: Some(auction_id),
            ..Self::default()
        }
    }

    pub fn bidder(mut self, bidder: Address) -> Self {
        self.bidder = Some(bidder);
        self
    }

    pub fn eligible(mut self, eligible: bool) -> Self {
        self.eligible = Some(eligible);
        self
    }

    pub fn matches(&self, bid: &Bid) -> bool {
        self.auction_id.map_or(true, |id| bid.auction_id == id)
            && self.bidder.map_or(true, |b| bid.bidder == b)
            && self.eligible.map_or(true, |e| bid.eligible == e)
    }
}

/// State-changing fundraising operations.
///
/// Every call is atomic: on `Err` neither the store nor the bank changed.
pub trait FundraisingApi {
    /// Create a fixed-price auction, escrowing the selling coin.
    fn create_fixed_price_auction(
        &mut self,
        ctx: CallContext,
        spec: AuctionSpec,
    ) -> Result<Auction, FundraisingError>;

    /// Create a batch auction, escrowing the selling coin.
    fn create_batch_auction(
        &mut self,
        ctx: CallContext,
        spec: AuctionSpec,
    ) -> Result<Auction, FundraisingError>;

    /// Cancel a Standby auction before its start time. Auctioneer only.
    fn cancel_auction(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
    ) -> Result<Auction, FundraisingError>;

    /// Admit a bid from `ctx.sender`, escrowing `coin`.
    fn place_bid(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
        price: Dec,
        coin: Coin,
    ) -> Result<Bid, FundraisingError>;

    /// Add or overwrite allow-list entries. Requires the allow-list toggle.
    fn add_allowed_bidders(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
        entries: Vec<AllowedBidder>,
    ) -> Result<(), FundraisingError>;

    /// Set one bidder's cap. Auctioneer only.
    fn update_allowed_bidder(
        &mut self,
        ctx: CallContext,
        auction_id: AuctionId,
        bidder: Address,
        max_bid_amount: u128,
    ) -> Result<(), FundraisingError>;

    /// Drive every time-based transition due at `now`.
    ///
    /// Repeating a tick, or ticking with an earlier time, changes nothing.
    fn on_logical_tick(&mut self, now: Timestamp) -> Result<TickSummary, FundraisingError>;
}

/// Read-only fundraising queries.
pub trait FundraisingQueryApi {
    fn params(&self) -> FundraisingParams;

    fn auction(&self, auction_id: AuctionId) -> Result<Auction, FundraisingError>;

    /// Auctions matching `filter`, ascending by id.
    fn auctions(&self, filter: AuctionFilter) -> Result<Vec<Auction>, FundraisingError>;

    fn bid(&self, auction_id: AuctionId, sequence: Sequence) -> Result<Bid, FundraisingError>;

    /// Bids matching `filter`. Ascending by sequence when scoped to one auction.
    fn bids(&self, filter: BidFilter) -> Result<Vec<Bid>, FundraisingError>;

    fn allocations(&self, auction_id: AuctionId) -> Result<Vec<Allocation>, FundraisingError>;

    /// Vesting queue of an auction, ascending by release time.
    fn vestings(&self, auction_id: AuctionId) -> Result<Vec<VestingQueueEntry>, FundraisingError>;

    fn allowed_bidders(&self, auction_id: AuctionId) -> Result<Vec<AllowedBidder>, FundraisingError>;

    fn allowed_bidder(
        &self,
        auction_id: AuctionId,
        bidder: Address,
    ) -> Result<AllowedBidder, FundraisingError>;
}
