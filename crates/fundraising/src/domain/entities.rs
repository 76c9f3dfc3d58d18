//! Core entities: auctions, bids, allow-list entries, allocations and
//! vesting queue entries.

use serde::{Deserialize, Serialize};

use super::decimal::Dec;
use super::errors::FundraisingError;
use super::value_objects::{
    Address, AuctionId, AuctionStatus, AuctionType, Coin, Sequence, Timestamp, VestingSchedule,
};
use super::vesting;

/// Type-specific auction parameters.
///
/// Dispatches the per-type rules (validation, bid admission) so that a
/// single registry table can hold both kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionKind {
    /// Every bid pays exactly the start price and is matched on admission.
    FixedPrice,
    /// Bids accumulate until the end time and clear at a single price.
    Batch { min_bid_price: Dec },
}

impl AuctionKind {
    pub fn auction_type(&self) -> AuctionType {
        match self {
            AuctionKind::FixedPrice => AuctionType::FixedPrice,
            AuctionKind::Batch { .. } => AuctionType::Batch,
        }
    }

    fn validate(&self, start_price: Dec) -> Result<(), FundraisingError> {
        if start_price.is_zero() {
            return Err(FundraisingError::InvalidAuctionSpec(
                "start price must be positive".into(),
            ));
        }
        if let AuctionKind::Batch { min_bid_price } = self {
            if min_bid_price.is_zero() {
                return Err(FundraisingError::InvalidAuctionSpec(
                    "minimum bid price must be positive".into(),
                ));
            }
        }
        Ok(())
    }

    /// Price rule applied at bid admission.
    pub fn check_bid_price(&self, start_price: Dec, price: Dec) -> Result<(), FundraisingError> {
        match self {
            AuctionKind::FixedPrice if price != start_price => {
                Err(FundraisingError::PriceMismatch {
                    price: price.to_string(),
                    start_price: start_price.to_string(),
                })
            }
            AuctionKind::Batch { min_bid_price } if price < *min_bid_price => {
                Err(FundraisingError::BelowMinimumPrice {
                    price: price.to_string(),
                    min_bid_price: min_bid_price.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Allow-list entry capping one bidder's cumulative committed paying coin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedBidder {
    pub bidder: Address,
    pub max_bid_amount: u128,
}

impl AllowedBidder {
    pub fn new(bidder: Address, max_bid_amount: u128) -> Self {
        Self {
            bidder,
            max_bid_amount,
        }
    }
}

/// Auction creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSpec {
    pub kind: AuctionKind,
    pub start_price: Dec,
    pub selling_coin: Coin,
    pub paying_coin_denom: String,
    pub vesting_schedules: Vec<VestingSchedule>,
    pub allowed_bidders: Vec<AllowedBidder>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl AuctionSpec {
    pub fn fixed_price(
        start_price: Dec,
        selling_coin: Coin,
        paying_coin_denom: impl Into<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            kind: AuctionKind::FixedPrice,
            start_price,
            selling_coin,
            paying_coin_denom: paying_coin_denom.into(),
            vesting_schedules: Vec::new(),
            allowed_bidders: Vec::new(),
            start_time,
            end_time,
        }
    }

    pub fn batch(
        start_price: Dec,
        min_bid_price: Dec,
        selling_coin: Coin,
        paying_coin_denom: impl Into<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            kind: AuctionKind::Batch { min_bid_price },
            ..Self::fixed_price(start_price, selling_coin, paying_coin_denom, start_time, end_time)
        }
    }

    pub fn with_vesting(mut self, schedules: Vec<VestingSchedule>) -> Self {
        self.vesting_schedules = schedules;
        self
    }

    pub fn with_allowed_bidders(mut self, allowed: Vec<AllowedBidder>) -> Self {
        self.allowed_bidders = allowed;
        self
    }

    /// Validate everything that does not depend on stored state.
    pub fn validate(&self, now: Timestamp, max_vesting_schedules: usize) -> Result<(), FundraisingError> {
        if self.start_time >= self.end_time {
            return Err(FundraisingError::InvalidAuctionSpec(format!(
                "end time {} must be after start time {}",
                self.end_time, self.start_time
            )));
        }
        if self.end_time <= now {
            return Err(FundraisingError::InvalidAuctionSpec(format!(
                "end time {} must be after current time {now}",
                self.end_time
            )));
        }
        if self.selling_coin.is_zero() {
            return Err(FundraisingError::InvalidAuctionSpec(
                "selling amount must be positive".into(),
            ));
        }
        if self.selling_coin.denom.is_empty() || self.paying_coin_denom.is_empty() {
            return Err(FundraisingError::InvalidAuctionSpec(
                "denominations must not be empty".into(),
            ));
        }
        if self.selling_coin.denom == self.paying_coin_denom {
            return Err(FundraisingError::InvalidAuctionSpec(
                "selling and paying denominations must differ".into(),
            ));
        }
        self.kind.validate(self.start_price)?;

        if self.vesting_schedules.len() > max_vesting_schedules {
            return Err(FundraisingError::InvalidVestingSchedule(format!(
                "{} schedules exceed the limit of {max_vesting_schedules}",
                self.vesting_schedules.len()
            )));
        }
        vesting::validate(&self.vesting_schedules, self.end_time)?;

        for (i, entry) in self.allowed_bidders.iter().enumerate() {
            if entry.max_bid_amount == 0 {
                return Err(FundraisingError::InvalidAuctionSpec(
                    "allowed bidder cap must be positive".into(),
                ));
            }
            if self.allowed_bidders[..i].iter().any(|e| e.bidder == entry.bidder) {
                return Err(FundraisingError::InvalidAuctionSpec(format!(
                    "duplicate allowed bidder {:?}",
                    entry.bidder
                )));
            }
        }
        Ok(())
    }
}

/// The sale unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub kind: AuctionKind,
    pub auctioneer: Address,
    pub selling_coin: Coin,
    pub paying_coin_denom: String,
    pub start_price: Dec,
    /// Selling coin not yet matched; never increases.
    pub remaining_selling_coin: Coin,
    pub vesting_schedules: Vec<VestingSchedule>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub status: AuctionStatus,
    /// Set once at settlement.
    pub clearing_price: Option<Dec>,
    pub created_at: Timestamp,
}

impl Auction {
    pub fn from_spec(id: AuctionId, auctioneer: Address, spec: AuctionSpec, now: Timestamp) -> Self {
        Self {
            id,
            kind: spec.kind,
            auctioneer,
            remaining_selling_coin: spec.selling_coin.clone(),
            selling_coin: spec.selling_coin,
            paying_coin_denom: spec.paying_coin_denom,
            start_price: spec.start_price,
            vesting_schedules: spec.vesting_schedules,
            start_time: spec.start_time,
            end_time: spec.end_time,
            status: AuctionStatus::Standby,
            clearing_price: None,
            created_at: now,
        }
    }

    pub fn auction_type(&self) -> AuctionType {
        self.kind.auction_type()
    }

    pub fn min_bid_price(&self) -> Option<Dec> {
        match self.kind {
            AuctionKind::Batch { min_bid_price } => Some(min_bid_price),
            AuctionKind::FixedPrice => None,
        }
    }

    /// Status is Started and `now` lies in `[start_time, end_time)`.
    pub fn is_bidding_open(&self, now: Timestamp) -> bool {
        self.status == AuctionStatus::Started && self.start_time <= now && now < self.end_time
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining_selling_coin.is_zero()
    }

    /// Selling coin matched so far.
    pub fn sold_amount(&self) -> u128 {
        self.selling_coin.amount - self.remaining_selling_coin.amount
    }

    /// Take `amount` off the remaining supply.
    pub fn allocate(&mut self, amount: u128) -> Result<(), FundraisingError> {
        self.remaining_selling_coin.amount = self
            .remaining_selling_coin
            .amount
            .checked_sub(amount)
            .ok_or_else(|| {
                FundraisingError::InvariantViolation(format!(
                    "auction {} allocating {amount} with only {} remaining",
                    self.id, self.remaining_selling_coin.amount
                ))
            })?;
        Ok(())
    }
}

/// A purchase request against an auction.
///
/// Immutable after admission except for `eligible`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub auction_id: AuctionId,
    pub sequence: Sequence,
    pub bidder: Address,
    pub price: Dec,
    /// Paying coin committed and escrowed at admission.
    pub coin: Coin,
    pub eligible: bool,
    pub placed_at: Timestamp,
}

/// Selling coin matched to one bid and the paying coin it costs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub auction_id: AuctionId,
    pub sequence: Sequence,
    pub bidder: Address,
    pub selling_amount: u128,
    pub paying_amount: u128,
}

/// One scheduled disbursement of an auction's proceeds and tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingQueueEntry {
    pub auction_id: AuctionId,
    pub auctioneer: Address,
    pub release_time: Timestamp,
    pub weight: Dec,
    pub released: bool,
}
