//! Value objects for the fundraising core.

use primitive_types::H160;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::decimal::Dec;

/// Account reference (bidder, auctioneer).
pub type Address = H160;

/// Sequential auction identifier, assigned starting at 1.
pub type AuctionId = u64;

/// Per-auction bid sequence, assigned starting at 1.
pub type Sequence = u64;

/// Logical time supplied by the ledger, never wall-clock.
pub type Timestamp = u64;

/// Amount of a single denomination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Auction pricing mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionType {
    FixedPrice,
    Batch,
}

impl AuctionType {
    /// Stable byte used in index keys.
    pub fn key_byte(self) -> u8 {
        match self {
            AuctionType::FixedPrice => 1,
            AuctionType::Batch => 2,
        }
    }
}

impl fmt::Display for AuctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionType::FixedPrice => write!(f, "AUCTION_TYPE_FIXED_PRICE"),
            AuctionType::Batch => write!(f, "AUCTION_TYPE_BATCH"),
        }
    }
}

impl FromStr for AuctionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUCTION_TYPE_FIXED_PRICE" | "FixedPrice" | "fixed_price" => Ok(AuctionType::FixedPrice),
            "AUCTION_TYPE_BATCH" | "Batch" | "batch" => Ok(AuctionType::Batch),
            other => Err(format!("unknown auction type: {other}")),
        }
    }
}

/// Auction lifecycle status.
///
/// ```text
/// Standby ──start──→ Started ──settle──→ Vesting ──last release──→ Finished
///    │                          └──settle (no schedule)──→ Finished
///    └──cancel──→ Cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionStatus {
    Standby,
    Started,
    Vesting,
    Finished,
    Cancelled,
}

impl AuctionStatus {
    pub const ALL: [AuctionStatus; 5] = [
        AuctionStatus::Standby,
        AuctionStatus::Started,
        AuctionStatus::Vesting,
        AuctionStatus::Finished,
        AuctionStatus::Cancelled,
    ];

    /// Stable byte used in index keys.
    pub fn key_byte(self) -> u8 {
        match self {
            AuctionStatus::Standby => 1,
            AuctionStatus::Started => 2,
            AuctionStatus::Vesting => 3,
            AuctionStatus::Finished => 4,
            AuctionStatus::Cancelled => 5,
        }
    }

    /// Legal transition table.
    pub fn can_transition_to(self, next: AuctionStatus) -> bool {
        use AuctionStatus::*;
        matches!(
            (self, next),
            (Standby, Started)
                | (Standby, Cancelled)
                | (Started, Vesting)
                | (Started, Finished)
                | (Vesting, Finished)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AuctionStatus::Finished | AuctionStatus::Cancelled)
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuctionStatus::Standby => "AUCTION_STATUS_STANDBY",
            AuctionStatus::Started => "AUCTION_STATUS_STARTED",
            AuctionStatus::Vesting => "AUCTION_STATUS_VESTING",
            AuctionStatus::Finished => "AUCTION_STATUS_FINISHED",
            AuctionStatus::Cancelled => "AUCTION_STATUS_CANCELLED",
        };
        f.write_str(name)
    }
}

impl FromStr for AuctionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuctionStatus::ALL
            .into_iter()
            .find(|status| status.to_string() == s || format!("{status:?}") == s)
            .ok_or_else(|| format!("unknown auction status: {s}"))
    }
}

/// One phase of a vesting schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub release_time: Timestamp,
    pub weight: Dec,
}

impl VestingSchedule {
    pub fn new(release_time: Timestamp, weight: Dec) -> Self {
        Self {
            release_time,
            weight,
        }
    }
}

/// Module-owned escrow accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reserve {
    /// Selling coin escrowed by the auctioneer.
    Selling(AuctionId),
    /// Paying coin escrowed by bidders.
    Paying(AuctionId),
    /// Collected auction creation fees.
    FeeCollector,
}

impl fmt::Display for Reserve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reserve::Selling(id) => write!(f, "selling_reserve/{id}"),
            Reserve::Paying(id) => write!(f, "paying_reserve/{id}"),
            Reserve::FeeCollector => write!(f, "fee_collector"),
        }
    }
}
