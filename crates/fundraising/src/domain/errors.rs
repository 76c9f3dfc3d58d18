//! Error types for the fundraising core.

use thiserror::Error;

use super::value_objects::{AuctionId, AuctionStatus, Sequence};

/// All errors returned by the fundraising core.
///
/// None of these are retried internally; the caller decides.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundraisingError {
    #[error("Invalid auction spec: {0}")]
    InvalidAuctionSpec(String),

    #[error("Invalid vesting schedule: {0}")]
    InvalidVestingSchedule(String),

    #[error("Illegal transition for auction {auction_id}: {from} -> {to}")]
    IllegalTransition {
        auction_id: AuctionId,
        from: AuctionStatus,
        to: AuctionStatus,
    },

    #[error("Auction {auction_id} is not accepting bids (status {status})")]
    AuctionNotStarted {
        auction_id: AuctionId,
        status: AuctionStatus,
    },

    #[error("Bid price {price} does not match start price {start_price}")]
    PriceMismatch { price: String, start_price: String },

    #[error("Bid price {price} is below minimum bid price {min_bid_price}")]
    BelowMinimumPrice { price: String, min_bid_price: String },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Allowed bid amount exceeded: cap {cap}, attempted {attempted}")]
    AllowedAmountExceeded { cap: u128, attempted: u128 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Sender is not the auctioneer of auction {0}")]
    Unauthorized(AuctionId),

    #[error("Auction {0} is sold out")]
    AuctionSoldOut(AuctionId),

    #[error("Invalid bid: {0}")]
    InvalidBid(String),

    #[error("Bidder is not on the allow-list of auction {0}")]
    BidderNotAllowed(AuctionId),

    #[error("Allowed bidder limits are disabled")]
    AllowListDisabled,

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Bank error: {0}")]
    Bank(BankError),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl FundraisingError {
    pub fn auction_not_found(auction_id: AuctionId) -> Self {
        Self::NotFound(format!("auction {auction_id}"))
    }

    pub fn bid_not_found(auction_id: AuctionId, sequence: Sequence) -> Self {
        Self::NotFound(format!("bid {auction_id}/{sequence}"))
    }
}

impl From<BankError> for FundraisingError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::InsufficientFunds {
                required,
                available,
                ..
            } => FundraisingError::InsufficientFunds {
                required,
                available,
            },
            other => FundraisingError::Bank(other),
        }
    }
}

impl From<bincode::Error> for FundraisingError {
    fn from(err: bincode::Error) -> Self {
        FundraisingError::Codec(err.to_string())
    }
}

/// Ordered key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("KV store I/O error: {message}")]
    Io { message: String },

    #[error("KV store corruption: {message}")]
    Corruption { message: String },
}

/// Escrow ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: String,
        required: u128,
        available: u128,
    },

    #[error("Balance overflow in {account}")]
    Overflow { account: String },
}
