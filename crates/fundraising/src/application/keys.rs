//! Persisted state layout.
//!
//! Every key is a one-byte prefix followed by big-endian integers and raw
//! 20-byte addresses, so ascending key order is ascending id / sequence
//! order and every secondary index is a plain prefix scan.
//!
//! | Prefix | Key                                   | Value            |
//! |--------|---------------------------------------|------------------|
//! | 0x01   | -                                     | last auction id  |
//! | 0x02   | -                                     | last tick        |
//! | 0x11   | auction_id                            | `Auction`        |
//! | 0x12   | type, auction_id                      | -                |
//! | 0x13   | status, auction_id                    | -                |
//! | 0x21   | auction_id, sequence                  | `Bid`            |
//! | 0x22   | bidder, auction_id, sequence          | -                |
//! | 0x23   | auction_id, eligible, sequence        | -                |
//! | 0x24   | auction_id                            | last sequence    |
//! | 0x25   | auction_id, sequence                  | `Allocation`     |
//! | 0x31   | auction_id, bidder                    | `AllowedBidder`  |
//! | 0x41   | auction_id, release_time              | `VestingQueueEntry` |

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::{
    Address, AuctionId, AuctionStatus, AuctionType, Sequence, Timestamp,
};

pub const LAST_AUCTION_ID: u8 = 0x01;
pub const LAST_TICK: u8 = 0x02;
pub const AUCTION: u8 = 0x11;
pub const AUCTION_BY_TYPE: u8 = 0x12;
pub const AUCTION_BY_STATUS: u8 = 0x13;
pub const BID: u8 = 0x21;
pub const BID_BY_BIDDER: u8 = 0x22;
pub const BID_BY_ELIGIBILITY: u8 = 0x23;
pub const LAST_SEQUENCE: u8 = 0x24;
pub const ALLOCATION: u8 = 0x25;
pub const ALLOWED_BIDDER: u8 = 0x31;
pub const VESTING_QUEUE: u8 = 0x41;

/// Empty marker value stored under index keys.
pub const INDEX_MARKER: &[u8] = &[];

struct KeyBuilder(Vec<u8>);

impl KeyBuilder {
    fn new(prefix: u8) -> Self {
        Self(vec![prefix])
    }

    fn u64(mut self, value: u64) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn byte(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    fn address(mut self, address: &Address) -> Self {
        self.0.extend_from_slice(address.as_bytes());
        self
    }

    fn build(self) -> Vec<u8> {
        self.0
    }
}

pub fn last_auction_id() -> Vec<u8> {
    vec![LAST_AUCTION_ID]
}

pub fn last_tick() -> Vec<u8> {
    vec![LAST_TICK]
}

pub fn auction(id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(AUCTION).u64(id).build()
}

pub fn auction_prefix() -> Vec<u8> {
    vec![AUCTION]
}

pub fn auction_by_type(auction_type: AuctionType, id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(AUCTION_BY_TYPE)
        .byte(auction_type.key_byte())
        .u64(id)
        .build()
}

pub fn auction_by_type_prefix(auction_type: AuctionType) -> Vec<u8> {
    KeyBuilder::new(AUCTION_BY_TYPE)
        .byte(auction_type.key_byte())
        .build()
}

pub fn auction_by_status(status: AuctionStatus, id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(AUCTION_BY_STATUS)
        .byte(status.key_byte())
        .u64(id)
        .build()
}

pub fn auction_by_status_prefix(status: AuctionStatus) -> Vec<u8> {
    KeyBuilder::new(AUCTION_BY_STATUS)
        .byte(status.key_byte())
        .build()
}

pub fn bid(auction_id: AuctionId, sequence: Sequence) -> Vec<u8> {
    KeyBuilder::new(BID).u64(auction_id).u64(sequence).build()
}

pub fn bid_prefix(auction_id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(BID).u64(auction_id).build()
}

pub fn all_bids_prefix() -> Vec<u8> {
    vec![BID]
}

pub fn bid_by_bidder(bidder: &Address, auction_id: AuctionId, sequence: Sequence) -> Vec<u8> {
    KeyBuilder::new(BID_BY_BIDDER)
        .address(bidder)
        .u64(auction_id)
        .u64(sequence)
        .build()
}

pub fn bid_by_bidder_prefix(bidder: &Address) -> Vec<u8> {
    KeyBuilder::new(BID_BY_BIDDER).address(bidder).build()
}

pub fn bid_by_bidder_auction_prefix(bidder: &Address, auction_id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(BID_BY_BIDDER)
        .address(bidder)
        .u64(auction_id)
        .build()
}

pub fn bid_by_eligibility(auction_id: AuctionId, eligible: bool, sequence: Sequence) -> Vec<u8> {
    KeyBuilder::new(BID_BY_ELIGIBILITY)
        .u64(auction_id)
        .byte(eligible as u8)
        .u64(sequence)
        .build()
}

pub fn bid_by_eligibility_prefix(auction_id: AuctionId, eligible: bool) -> Vec<u8> {
    KeyBuilder::new(BID_BY_ELIGIBILITY)
        .u64(auction_id)
        .byte(eligible as u8)
        .build()
}

pub fn last_sequence(auction_id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(LAST_SEQUENCE).u64(auction_id).build()
}

pub fn allocation(auction_id: AuctionId, sequence: Sequence) -> Vec<u8> {
    KeyBuilder::new(ALLOCATION).u64(auction_id).u64(sequence).build()
}

pub fn allocation_prefix(auction_id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(ALLOCATION).u64(auction_id).build()
}

pub fn allowed_bidder(auction_id: AuctionId, bidder: &Address) -> Vec<u8> {
    KeyBuilder::new(ALLOWED_BIDDER)
        .u64(auction_id)
        .address(bidder)
        .build()
}

pub fn allowed_bidder_prefix(auction_id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(ALLOWED_BIDDER).u64(auction_id).build()
}

pub fn vesting_queue(auction_id: AuctionId, release_time: Timestamp) -> Vec<u8> {
    KeyBuilder::new(VESTING_QUEUE)
        .u64(auction_id)
        .u64(release_time)
        .build()
}

pub fn vesting_queue_prefix(auction_id: AuctionId) -> Vec<u8> {
    KeyBuilder::new(VESTING_QUEUE).u64(auction_id).build()
}

/// Trailing big-endian `u64` of an index key.
pub fn trailing_u64(key: &[u8]) -> Result<u64, FundraisingError> {
    key.len()
        .checked_sub(8)
        .and_then(|start| key[start..].try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| FundraisingError::Codec(format!("malformed index key {key:?}")))
}

/// The `(auction_id, sequence)` pair at the end of a bid index key.
pub fn trailing_bid_id(key: &[u8]) -> Result<(AuctionId, Sequence), FundraisingError> {
    let sequence = trailing_u64(key)?;
    let auction_id = trailing_u64(&key[..key.len() - 8])?;
    Ok((auction_id, sequence))
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FundraisingError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FundraisingError> {
    Ok(bincode::deserialize(bytes)?)
}
