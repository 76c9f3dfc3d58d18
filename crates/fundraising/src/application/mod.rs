//! Application layer: persisted state layout, the stores built on it and
//! the service implementing the inbound ports.

pub mod bid_ledger;
pub mod keys;
pub mod overlay;
pub mod queries;
pub mod registry;
pub mod service;
pub mod vesting_queue;

pub use bid_ledger::BidLedger;
pub use overlay::StoreTx;
pub use queries::{query_auctions, query_bids, AuctionsRequest, BidsRequest};
pub use registry::AuctionRegistry;
pub use service::FundraisingService;
pub use vesting_queue::VestingQueue;
