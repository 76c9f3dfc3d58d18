//! Ports module for the fundraising core
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::{
    AuctionFilter, BidFilter, CallContext, FundraisingApi, FundraisingQueryApi, TickSummary,
};
pub use outbound::{Bank, BatchOperation, KeyValueStore, LedgerOp, ScanResult};
