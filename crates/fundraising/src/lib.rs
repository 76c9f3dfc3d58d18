//! # Fundraising Settlement Core
//!
//! Deterministic settlement of token auctions on a replicated ledger:
//! fixed-price and batch auctions, bids with per-bidder allow-list caps,
//! single-price batch clearing and vesting disbursement, all driven by an
//! externally supplied logical-time tick.
//!
//! ## Lifecycle
//!
//! ```text
//! Standby ──tick ≥ start──→ Started ──tick ≥ end (or sold out)──→ Vesting ──last release──→ Finished
//!    │                                        └──────── no schedules ───────────────────────→ Finished
//!    └──cancel before start──→ Cancelled
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Selling Conservation | remaining + allocated == selling amount |
//! | 2 | Monotonic Supply | Remaining selling coin never increases |
//! | 3 | Paying Conservation | Every committed unit is paid or refunded |
//! | 4 | Escrow Coverage | Reserves cover everything released from them |
//! | 5 | Atomic Operations | An operation commits all of its effects or none |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Value objects, entities, fixed-point decimals, vesting engine
//! - `algorithms/` - Fixed-price fill and batch clearing
//! - `ports/` - Inbound API and outbound store/bank SPI
//! - `adapters/` - In-memory store and bank
//! - `application/` - Key layout, registry, bid ledger, service, queries
//!
//! ## Usage
//!
//! ```
//! use fundraising::{
//!     Address, AuctionSpec, CallContext, Coin, Dec, FundraisingApi, FundraisingService,
//!     InMemoryBank, InMemoryKVStore,
//! };
//!
//! let auctioneer = Address::from_low_u64_be(1);
//! let mut bank = InMemoryBank::new();
//! bank.mint(auctioneer, Coin::new("denom1", 1_000));
//!
//! let mut service = FundraisingService::new(InMemoryKVStore::new(), bank);
//! let spec = AuctionSpec::fixed_price(Dec::ONE, Coin::new("denom1", 1_000), "denom2", 10, 20);
//! let auction = service
//!     .create_fixed_price_auction(CallContext::new(auctioneer, 0), spec)
//!     .unwrap();
//! assert_eq!(auction.id, 1);
//!
//! let summary = service.on_logical_tick(10).unwrap();
//! assert_eq!(summary.started, vec![1]);
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

pub use adapters::{InMemoryBank, InMemoryKVStore};
pub use application::queries::{query_auctions, query_bids, AuctionsRequest, BidsRequest};
pub use application::service::FundraisingService;
pub use config::{FundraisingParams, MissingAllowancePolicy};
pub use domain::decimal::Dec;
pub use domain::entities::*;
pub use domain::errors::{BankError, FundraisingError, StoreError};
pub use domain::value_objects::*;
pub use ports::inbound::{
    AuctionFilter, BidFilter, CallContext, FundraisingApi, FundraisingQueryApi, TickSummary,
};
pub use ports::outbound::{Bank, BatchOperation, KeyValueStore, LedgerOp};
pub use telemetry::{init_logging, LogConfig, TelemetryError};
