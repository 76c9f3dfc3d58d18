//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports, used by the test suite
//! and by embedders that do not bring their own ledger.

mod memory_bank;
mod memory_store;

pub use memory_bank::InMemoryBank;
pub use memory_store::InMemoryKVStore;
