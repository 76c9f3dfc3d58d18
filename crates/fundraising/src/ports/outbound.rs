//! # Outbound Ports (Driven Ports)
//!
//! Collaborators the fundraising core requires the host ledger to provide:
//! an ordered key-value store and an escrow-capable bank.

use crate::domain::errors::{BankError, StoreError};
use crate::domain::value_objects::{Address, Coin, Reserve};

/// Key-value pairs returned by a prefix scan.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Ordered key-value store.
///
/// Testing: `InMemoryKVStore` (adapters/memory_store.rs)
pub trait KeyValueStore {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// One movement of funds between a user account and a module reserve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    /// Move `coin` from a user account into a reserve.
    Escrow {
        from: Address,
        into: Reserve,
        coin: Coin,
    },
    /// Move `coin` from a reserve back out to a user account.
    Release {
        from: Reserve,
        to: Address,
        coin: Coin,
    },
}

impl LedgerOp {
    /// The opposing movement that undoes this one.
    pub fn inverse(&self) -> LedgerOp {
        match self {
            LedgerOp::Escrow { from, into, coin } => LedgerOp::Release {
                from: *into,
                to: *from,
                coin: coin.clone(),
            },
            LedgerOp::Release { from, to, coin } => LedgerOp::Escrow {
                from: *to,
                into: *from,
                coin: coin.clone(),
            },
        }
    }
}

/// Escrow ledger.
///
/// `apply` is all-or-nothing: if any op fails, no balance changes.
pub trait Bank {
    /// Balance of `denom` the account may escrow.
    fn spendable(&self, account: &Address, denom: &str) -> u128;

    /// Balance of `denom` held in a module reserve.
    fn reserve_balance(&self, reserve: &Reserve, denom: &str) -> u128;

    /// Apply `ops` atomically, in order.
    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), BankError>;

    fn escrow(&mut self, from: Address, into: Reserve, coin: Coin) -> Result<(), BankError> {
        self.apply(&[LedgerOp::Escrow { from, into, coin }])
    }

    fn release(&mut self, from: Reserve, to: Address, coin: Coin) -> Result<(), BankError> {
        self.apply(&[LedgerOp::Release { from, to, coin }])
    }
}
