//! Write overlay over the ordered store.
//!
//! Reads see the overlay's own pending writes. Nothing reaches the store
//! until the caller turns the overlay into a batch and commits it with
//! `atomic_batch_write`, so an abandoned operation leaves no trace.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::keys;
use crate::domain::errors::FundraisingError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};

pub struct StoreTx<'s> {
    store: &'s dyn KeyValueStore,
    /// `None` marks a pending delete.
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'s> StoreTx<'s> {
    pub fn new(store: &'s dyn KeyValueStore) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, FundraisingError> {
        match self.pending.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => Ok(self.store.get(key)?),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.pending.insert(key, None);
    }

    /// Store scan merged with pending writes, ascending by key.
    pub fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, FundraisingError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.prefix_scan(prefix)?.into_iter().collect();

        for (key, value) in self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Keys under `prefix`, ascending.
    pub fn prefix_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, FundraisingError> {
        Ok(self.prefix_scan(prefix)?.into_iter().map(|(k, _)| k).collect())
    }

    pub fn get_value<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, FundraisingError> {
        self.get(key)?.map(|bytes| keys::decode(&bytes)).transpose()
    }

    pub fn put_value<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<(), FundraisingError> {
        let bytes = keys::encode(value)?;
        self.put(key, bytes);
        Ok(())
    }

    /// Decoded values under `prefix`, ascending by key.
    pub fn scan_values<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>, FundraisingError> {
        self.prefix_scan(prefix)?
            .iter()
            .map(|(_, v)| keys::decode(v))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn into_batch(self) -> Vec<BatchOperation> {
        self.pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::Put { key, value },
                None => BatchOperation::Delete { key },
            })
            .collect()
    }
}
