use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;
use std::ops::Bound;

/// In-memory ordered key-value store for tests and embedders.
///
/// Backed by a `BTreeMap` so prefix scans come back in key order.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        // Single-threaded map: applying in order is atomic.
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        let results = self
            .data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_applies_puts_and_deletes_in_order() {
        let mut store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(vec![0x11, 1], vec![1]),
                BatchOperation::put(vec![0x13, 1, 1], Vec::new()),
                BatchOperation::delete(vec![0x13, 1, 1]),
                BatchOperation::put(vec![0x13, 2, 1], Vec::new()),
                BatchOperation::put(vec![0x11, 1], vec![2]),
            ])
            .unwrap();

        assert_eq!(store.get(&[0x11, 1]).unwrap(), Some(vec![2]));
        assert_eq!(store.get(&[0x13, 1, 1]).unwrap(), None);
        assert_eq!(store.get(&[0x13, 2, 1]).unwrap(), Some(Vec::new()));
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_prefix_scan_is_ordered() {
        let mut store = InMemoryKVStore::new();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(vec![1, 0, 2], b"x".to_vec()),
                BatchOperation::put(vec![1, 0, 1], b"y".to_vec()),
                BatchOperation::put(vec![2, 0, 0], b"z".to_vec()),
                BatchOperation::put(vec![0, 9, 9], b"w".to_vec()),
            ])
            .unwrap();

        let keys: Vec<_> = store
            .prefix_scan(&[1])
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![vec![1, 0, 1], vec![1, 0, 2]]);
        assert!(store.prefix_scan(&[3]).unwrap().is_empty());
    }
}
