//! ERC725Y key-value storage seen by the key manager.

use core::cell::RefCell;
use std::collections::BTreeMap;

use alloy_primitives::{Bytes, B256};

/// Read/write access to an account's `bytes32 => bytes` store.
///
/// Methods take `&self`: the store is shared with call targets that may re-enter the key manager
/// while an outer call is still holding a reference to it.
pub trait Erc725YStore {
    /// Unset keys read as empty bytes.
    fn get_data(&self, key: &B256) -> Bytes;

    /// Writing empty bytes clears the key.
    fn set_data(&self, key: B256, value: Bytes);
}

/// Plain in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<B256, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Copy of every non-empty entry, ordered by key.
    pub fn entries(&self) -> Vec<(B256, Bytes)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }
}

impl Erc725YStore for MemoryStore {
    fn get_data(&self, key: &B256) -> Bytes {
        self.entries.borrow().get(key).cloned().unwrap_or_default()
    }

    fn set_data(&self, key: B256, value: Bytes) {
        let mut entries = self.entries.borrow_mut();
        if value.is_empty() {
            entries.remove(&key);
        } else {
            entries.insert(key, value);
        }
    }
}

impl FromIterator<(B256, Bytes)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (B256, Bytes)>>(iter: I) -> Self {
        let store = MemoryStore::new();
        for (key, value) in iter {
            store.set_data(key, value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_write_clears_the_key() {
        let store = MemoryStore::new();
        let key = B256::repeat_byte(0x01);
        store.set_data(key, Bytes::from_static(&[1, 2, 3]));
        assert_eq!(store.get_data(&key).to_vec(), vec![1, 2, 3]);
        store.set_data(key, Bytes::new());
        assert!(store.get_data(&key).is_empty());
        assert!(store.is_empty());
    }
}
