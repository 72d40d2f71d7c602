//! In-memory store implementation.
//!
//! The whole store lives in a `BTreeMap<String, BTreeMap<String, String>>`
//! behind one mutex, so `keys()` comes back sorted for free.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use astra_types::error::Result;

use crate::KvStore;

type Namespaces = BTreeMap<String, BTreeMap<String, String>>;

/// A fully in-memory namespaced key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: Mutex<Namespaces>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Namespaces> {
        // A poisoned lock only means another thread panicked mid-write;
        // the map itself is still structurally sound.
        self.namespaces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, ns: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()
            .get(ns)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn set(&self, ns: &str, key: &str, value: &str) -> Result<()> {
        self.lock()
            .entry(ns.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, ns: &str, key: &str) -> Result<bool> {
        Ok(self
            .lock()
            .get_mut(ns)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }

    fn keys(&self, ns: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .get(ns)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
