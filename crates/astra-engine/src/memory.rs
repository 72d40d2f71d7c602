//! Persistent memory bank: key → value facts.
//!
//! Written by the UPDATE_MEMORY command. Sandbox-evaluated code sees only
//! keys under a reserved `exec:` prefix of the same namespace, so it cannot
//! read or clobber facts written by commands.

use std::sync::Arc;

use astra_store::KvStore;
use astra_types::error::Result;

const NS: &str = "memory";
const EXEC_PREFIX: &str = "exec:";

#[derive(Clone)]
pub struct MemoryBank {
    store: Arc<dyn KvStore>,
}

impl MemoryBank {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn update(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(NS, key, value)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(NS, key)
    }

    /// Sandbox-scoped read.
    pub fn exec_get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(NS, &format!("{EXEC_PREFIX}{key}"))
    }

    /// Sandbox-scoped write.
    pub fn exec_set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(NS, &format!("{EXEC_PREFIX}{key}"), value)
    }
}
