//! Persisted audit log of executed commands.
//!
//! A larger-capacity mirror of the in-memory history, written through the
//! store so past results survive gateway restarts. Entries are kept oldest
//! first in one JSON document; the cap drops the oldest entries and never
//! the newest.

use std::sync::{Arc, Mutex, MutexGuard};

use astra_store::KvStore;
use astra_types::error::Result;
use serde::{Deserialize, Serialize};

const NS: &str = "audit";
const KEY: &str = "log";

/// One audited command execution (or engine-internal action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Submission time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// The raw directive (or a label for engine-internal actions).
    pub command: String,
    pub success: bool,
    pub result: String,
    pub module: String,
    pub execution_time_ms: u64,
    /// "manual", "file", "api", or "engine" for internal actions.
    pub source: String,
    pub priority: String,
}

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn KvStore>,
    cap: usize,
    writes: Arc<Mutex<()>>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn KvStore>, cap: usize) -> Self {
        Self {
            store,
            // A zero cap would drop the entry being appended.
            cap: cap.max(1),
            writes: Arc::new(Mutex::new(())),
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_all(&self) -> Result<Vec<AuditEntry>> {
        match self.store.get(NS, KEY)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    /// Append one entry, trimming the oldest past the cap.
    pub fn append(&self, entry: AuditEntry) -> Result<()> {
        let _guard = self.lock_writes();
        let mut entries = self.read_all()?;
        entries.push(entry);
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }
        self.store.set(NS, KEY, &serde_json::to_string(&entries)?)
    }

    /// The most recent `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Result<Vec<AuditEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().rev().take(n).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_all()?.is_empty())
    }
}
