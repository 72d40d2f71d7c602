//! Virtual process table with scheduled completions.
//!
//! A virtual process is a simulated background task: it starts `running`,
//! and a detached timer moves it to `completed` after a fixed duration
//! unless it was explicitly terminated first. `completed` and `terminated`
//! are absorbing: once reached, the status never changes again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use astra_store::KvStore;
use astra_types::error::{AstraError, Result};
use astra_types::exec::now_millis;
use serde::{Deserialize, Serialize};

const NS: &str = "proc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Completed,
    Terminated,
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// One entry in the process table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualProcess {
    pub pid: u64,
    pub name: String,
    pub status: ProcessStatus,
    /// Milliseconds since the Unix epoch.
    pub start_time: u64,
}

/// Persisted pid → process mapping.
///
/// Every status transition is a read-modify-write on the store, so all
/// transitions (explicit stops and timer completions alike) are serialized
/// behind one table mutex; the completion callback re-checks the status
/// under that mutex before writing.
#[derive(Clone)]
pub struct ProcessTable {
    store: Arc<dyn KvStore>,
    transitions: Arc<Mutex<()>>,
    last_pid: Arc<AtomicU64>,
    completion: Duration,
}

impl ProcessTable {
    pub fn new(store: Arc<dyn KvStore>, completion_ms: u64) -> Self {
        Self {
            store,
            transitions: Arc::new(Mutex::new(())),
            last_pid: Arc::new(AtomicU64::new(0)),
            completion: Duration::from_millis(completion_ms),
        }
    }

    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transitions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Time-derived pid with a monotonic floor, so rapid starts cannot
    /// collide.
    fn next_pid(&self) -> u64 {
        let now = now_millis();
        let mut last = self.last_pid.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_pid.compare_exchange(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    fn load(&self, pid: u64) -> Result<Option<VirtualProcess>> {
        match self.store.get(NS, &pid.to_string())? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, process: &VirtualProcess) -> Result<()> {
        self.store.set(
            NS,
            &process.pid.to_string(),
            &serde_json::to_string(process)?,
        )
    }

    /// Create a `running` entry and schedule its detached completion.
    pub fn start(&self, name: &str) -> Result<u64> {
        let pid = self.next_pid();
        let process = VirtualProcess {
            pid,
            name: name.to_string(),
            status: ProcessStatus::Running,
            start_time: now_millis(),
        };
        {
            let _guard = self.lock_transitions();
            self.save(&process)?;
        }

        let table = self.clone();
        thread::spawn(move || {
            thread::sleep(table.completion);
            if let Err(e) = table.complete_if_running(pid) {
                log::warn!("process {pid}: scheduled completion failed: {e}");
            }
        });

        log::info!("process started: '{name}' (pid {pid})");
        Ok(pid)
    }

    /// The scheduled `running → completed` transition. No-op if the entry
    /// was terminated (or removed) in the meantime.
    fn complete_if_running(&self, pid: u64) -> Result<()> {
        let _guard = self.lock_transitions();
        if let Some(mut process) = self.load(pid)?
            && process.status == ProcessStatus::Running
        {
            process.status = ProcessStatus::Completed;
            self.save(&process)?;
            log::debug!("process {pid} completed");
        }
        Ok(())
    }

    /// Explicit termination. Beats a pending completion; an entry already
    /// in an absorbing state keeps it. Returns the final status.
    pub fn stop(&self, pid: u64) -> Result<ProcessStatus> {
        let _guard = self.lock_transitions();
        let mut process = self
            .load(pid)?
            .ok_or_else(|| AstraError::NotFound(format!("process {pid}")))?;
        if process.status == ProcessStatus::Running {
            process.status = ProcessStatus::Terminated;
            self.save(&process)?;
            log::info!("process {pid} terminated");
        }
        Ok(process.status)
    }

    /// Current status, if the pid exists.
    pub fn status(&self, pid: u64) -> Result<Option<ProcessStatus>> {
        Ok(self.load(pid)?.map(|p| p.status))
    }

    /// All entries, ordered by pid.
    pub fn list(&self) -> Result<Vec<VirtualProcess>> {
        let mut processes = Vec::new();
        for key in self.store.keys(NS)? {
            let Ok(pid) = key.parse::<u64>() else {
                log::warn!("ignoring malformed process key {key:?}");
                continue;
            };
            if let Some(process) = self.load(pid)? {
                processes.push(process);
            }
        }
        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }
}
