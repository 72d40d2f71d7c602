//! Execution result, context, and statistics types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Scheduling priority attached to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Where a submitted command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Manual,
    File,
    Api,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::File => write!(f, "file"),
            Self::Api => write!(f, "api"),
        }
    }
}

/// Metadata describing why/how a command was submitted.
///
/// Opaque to the engine beyond being recorded alongside the result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Submission time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub priority: Priority,
    pub source: Source,
}

impl ExecutionContext {
    /// Context stamped with the current wall clock.
    pub fn new(source: Source, priority: Priority) -> Self {
        Self {
            timestamp: now_millis(),
            priority,
            source,
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Source::Manual, Priority::Medium)
    }
}

/// Uniform outcome of one executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Human-readable success or failure message.
    pub result: String,
    /// Owning subsystem label ("system" for all failures).
    pub module: String,
    /// Elapsed wall-clock time for the call, in milliseconds.
    pub execution_time_ms: u64,
}

/// Aggregate view over the execution history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Arithmetic mean of `execution_time_ms`, 0.0 when the history is empty.
    pub average_time: f64,
}
