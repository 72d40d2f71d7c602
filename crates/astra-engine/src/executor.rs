//! Command executor: parse → dispatch → uniform result → bounded history.
//!
//! `execute_command` is total: no failure escapes it. Every handler error is
//! folded into an `ExecutionResult { success: false, .. }` with module
//! "system", and every result (either way) lands in the in-memory history
//! and the persisted audit log.
//!
//! Construct one executor at process start and hand it by reference to all
//! callers; it is `Send + Sync` and safe to share.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use astra_sandbox::{Limits, SandboxHost};
use astra_store::KvStore;
use astra_types::config::EngineConfig;
use astra_types::error::{AstraError, Result};
use astra_types::exec::{ExecutionContext, ExecutionResult, ExecutionStats, now_millis};

use crate::audit::{AuditEntry, AuditLog};
use crate::codegen::CodeForge;
use crate::memory::MemoryBank;
use crate::parser::{self, FileValidation};
use crate::process::{ProcessStatus, ProcessTable};
use crate::registry::CommandRegistry;
use crate::vfs::{NO_FILES, VirtualFs};

pub struct CommandExecutor {
    registry: CommandRegistry,
    vfs: VirtualFs,
    memory: MemoryBank,
    processes: ProcessTable,
    forge: CodeForge,
    audit: AuditLog,
    history: Mutex<VecDeque<ExecutionResult>>,
    config: EngineConfig,
}

impl CommandExecutor {
    /// Build an executor over the injected store.
    pub fn new(store: Arc<dyn KvStore>, config: EngineConfig) -> Self {
        let vfs = VirtualFs::new(Arc::clone(&store));
        let memory = MemoryBank::new(Arc::clone(&store));
        let processes = ProcessTable::new(Arc::clone(&store), config.process_completion_ms);
        let audit = AuditLog::new(store, config.audit_cap);
        let forge = CodeForge::new(vfs.clone(), audit.clone());
        Self {
            registry: CommandRegistry::new(),
            vfs,
            memory,
            processes,
            forge,
            audit,
            history: Mutex::new(VecDeque::new()),
            config,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Execute one directive. Never fails past this boundary.
    pub fn execute_command(&self, text: &str, context: &ExecutionContext) -> ExecutionResult {
        let started = Instant::now();

        let outcome = match parser::parse(text) {
            None => Err(AstraError::InvalidParameters("empty command".into())),
            Some(cmd) => self
                .dispatch(&cmd.name, &cmd.parameters)
                .map(|message| (message, self.registry.module_for(&cmd.name))),
        };
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok((message, module)) => ExecutionResult {
                success: true,
                result: message,
                module: module.to_string(),
                execution_time_ms,
            },
            Err(e) => {
                log::warn!("command failed: {e}");
                ExecutionResult {
                    success: false,
                    result: e.to_string(),
                    module: "system".to_string(),
                    execution_time_ms,
                }
            },
        };

        self.record(text, context, &result);
        result
    }

    /// Execute every command line of a batch file sequentially, skipping
    /// blank lines and `#` comments. One result per executed line.
    pub fn execute_batch(
        &self,
        content: &str,
        context: &ExecutionContext,
    ) -> Vec<ExecutionResult> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| self.execute_command(line, context))
            .collect()
    }

    /// Validate a batch file against the registry without executing it.
    pub fn validate_command_file(&self, content: &str) -> FileValidation {
        parser::validate_command_file(content, &self.registry)
    }

    /// Fold the history into aggregate statistics.
    pub fn execution_stats(&self) -> ExecutionStats {
        let history = self.lock_history();
        let total = history.len();
        let successful = history.iter().filter(|r| r.success).count();
        let time_sum: u64 = history.iter().map(|r| r.execution_time_ms).sum();
        ExecutionStats {
            total,
            successful,
            failed: total - successful,
            average_time: if total == 0 {
                0.0
            } else {
                time_sum as f64 / total as f64
            },
        }
    }

    /// The in-memory history, most recent first.
    pub fn history(&self) -> Vec<ExecutionResult> {
        self.lock_history().iter().cloned().collect()
    }

    /// Empty the in-memory history. The persisted audit log is untouched.
    pub fn clear_history(&self) {
        self.lock_history().clear();
    }

    /// The most recent `n` persisted audit entries, newest first.
    pub fn recent_audit(&self, n: usize) -> Result<Vec<AuditEntry>> {
        self.audit.recent(n)
    }

    // -- Dispatch --

    fn dispatch(&self, name: &str, params: &str) -> Result<String> {
        self.artificial_delay();

        match name {
            "PRINT" => {
                log::info!(target: "output", "{params}");
                Ok(format!("Message displayed: {params}"))
            },
            "UPDATE_MEMORY" => {
                let (key, value) = params.split_once('=').ok_or_else(invalid_memory_format)?;
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || value.is_empty() {
                    return Err(invalid_memory_format());
                }
                self.memory.update(key, value)?;
                Ok(format!("Memory updated: {key} = {value}"))
            },
            "ACTIVATE_MODULE" => Ok(format!(
                "Module '{params}' has been activated successfully"
            )),
            "SYSTEM_STATUS" => Ok(
                "ASTRA system status: OPERATIONAL - all modules functioning normally".to_string(),
            ),
            "VOICE_SPEAK" => {
                log::info!(target: "voice", "{params}");
                Ok(format!("Voice output: \"{params}\""))
            },
            "EXECUTE_JS" => {
                let host = ExecHost {
                    memory: self.memory.clone(),
                };
                let value = astra_sandbox::evaluate(params, &host, &Limits::default())?;
                Ok(format!(
                    "Executed successfully. Result: {}",
                    serde_json::to_string(&value)?
                ))
            },
            "CREATE_FILE" => {
                let (file, content) = match params.split_once(char::is_whitespace) {
                    Some((file, content)) => (file, content),
                    None => (params, ""),
                };
                let size = self.vfs.create(file, content)?;
                Ok(format!("File created: {file} ({size} bytes)"))
            },
            "READ_FILE" => {
                let file = require_filename(params)?;
                let content = self.vfs.read(file)?;
                Ok(format!("File content of {file}:\n{content}"))
            },
            "DELETE_FILE" => {
                let file = require_filename(params)?;
                self.vfs.delete(file)?;
                Ok(format!("File deleted: {file}"))
            },
            "LIST_FILES" => {
                let files = self.vfs.list()?;
                if files.is_empty() {
                    return Ok(NO_FILES.to_string());
                }
                let lines: Vec<String> = files
                    .iter()
                    .map(|(file, size)| format!("- {file} ({size} bytes)"))
                    .collect();
                Ok(format!("Files ({}):\n{}", files.len(), lines.join("\n")))
            },
            "RUN_PROCESS" => {
                let pid = self.processes.start(params)?;
                Ok(format!("Process started: {params} (PID: {pid})"))
            },
            "KILL_PROCESS" => {
                let pid: u64 = params
                    .parse()
                    .map_err(|_| AstraError::NotFound(format!("process '{params}'")))?;
                match self.processes.stop(pid)? {
                    ProcessStatus::Completed => Ok(format!("Process {pid} already completed")),
                    _ => Ok(format!("Process terminated: {pid}")),
                }
            },
            "LIST_PROCESSES" => {
                let processes = self.processes.list()?;
                if processes.is_empty() {
                    return Ok("No active processes".to_string());
                }
                let now = now_millis();
                let lines: Vec<String> = processes
                    .iter()
                    .map(|p| {
                        format!(
                            "PID: {} | {} | Status: {} | Uptime: {}ms",
                            p.pid,
                            p.name,
                            p.status,
                            now.saturating_sub(p.start_time)
                        )
                    })
                    .collect();
                Ok(format!("Active processes:\n{}", lines.join("\n")))
            },
            "GENERATE_CODE" => {
                let (filename, code) = self.forge.generate(params)?;
                Ok(format!("Code generated and saved to: {filename}\n\n{code}"))
            },
            "COMPILE_CODE" => {
                self.forge.compile(params)?;
                Ok(format!("Code compiled successfully: {}", params.trim()))
            },
            "SELF_MODIFY" => self.forge.self_modify(params),
            other => Err(AstraError::UnknownCommand(other.to_string())),
        }
    }

    // -- Internals --

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<ExecutionResult>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append to the bounded history (newest first) and mirror the result
    /// into the audit log.
    fn record(&self, text: &str, context: &ExecutionContext, result: &ExecutionResult) {
        {
            let mut history = self.lock_history();
            history.push_front(result.clone());
            let cap = self.config.history_cap.max(1);
            while history.len() > cap {
                history.pop_back();
            }
        }

        let entry = AuditEntry {
            timestamp: context.timestamp,
            command: text.trim().to_string(),
            success: result.success,
            result: result.result.clone(),
            module: result.module.clone(),
            execution_time_ms: result.execution_time_ms,
            source: context.source.to_string(),
            priority: context.priority.to_string(),
        };
        if let Err(e) = self.audit.append(entry) {
            log::warn!("audit append failed: {e}");
        }
    }

    /// Bounded artificial latency modeling asynchronous work.
    fn artificial_delay(&self) {
        let (min, max) = self.config.latency_range();
        if max == 0 {
            return;
        }
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64 ^ (d.as_secs() << 20))
            .unwrap_or(0);
        let mixed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let delay = min + (mixed >> 33) % (max - min + 1);
        thread::sleep(Duration::from_millis(delay));
    }
}

fn invalid_memory_format() -> AstraError {
    AstraError::InvalidParameters("memory update expects key=value".into())
}

fn require_filename(params: &str) -> Result<&str> {
    if params.is_empty() {
        Err(AstraError::MissingIdentifier("filename".into()))
    } else {
        Ok(params)
    }
}

/// Allow-list host handed to the sandbox: logging plus the memory bank's
/// sandbox-scoped keys. Nothing else is reachable from evaluated code.
struct ExecHost {
    memory: MemoryBank,
}

impl SandboxHost for ExecHost {
    fn log(&self, message: &str) {
        log::info!(target: "sandbox", "{message}");
    }

    fn mem_get(&self, key: &str) -> Result<Option<String>> {
        self.memory.exec_get(key)
    }

    fn mem_set(&self, key: &str, value: &str) -> Result<()> {
        self.memory.exec_set(key, value)
    }
}
