//! End-to-end tests driving the engine through its public surface only.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use astra_engine::{CommandExecutor, ExecutionContext};
use astra_store::{KvStore, MemoryStore};
use astra_types::config::EngineConfig;

const COMPLETION_MS: u64 = 40;

fn test_config() -> EngineConfig {
    EngineConfig {
        latency_min_ms: 0,
        latency_max_ms: 0,
        history_cap: 100,
        audit_cap: 100,
        process_completion_ms: COMPLETION_MS,
    }
}

fn gateway() -> CommandExecutor {
    CommandExecutor::new(Arc::new(MemoryStore::new()), test_config())
}

fn run(exec: &CommandExecutor, text: &str) -> astra_engine::ExecutionResult {
    exec.execute_command(text, &ExecutionContext::default())
}

/// Pull the pid out of a "Process started: name (PID: 123)" message.
fn extract_pid(message: &str) -> u64 {
    let start = message.rfind("PID: ").expect("message carries a pid") + 5;
    let digits: String = message[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().expect("pid parses")
}

#[test]
fn execute_command_is_total() {
    let exec = gateway();
    for text in ["", "   ", ":", "::::", "FOO", "FOO: x", "PRINT: ok", "\u{0}"] {
        let r = run(&exec, text);
        assert!(!r.module.is_empty(), "malformed result for {text:?}");
    }
}

#[test]
fn file_round_trip() {
    let exec = gateway();

    let created = run(&exec, "CREATE_FILE: a.txt hello world");
    assert!(created.success);

    let read = run(&exec, "READ_FILE: a.txt");
    assert!(read.success);
    assert!(read.result.contains("hello"));

    let deleted = run(&exec, "DELETE_FILE: a.txt");
    assert!(deleted.success);

    let read_again = run(&exec, "READ_FILE: a.txt");
    assert!(!read_again.success);
    assert!(read_again.result.contains("not found"));
}

#[test]
fn list_files_sentinel_is_idempotent() {
    let exec = gateway();
    let first = run(&exec, "LIST_FILES");
    let second = run(&exec, "LIST_FILES");
    assert_eq!(first.result, second.result);
    assert_eq!(first.result, "No files in virtual file system");

    run(&exec, "CREATE_FILE: a.txt x");
    let third = run(&exec, "LIST_FILES");
    assert!(third.result.contains("a.txt"));
}

#[test]
fn kill_beats_scheduled_completion() {
    let exec = gateway();

    let started = run(&exec, "RUN_PROCESS: worker");
    assert!(started.success);
    let pid = extract_pid(&started.result);

    let killed = run(&exec, &format!("KILL_PROCESS: {pid}"));
    assert!(killed.success);
    assert!(killed.result.contains("terminated"));

    // Wait well past the completion delay: the status must not flip.
    thread::sleep(Duration::from_millis(COMPLETION_MS * 5));
    let listing = run(&exec, "LIST_PROCESSES");
    assert!(listing.result.contains(&pid.to_string()));
    assert!(listing.result.contains("terminated"));
    assert!(!listing.result.contains("completed"));
}

#[test]
fn process_completes_when_left_alone() {
    let exec = gateway();
    let started = run(&exec, "RUN_PROCESS: drone");
    let pid = extract_pid(&started.result);

    thread::sleep(Duration::from_millis(COMPLETION_MS * 5));
    let listing = run(&exec, "LIST_PROCESSES");
    assert!(listing.result.contains(&pid.to_string()));
    assert!(listing.result.contains("completed"));
}

#[test]
fn kill_unknown_pid_fails() {
    let r = run(&gateway(), "KILL_PROCESS: 99991");
    assert!(!r.success);
    assert!(r.result.contains("not found"));
}

#[test]
fn unknown_command_message_names_the_command() {
    let r = run(&gateway(), "FOO: x");
    assert!(!r.success);
    assert!(r.result.contains("Unknown command: FOO"));
}

#[test]
fn sandbox_rejects_names_outside_the_allow_list() {
    let exec = gateway();
    for expr in ["localStorage", "fetch('x')", "process", "require('fs')"] {
        let r = run(&exec, &format!("EXECUTE_JS: {expr}"));
        assert!(!r.success, "{expr} must not evaluate");
        assert!(r.result.contains("evaluation failed"), "{}", r.result);
    }
}

#[test]
fn stats_match_the_recorded_outcomes() {
    let exec = gateway();
    for i in 0..4 {
        run(&exec, &format!("PRINT: {i}"));
    }
    run(&exec, "NOT_A_COMMAND");
    run(&exec, "ALSO_NOT_ONE");

    let stats = exec.execution_stats();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.successful, 4);
    assert_eq!(stats.failed, 2);

    let times: Vec<f64> = exec
        .history()
        .iter()
        .map(|r| r.execution_time_ms as f64)
        .collect();
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    assert!((stats.average_time - mean).abs() < 1e-9);
}

#[test]
fn batch_validation_partitions_lines() {
    let exec = gateway();
    let content = "\
PRINT: first
UPDATE_MEMORY: a=b
VOICE_SPEAK: done
IMAGINARY_COMMAND: boom
";
    let validation = exec.validate_command_file(content);
    assert!(!validation.is_valid);
    assert_eq!(validation.commands.len(), 3);
    assert_eq!(validation.errors.len(), 1);
    assert!(validation.errors[0].starts_with("Invalid command: IMAGINARY_COMMAND"));
}

#[test]
fn generate_then_compile() {
    let exec = gateway();
    let generated = run(&exec, "GENERATE_CODE: function pinger");
    assert!(generated.success);

    let filename = generated
        .result
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("Code generated and saved to: "))
        .expect("first line names the file")
        .to_string();

    let compiled = run(&exec, &format!("COMPILE_CODE: {filename}"));
    assert!(compiled.success, "{}", compiled.result);

    let unknown = run(&exec, "GENERATE_CODE: widget spinner");
    assert!(!unknown.success);
    assert!(unknown.result.contains("unknown code template"));
}

#[test]
fn self_modify_is_audited_and_bounded() {
    let exec = gateway();
    let ok = run(&exec, "SELF_MODIFY: optimize_performance");
    assert!(ok.success);

    let bad = run(&exec, "SELF_MODIFY: rewrite_kernel");
    assert!(!bad.success);
    assert!(bad.result.contains("unknown self-modification"));

    let audit = exec.recent_audit(10).unwrap();
    assert!(
        audit
            .iter()
            .any(|e| e.command.contains("optimize_performance") && e.source == "engine")
    );
}

#[test]
fn state_survives_an_engine_restart_on_a_shared_store() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    {
        let exec = CommandExecutor::new(Arc::clone(&store), test_config());
        run(&exec, "CREATE_FILE: keep.txt data");
        run(&exec, "UPDATE_MEMORY: mode=active");
    }

    let exec = CommandExecutor::new(store, test_config());
    let read = run(&exec, "READ_FILE: keep.txt");
    assert!(read.success);
    assert!(read.result.contains("data"));

    // The audit log kept the pre-restart commands too.
    let audit = exec.recent_audit(10).unwrap();
    assert!(audit.iter().any(|e| e.command.contains("keep.txt")));
}

#[test]
fn concurrent_callers_all_land_in_history() {
    let exec = Arc::new(gateway());
    let mut handles = Vec::new();
    for i in 0..8 {
        let exec = Arc::clone(&exec);
        handles.push(thread::spawn(move || {
            run(&exec, &format!("PRINT: thread {i}"))
        }));
    }
    for handle in handles {
        assert!(handle.join().unwrap().success);
    }
    assert_eq!(exec.execution_stats().total, 8);
}
