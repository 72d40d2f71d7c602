//! Headless gateway entry point.
//!
//! Runs the command engine either interactively (each stdin line is a
//! directive) or over a batch file. State lives in memory unless `--store`
//! points at a directory, in which case it survives restarts.

use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use astra_engine::CommandExecutor;
use astra_store::{JsonFileStore, KvStore, MemoryStore};
use astra_types::config::EngineConfig;
use astra_types::exec::{ExecutionContext, ExecutionResult, Priority, Source};

struct Options {
    store_dir: Option<String>,
    config_path: Option<String>,
    batch_path: Option<String>,
}

const USAGE: &str = "\
usage: astra-gateway [--store <dir>] [--config <file>] [--batch <file>]

  --store <dir>    persist state under <dir> (default: in-memory)
  --config <file>  load engine settings from a TOML file
  --batch <file>   validate and execute a command file, then exit";

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        store_dir: None,
        config_path: None,
        batch_path: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut grab = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{name} needs a value\n{USAGE}"))
        };
        match arg.as_str() {
            "--store" => options.store_dir = Some(grab("--store")?),
            "--config" => options.config_path = Some(grab("--config")?),
            "--batch" => options.batch_path = Some(grab("--batch")?),
            "--help" | "-h" => bail!("{USAGE}"),
            other => bail!("unknown argument: {other}\n{USAGE}"),
        }
    }
    Ok(options)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;

    let config = match &options.config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            EngineConfig::from_toml_str(&text).with_context(|| format!("parsing config {path}"))?
        },
        None => EngineConfig::default(),
    };

    let store: Arc<dyn KvStore> = match &options.store_dir {
        Some(dir) => {
            log::info!("persisting state under {dir}");
            Arc::new(JsonFileStore::open(dir)?)
        },
        None => Arc::new(MemoryStore::new()),
    };

    let executor = CommandExecutor::new(store, config);

    match options.batch_path {
        Some(path) => run_batch(&executor, &path),
        None => repl(&executor),
    }
}

/// Validate, then execute a batch command file.
fn run_batch(executor: &CommandExecutor, path: &str) -> Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("reading batch {path}"))?;

    let validation = executor.validate_command_file(&content);
    if !validation.is_valid {
        for error in &validation.errors {
            eprintln!("{error}");
        }
        bail!("{path}: {} invalid command line(s)", validation.errors.len());
    }

    let context = ExecutionContext::new(Source::File, Priority::Medium);
    for result in executor.execute_batch(&content, &context) {
        print_result(&result);
    }
    print_stats(executor);
    Ok(())
}

/// Interactive loop: every line is a directive, `:`-prefixed lines are
/// local meta commands.
fn repl(executor: &CommandExecutor) -> Result<()> {
    println!("ASTRA command gateway - :help for meta commands, :quit to exit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            ":quit" | ":q" | "exit" => break,
            ":help" => {
                println!(":stats  :history  :audit  :clear  :quit");
                for def in executor.registry().definitions() {
                    println!("  {:16} {}", def.name, def.description);
                }
            },
            ":stats" => print_stats(executor),
            ":history" => {
                for result in executor.history() {
                    print_result(&result);
                }
            },
            ":audit" => {
                for entry in executor.recent_audit(20)? {
                    println!(
                        "[{}] {} -> {}",
                        if entry.success { "ok" } else { "err" },
                        entry.command,
                        entry.result
                    );
                }
            },
            ":clear" => {
                executor.clear_history();
                println!("History cleared.");
            },
            _ => {
                let context = ExecutionContext::new(Source::Manual, Priority::Medium);
                print_result(&executor.execute_command(line, &context));
            },
        }
    }
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    let tag = if result.success { "ok" } else { "err" };
    println!(
        "[{tag}] [{}] [{}ms] {}",
        result.module, result.execution_time_ms, result.result
    );
}

fn print_stats(executor: &CommandExecutor) {
    let stats = executor.execution_stats();
    println!(
        "total: {} | ok: {} | failed: {} | avg: {:.1}ms",
        stats.total, stats.successful, stats.failed, stats.average_time
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_args_defaults_to_repl() {
        let options = parse_args(&[]).unwrap();
        assert!(options.store_dir.is_none());
        assert!(options.config_path.is_none());
        assert!(options.batch_path.is_none());
    }

    #[test]
    fn parse_args_reads_values() {
        let options =
            parse_args(&strings(&["--store", "/tmp/s", "--batch", "cmds.txt"])).unwrap();
        assert_eq!(options.store_dir.as_deref(), Some("/tmp/s"));
        assert_eq!(options.batch_path.as_deref(), Some("cmds.txt"));
    }

    #[test]
    fn parse_args_rejects_missing_value() {
        assert!(parse_args(&strings(&["--store"])).is_err());
    }

    #[test]
    fn parse_args_rejects_unknown_flag() {
        assert!(parse_args(&strings(&["--wat"])).is_err());
    }
}
