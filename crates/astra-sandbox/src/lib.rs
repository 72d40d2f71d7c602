//! Capability-scoped expression evaluator.
//!
//! Evaluates a small expression language against an explicit allow-list:
//! arithmetic, comparison, logic, string concatenation, array literals and
//! indexing, plus a fixed set of functions (logging, math, time,
//! serialization, and the host's namespaced memory). Nothing outside the
//! allow-list is reachable from evaluated code; unknown names and calls fail
//! with an evaluation error. The evaluator owns its own resource limits:
//! source length, parse depth, and an evaluation step budget.

mod eval;
mod lexer;
mod parser;

use astra_types::error::{AstraError, Result};
use serde_json::Value;

/// Resource limits owned by the evaluator.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum accepted source length in bytes.
    pub max_source_len: usize,
    /// Maximum expression nesting depth.
    pub max_depth: usize,
    /// Maximum number of evaluation steps (AST nodes visited).
    pub max_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_source_len: 4096,
            max_depth: 64,
            max_steps: 100_000,
        }
    }
}

/// The capabilities evaluated code may reach.
///
/// This trait is the security contract: the evaluator can call nothing on
/// the host beyond these three operations, and `mem_get`/`mem_set` are
/// expected to be namespaced so evaluated code cannot touch unrelated state.
pub trait SandboxHost {
    /// Emit a log line on behalf of evaluated code.
    fn log(&self, message: &str);

    /// Read a sandbox-visible memory value.
    fn mem_get(&self, key: &str) -> Result<Option<String>>;

    /// Write a sandbox-visible memory value.
    fn mem_set(&self, key: &str, value: &str) -> Result<()>;
}

/// Evaluate `source` against `host` under `limits`.
///
/// Any lexing, parsing, or runtime failure is reported as an evaluation
/// error carrying the underlying message.
pub fn evaluate(source: &str, host: &dyn SandboxHost, limits: &Limits) -> Result<Value> {
    if source.trim().is_empty() {
        return Err(AstraError::Evaluation("empty expression".into()));
    }
    if source.len() > limits.max_source_len {
        return Err(AstraError::Evaluation(format!(
            "source too long: {} bytes (limit {})",
            source.len(),
            limits.max_source_len
        )));
    }
    log::debug!("evaluating {}-byte expression", source.len());
    let tokens = lexer::lex(source)?;
    let expr = parser::parse(&tokens, limits.max_depth)?;
    eval::Evaluator::new(host, limits.max_steps).eval(&expr)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Host that records log lines and keeps memory in a map.
    #[derive(Default)]
    struct TestHost {
        logs: Mutex<Vec<String>>,
        mem: Mutex<std::collections::BTreeMap<String, String>>,
    }

    impl SandboxHost for TestHost {
        fn log(&self, message: &str) {
            self.logs.lock().unwrap().push(message.to_string());
        }
        fn mem_get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.mem.lock().unwrap().get(key).cloned())
        }
        fn mem_set(&self, key: &str, value: &str) -> Result<()> {
            self.mem
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn eval_ok(src: &str) -> Value {
        evaluate(src, &TestHost::default(), &Limits::default()).unwrap()
    }

    fn eval_err(src: &str) -> String {
        format!(
            "{}",
            evaluate(src, &TestHost::default(), &Limits::default()).unwrap_err()
        )
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval_ok("1 + 2 * 3"), Value::from(7.0));
        assert_eq!(eval_ok("(1 + 2) * 3"), Value::from(9.0));
        assert_eq!(eval_ok("10 % 4"), Value::from(2.0));
        assert_eq!(eval_ok("-3 + 5"), Value::from(2.0));
    }

    #[test]
    fn string_concat() {
        assert_eq!(eval_ok("'a' + 'b'"), Value::from("ab"));
        assert_eq!(eval_ok("\"n=\" + 2"), Value::from("n=2"));
    }

    #[test]
    fn comparison_and_logic() {
        assert_eq!(eval_ok("1 < 2 && 2 <= 2"), Value::from(true));
        assert_eq!(eval_ok("'a' > 'b' || false"), Value::from(false));
        assert_eq!(eval_ok("!(1 == 2)"), Value::from(true));
        assert_eq!(eval_ok("null == null"), Value::from(true));
    }

    #[test]
    fn arrays_and_indexing() {
        assert_eq!(eval_ok("[1, 2, 3][1]"), Value::from(2.0));
        assert_eq!(eval_ok("len([1, 2, 3])"), Value::from(3.0));
        assert_eq!(eval_ok("'hello'[1]"), Value::from("e"));
    }

    #[test]
    fn math_functions() {
        assert_eq!(eval_ok("abs(0 - 4)"), Value::from(4.0));
        assert_eq!(eval_ok("min(3, 1, 2)"), Value::from(1.0));
        assert_eq!(eval_ok("max(3, 1, 2)"), Value::from(3.0));
        assert_eq!(eval_ok("floor(1.9)"), Value::from(1.0));
        assert_eq!(eval_ok("ceil(1.1)"), Value::from(2.0));
        assert_eq!(eval_ok("round(1.5)"), Value::from(2.0));
        assert_eq!(eval_ok("sqrt(9)"), Value::from(3.0));
        assert_eq!(eval_ok("pow(2, 10)"), Value::from(1024.0));
    }

    #[test]
    fn serialization_functions() {
        assert_eq!(eval_ok("str(42)"), Value::from("42"));
        assert_eq!(eval_ok("num('3.5')"), Value::from(3.5));
        assert_eq!(eval_ok("json([1, 2])"), Value::from("[1.0,2.0]"));
        assert_eq!(eval_ok("num(parse('[1, 2]')[0])"), Value::from(1.0));
    }

    #[test]
    fn now_returns_epoch_millis() {
        let v = eval_ok("now()");
        assert!(v.as_f64().unwrap() > 1.0e12);
    }

    #[test]
    fn log_goes_to_host() {
        let host = TestHost::default();
        let v = evaluate("log('hello', 1 + 1)", &host, &Limits::default()).unwrap();
        assert_eq!(v, Value::Null);
        assert_eq!(host.logs.lock().unwrap().as_slice(), ["hello 2"]);
    }

    #[test]
    fn memory_round_trip() {
        let host = TestHost::default();
        evaluate("mem_set('counter', 41 + 1)", &host, &Limits::default()).unwrap();
        let v = evaluate("mem_get('counter')", &host, &Limits::default()).unwrap();
        assert_eq!(v, Value::from("42"));
    }

    #[test]
    fn mem_get_missing_is_null() {
        assert_eq!(eval_ok("mem_get('nope')"), Value::Null);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let msg = eval_err("window");
        assert!(msg.contains("evaluation failed"), "{msg}");
        assert!(msg.contains("window"), "{msg}");
    }

    #[test]
    fn unknown_function_is_rejected() {
        let msg = eval_err("read_file('x')");
        assert!(msg.contains("unknown function"), "{msg}");
    }

    #[test]
    fn forbidden_capabilities_stay_unreachable() {
        for src in [
            "localStorage",
            "fetch('http://x')",
            "process",
            "eval('1')",
            "import('x')",
        ] {
            assert!(
                evaluate(src, &TestHost::default(), &Limits::default()).is_err(),
                "{src} should not evaluate"
            );
        }
    }

    #[test]
    fn syntax_error_carries_message() {
        let msg = eval_err("1 +");
        assert!(msg.contains("evaluation failed"), "{msg}");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(eval_err("1 / 0").contains("division by zero"));
    }

    #[test]
    fn empty_expression_is_an_error() {
        assert!(eval_err("   ").contains("empty expression"));
    }

    #[test]
    fn source_length_limit() {
        let limits = Limits {
            max_source_len: 8,
            ..Limits::default()
        };
        let err = evaluate("1 + 2 + 3 + 4", &TestHost::default(), &limits).unwrap_err();
        assert!(format!("{err}").contains("source too long"));
    }

    #[test]
    fn depth_limit() {
        let limits = Limits {
            max_depth: 4,
            ..Limits::default()
        };
        let err = evaluate("((((((1))))))", &TestHost::default(), &limits).unwrap_err();
        assert!(format!("{err}").contains("too deeply nested"));
    }

    #[test]
    fn step_budget() {
        let limits = Limits {
            max_steps: 5,
            ..Limits::default()
        };
        let err = evaluate(
            "1 + 2 + 3 + 4 + 5 + 6 + 7 + 8",
            &TestHost::default(),
            &limits,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("step budget"));
    }
}
