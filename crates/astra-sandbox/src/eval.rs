//! Tree-walking evaluator with a step budget.

use astra_types::error::{AstraError, Result};
use astra_types::exec::now_millis;
use serde_json::Value;

use crate::SandboxHost;
use crate::parser::{BinaryOp, Expr, Lit, UnaryOp};

pub struct Evaluator<'a> {
    host: &'a dyn SandboxHost,
    steps: u64,
    max_steps: u64,
}

impl<'a> Evaluator<'a> {
    pub fn new(host: &'a dyn SandboxHost, max_steps: u64) -> Self {
        Self {
            host,
            steps: 0,
            max_steps,
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(AstraError::Evaluation(format!(
                "step budget exhausted (limit {})",
                self.max_steps
            )));
        }

        match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::Array(values))
            },
            Expr::Ident(name) => match name.as_str() {
                "pi" => number(std::f64::consts::PI),
                _ => Err(AstraError::Evaluation(format!("unknown name '{name}'"))),
            },
            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?;
                match op {
                    UnaryOp::Neg => number(-as_num(&value)?),
                    UnaryOp::Not => Ok(Value::Bool(!as_bool(&value)?)),
                }
            },
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Call { name, args } => self.call(name, args),
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                index_value(&target, &index)
            },
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value> {
        // Logical operators short-circuit; everything else is strict.
        if op == BinaryOp::And {
            return if !as_bool(&self.eval(lhs)?)? {
                Ok(Value::Bool(false))
            } else {
                Ok(Value::Bool(as_bool(&self.eval(rhs)?)?))
            };
        }
        if op == BinaryOp::Or {
            return if as_bool(&self.eval(lhs)?)? {
                Ok(Value::Bool(true))
            } else {
                Ok(Value::Bool(as_bool(&self.eval(rhs)?)?))
            };
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;
        match op {
            BinaryOp::Add => {
                if left.is_string() || right.is_string() {
                    Ok(Value::String(format!(
                        "{}{}",
                        display_value(&left),
                        display_value(&right)
                    )))
                } else {
                    number(as_num(&left)? + as_num(&right)?)
                }
            },
            BinaryOp::Sub => number(as_num(&left)? - as_num(&right)?),
            BinaryOp::Mul => number(as_num(&left)? * as_num(&right)?),
            BinaryOp::Div => {
                let divisor = as_num(&right)?;
                if divisor == 0.0 {
                    return Err(AstraError::Evaluation("division by zero".into()));
                }
                number(as_num(&left)? / divisor)
            },
            BinaryOp::Rem => {
                let divisor = as_num(&right)?;
                if divisor == 0.0 {
                    return Err(AstraError::Evaluation("modulo by zero".into()));
                }
                number(as_num(&left)? % divisor)
            },
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                compare(op, &left, &right)
            },
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Result<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }

        match name {
            "log" => {
                let parts: Vec<String> = values.iter().map(display_value).collect();
                self.host.log(&parts.join(" "));
                Ok(Value::Null)
            },
            "abs" => number(one_num(name, &values)?.abs()),
            "floor" => number(one_num(name, &values)?.floor()),
            "ceil" => number(one_num(name, &values)?.ceil()),
            "round" => number(one_num(name, &values)?.round()),
            "sqrt" => {
                let n = one_num(name, &values)?;
                if n < 0.0 {
                    return Err(AstraError::Evaluation(
                        "sqrt of a negative number".into(),
                    ));
                }
                number(n.sqrt())
            },
            "pow" => {
                arity(name, &values, 2)?;
                number(as_num(&values[0])?.powf(as_num(&values[1])?))
            },
            "min" | "max" => {
                if values.is_empty() {
                    return Err(AstraError::Evaluation(format!(
                        "{name} expects at least 1 argument"
                    )));
                }
                let mut acc = as_num(&values[0])?;
                for v in &values[1..] {
                    let n = as_num(v)?;
                    acc = if name == "min" { acc.min(n) } else { acc.max(n) };
                }
                number(acc)
            },
            "len" => {
                arity(name, &values, 1)?;
                match &values[0] {
                    Value::String(s) => number(s.chars().count() as f64),
                    Value::Array(items) => number(items.len() as f64),
                    other => Err(AstraError::Evaluation(format!(
                        "len expects a string or array, got {}",
                        kind(other)
                    ))),
                }
            },
            "now" => {
                arity(name, &values, 0)?;
                number(now_millis() as f64)
            },
            "str" => {
                arity(name, &values, 1)?;
                Ok(Value::String(display_value(&values[0])))
            },
            "num" => {
                arity(name, &values, 1)?;
                match &values[0] {
                    Value::Number(n) => number(n.as_f64().unwrap_or(0.0)),
                    Value::Bool(b) => number(if *b { 1.0 } else { 0.0 }),
                    Value::String(s) => {
                        let n: f64 = s.trim().parse().map_err(|_| {
                            AstraError::Evaluation(format!("not a number: {s:?}"))
                        })?;
                        number(n)
                    },
                    other => Err(AstraError::Evaluation(format!(
                        "num expects a number, bool, or string, got {}",
                        kind(other)
                    ))),
                }
            },
            "json" => {
                arity(name, &values, 1)?;
                let text = serde_json::to_string(&values[0])
                    .map_err(|e| AstraError::Evaluation(format!("serialize: {e}")))?;
                Ok(Value::String(text))
            },
            "parse" => {
                arity(name, &values, 1)?;
                let text = as_str(name, &values[0])?;
                serde_json::from_str(text)
                    .map_err(|e| AstraError::Evaluation(format!("parse: {e}")))
            },
            "mem_get" => {
                arity(name, &values, 1)?;
                let key = as_str(name, &values[0])?;
                Ok(match self.host.mem_get(key)? {
                    Some(value) => Value::String(value),
                    None => Value::Null,
                })
            },
            "mem_set" => {
                arity(name, &values, 2)?;
                let key = as_str(name, &values[0])?;
                self.host.mem_set(key, &display_value(&values[1]))?;
                Ok(Value::Null)
            },
            other => Err(AstraError::Evaluation(format!(
                "unknown function '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn literal(lit: &Lit) -> Result<Value> {
    match lit {
        Lit::Num(n) => number(*n),
        Lit::Str(s) => Ok(Value::String(s.clone())),
        Lit::Bool(b) => Ok(Value::Bool(*b)),
        Lit::Null => Ok(Value::Null),
    }
}

fn number(n: f64) -> Result<Value> {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| AstraError::Evaluation("arithmetic produced a non-finite number".into()))
}

fn as_num(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AstraError::Evaluation("number out of range".into())),
        other => Err(AstraError::Evaluation(format!(
            "expected a number, got {}",
            kind(other)
        ))),
    }
}

fn as_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(AstraError::Evaluation(format!(
            "expected a boolean, got {}",
            kind(other)
        ))),
    }
}

fn as_str<'v>(fn_name: &str, value: &'v Value) -> Result<&'v str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(AstraError::Evaluation(format!(
            "{fn_name} expects a string, got {}",
            kind(other)
        ))),
    }
}

fn one_num(fn_name: &str, values: &[Value]) -> Result<f64> {
    arity(fn_name, values, 1)?;
    as_num(&values[0])
}

fn arity(fn_name: &str, values: &[Value], expected: usize) -> Result<()> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(AstraError::Evaluation(format!(
            "{fn_name} expects {expected} argument(s), got {}",
            values.len()
        )))
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value> {
    let raw = as_num(index)?;
    if raw < 0.0 || raw.fract() != 0.0 {
        return Err(AstraError::Evaluation(
            "index must be a non-negative integer".into(),
        ));
    }
    let i = raw as usize;
    match target {
        Value::Array(items) => items.get(i).cloned().ok_or_else(|| {
            AstraError::Evaluation(format!("index {i} out of range (len {})", items.len()))
        }),
        Value::String(s) => s
            .chars()
            .nth(i)
            .map(|c| Value::String(c.to_string()))
            .ok_or_else(|| {
                AstraError::Evaluation(format!(
                    "index {i} out of range (len {})",
                    s.chars().count()
                ))
            }),
        other => Err(AstraError::Evaluation(format!(
            "cannot index {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numbers compare by numeric value so `parse()` output mixes with literals.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Number(_), Value::Number(_)) => as_num(left)?
            .partial_cmp(&as_num(right)?)
            .ok_or_else(|| AstraError::Evaluation("incomparable numbers".into()))?,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            return Err(AstraError::Evaluation(format!(
                "cannot compare {} with {}",
                kind(left),
                kind(right)
            )));
        },
    };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("compare only handles ordering operators"),
    };
    Ok(Value::Bool(result))
}

/// Render a value the way `str()`, `log()`, and string concatenation see it:
/// strings bare, whole numbers without the trailing `.0`, everything else as
/// JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_whole_numbers_without_fraction() {
        assert_eq!(display_value(&Value::from(42.0)), "42");
        assert_eq!(display_value(&Value::from(3.5)), "3.5");
        assert_eq!(display_value(&Value::from(-2.0)), "-2");
    }

    #[test]
    fn display_strings_bare() {
        assert_eq!(display_value(&Value::from("hi")), "hi");
    }

    #[test]
    fn display_compound_as_json() {
        let v = Value::Array(vec![Value::Null, Value::Bool(true)]);
        assert_eq!(display_value(&v), "[null,true]");
    }

    #[test]
    fn numeric_equality_crosses_representations() {
        assert!(values_equal(&Value::from(1u64), &Value::from(1.0)));
        assert!(!values_equal(&Value::from(1u64), &Value::from(2.0)));
    }
}
