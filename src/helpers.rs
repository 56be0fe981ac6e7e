//! Functions available to layouts.
//!
//! [`TemplateHelpers`] is a registry of named template globals. The stock
//! set holds the numeric helpers:
//!
//! | Call | Result |
//! |------|--------|
//! | `add(a, b, ...)` | `a + b + ...` |
//! | `sub(a, b, ...)` | `a - b - ...` |
//! | `mul(a, b, ...)` | `a * b * ...` |
//! | `div(a, b, ...)` | `a / b / ...`, always a float |
//! | `inc(a)` / `dec(a)` | `a + 1` / `a - 1` |
//! | `float(a)` | `a` as a float |
//! | `int(a)` | `a` truncated to an integer (`3.9` → `3`) |
//!
//! Arguments may be numbers or numeric strings. Integer inputs give integer
//! results, except for `div` and `float`.

use minijinja::value::Rest;
use minijinja::{Environment, Error, ErrorKind, Value};

/// Named functions installed into the template environment.
#[derive(Debug, Clone, Default)]
pub struct TemplateHelpers {
    functions: Vec<(&'static str, Value)>,
}

impl TemplateHelpers {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock numeric helpers.
    pub fn numeric() -> Self {
        Self::new()
            .with("add", Value::from_function(add))
            .with("sub", Value::from_function(sub))
            .with("mul", Value::from_function(mul))
            .with("div", Value::from_function(div))
            .with("inc", Value::from_function(inc))
            .with("dec", Value::from_function(dec))
            .with("float", Value::from_function(float))
            .with("int", Value::from_function(int))
    }

    /// Register `function` under `name`, replacing any previous entry.
    pub fn with(mut self, name: &'static str, function: Value) -> Self {
        self.functions.retain(|(existing, _)| *existing != name);
        self.functions.push((name, function));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.functions.iter().map(|(name, _)| *name).collect()
    }

    pub fn install(&self, env: &mut Environment<'_>) {
        for (name, function) in &self.functions {
            env.add_global(*name, function.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(value: &Value) -> Result<Num, Error> {
        if let Some(text) = value.as_str() {
            let text = text.trim();
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Num::Int(i));
            }
            if let Ok(f) = text.parse::<f64>() {
                return Ok(Num::Float(f));
            }
        } else if value.is_integer() {
            if let Ok(i) = i64::try_from(value.clone()) {
                return Ok(Num::Int(i));
            }
        } else if value.is_number() {
            if let Ok(f) = f64::try_from(value.clone()) {
                return Ok(Num::Float(f));
            }
        }
        Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("expected a number, got {value}"),
        ))
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::from(i),
            Num::Float(f) => Value::from(f),
        }
    }
}

fn overflow() -> Error {
    Error::new(ErrorKind::InvalidOperation, "integer overflow")
}

/// Left fold over the arguments. Integer arithmetic is used while every
/// operand is an integer.
fn fold(
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Error> {
    let mut nums = args.iter().map(Num::from_value);
    let mut acc = match nums.next() {
        Some(first) => first?,
        None => {
            return Err(Error::new(
                ErrorKind::MissingArgument,
                "at least one argument is required",
            ));
        }
    };
    for num in nums {
        acc = match (acc, num?) {
            (Num::Int(a), Num::Int(b)) => Num::Int(int_op(a, b).ok_or_else(overflow)?),
            (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
        };
    }
    Ok(acc.into_value())
}

fn add(args: Rest<Value>) -> Result<Value, Error> {
    fold(&args, i64::checked_add, |a, b| a + b)
}

fn sub(args: Rest<Value>) -> Result<Value, Error> {
    fold(&args, i64::checked_sub, |a, b| a - b)
}

fn mul(args: Rest<Value>) -> Result<Value, Error> {
    fold(&args, i64::checked_mul, |a, b| a * b)
}

fn div(args: Rest<Value>) -> Result<Value, Error> {
    let mut nums = args.iter().map(Num::from_value);
    let mut acc = match nums.next() {
        Some(first) => first?.as_f64(),
        None => {
            return Err(Error::new(
                ErrorKind::MissingArgument,
                "at least one argument is required",
            ));
        }
    };
    for num in nums {
        let divisor = num?.as_f64();
        if divisor == 0.0 {
            return Err(Error::new(ErrorKind::InvalidOperation, "division by zero"));
        }
        acc /= divisor;
    }
    Ok(Value::from(acc))
}

fn inc(value: Value) -> Result<Value, Error> {
    fold(&[value, Value::from(1)], i64::checked_add, |a, b| a + b)
}

fn dec(value: Value) -> Result<Value, Error> {
    fold(&[value, Value::from(1)], i64::checked_sub, |a, b| a - b)
}

fn float(value: Value) -> Result<Value, Error> {
    Ok(Value::from(Num::from_value(&value)?.as_f64()))
}

fn int(value: Value) -> Result<Value, Error> {
    Ok(match Num::from_value(&value)? {
        Num::Int(i) => Value::from(i),
        Num::Float(f) => Value::from(f.trunc() as i64),
    })
}
