//! Builtin functions of the transform language.
//!
//! This table is the whole vocabulary an expression can call. Every entry is a
//! pure function of its arguments; none touches I/O, the clock, the
//! environment or any shared state.

use super::super::ast::Value;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Type for function implementations in the interpreter
pub type TransformFunction = fn(Vec<Value>) -> Result<Value, String>;

static BUILTINS: Lazy<HashMap<&'static str, TransformFunction>> = Lazy::new(|| {
    let mut functions: HashMap<&'static str, TransformFunction> = HashMap::new();

    // Math functions
    functions.insert("min", |args| {
        arity("min", &args, 2)?;
        match (&args[0], &args[1]) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(*a.min(b))),
            _ => {
                let (a, b) = two_numbers("min", &args)?;
                Ok(Value::Number(a.min(b)))
            }
        }
    });
    functions.insert("max", |args| {
        arity("max", &args, 2)?;
        match (&args[0], &args[1]) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(*a.max(b))),
            _ => {
                let (a, b) = two_numbers("max", &args)?;
                Ok(Value::Number(a.max(b)))
            }
        }
    });
    functions.insert("clamp", |args| {
        arity("clamp", &args, 3)?;
        if let (Value::Integer(value), Value::Integer(min), Value::Integer(max)) =
            (&args[0], &args[1], &args[2])
        {
            return Ok(Value::Integer(*value.max(min).min(max)));
        }
        let value = number("clamp", &args[0])?;
        let min = number("clamp", &args[1])?;
        let max = number("clamp", &args[2])?;
        Ok(Value::Number(value.max(min).min(max)))
    });
    functions.insert("abs", |args| {
        arity("abs", &args, 1)?;
        match &args[0] {
            Value::Integer(i) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| format!("abs() overflows on {}", i)),
            other => Ok(Value::Number(number("abs", other)?.abs())),
        }
    });
    functions.insert("floor", |args| {
        arity("floor", &args, 1)?;
        match &args[0] {
            Value::Integer(i) => Ok(Value::Integer(*i)),
            other => Ok(Value::Number(number("floor", other)?.floor())),
        }
    });
    functions.insert("ceil", |args| {
        arity("ceil", &args, 1)?;
        match &args[0] {
            Value::Integer(i) => Ok(Value::Integer(*i)),
            other => Ok(Value::Number(number("ceil", other)?.ceil())),
        }
    });
    functions.insert("round", |args| {
        if args.is_empty() || args.len() > 2 {
            return Err("round() requires 1 or 2 arguments".to_string());
        }
        let digits = match args.get(1) {
            Some(digits) => number("round", digits)?,
            None => 0.0,
        };
        if let Value::Integer(i) = &args[0] {
            if digits >= 0.0 {
                return Ok(Value::Integer(*i));
            }
        }
        let value = number("round", &args[0])?;
        let factor = 10f64.powi(digits as i32);
        Ok(Value::Number((value * factor).round() / factor))
    });

    // String functions
    functions.insert("concat", |args| {
        let mut result = String::new();
        for arg in &args {
            match arg {
                Value::String(s) => result.push_str(s),
                Value::Integer(i) => result.push_str(&i.to_string()),
                Value::Number(n) => result.push_str(&n.to_string()),
                Value::Boolean(b) => result.push_str(&b.to_string()),
                other => return Err(format!("concat() cannot join a {}", other.type_name())),
            }
        }
        Ok(Value::String(result))
    });
    functions.insert("lower", |args| {
        arity("lower", &args, 1)?;
        Ok(Value::String(string("lower", &args[0])?.to_lowercase()))
    });
    functions.insert("upper", |args| {
        arity("upper", &args, 1)?;
        Ok(Value::String(string("upper", &args[0])?.to_uppercase()))
    });
    functions.insert("trim", |args| {
        arity("trim", &args, 1)?;
        Ok(Value::String(string("trim", &args[0])?.trim().to_string()))
    });
    functions.insert("len", |args| {
        arity("len", &args, 1)?;
        Ok(Value::Integer(string("len", &args[0])?.chars().count() as i128))
    });
    functions.insert("substr", |args| {
        if args.len() != 2 && args.len() != 3 {
            return Err("substr() requires 2 or 3 arguments".to_string());
        }
        let s = string("substr", &args[0])?;
        let start = index("substr", &args[1])?;
        let taken: String = match args.get(2) {
            Some(count) => s.chars().skip(start).take(index("substr", count)?).collect(),
            None => s.chars().skip(start).collect(),
        };
        Ok(Value::String(taken))
    });
    functions.insert("replace", |args| {
        arity("replace", &args, 3)?;
        let s = string("replace", &args[0])?;
        let from = string("replace", &args[1])?;
        let to = string("replace", &args[2])?;
        if from.is_empty() {
            return Err("replace() pattern must not be empty".to_string());
        }
        Ok(Value::String(s.replace(from, to)))
    });
    functions.insert("contains", |args| {
        arity("contains", &args, 2)?;
        let s = string("contains", &args[0])?;
        Ok(Value::Boolean(s.contains(string("contains", &args[1])?)))
    });
    functions.insert("starts_with", |args| {
        arity("starts_with", &args, 2)?;
        let s = string("starts_with", &args[0])?;
        Ok(Value::Boolean(s.starts_with(string("starts_with", &args[1])?)))
    });
    functions.insert("ends_with", |args| {
        arity("ends_with", &args, 2)?;
        let s = string("ends_with", &args[0])?;
        Ok(Value::Boolean(s.ends_with(string("ends_with", &args[1])?)))
    });

    // Type conversion functions
    functions.insert("to_string", |args| {
        arity("to_string", &args, 1)?;
        let result = match &args[0] {
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Null => "null".to_string(),
            other => return Err(format!("to_string() cannot convert a {}", other.type_name())),
        };
        Ok(Value::String(result))
    });
    functions.insert("to_number", |args| {
        arity("to_number", &args, 1)?;
        match &args[0] {
            Value::Integer(i) => Ok(Value::Integer(*i)),
            Value::Number(n) => Ok(Value::Number(*n)),
            Value::Boolean(b) => Ok(Value::Integer(i128::from(*b))),
            Value::String(s) => {
                let text = s.trim();
                if let Ok(i) = text.parse::<i128>() {
                    return Ok(Value::Integer(i));
                }
                text.parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| format!("to_number() cannot parse \"{}\"", s))
            }
            other => Err(format!("to_number() cannot convert a {}", other.type_name())),
        }
    });
    functions.insert("to_boolean", |args| {
        arity("to_boolean", &args, 1)?;
        let result = match &args[0] {
            Value::Integer(i) => *i != 0,
            Value::Number(n) => *n != 0.0,
            Value::Boolean(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
            Value::Object(o) => !o.is_empty(),
            Value::Array(a) => !a.is_empty(),
        };
        Ok(Value::Boolean(result))
    });

    // Null handling
    functions.insert("is_null", |args| {
        arity("is_null", &args, 1)?;
        Ok(Value::Boolean(args[0] == Value::Null))
    });
    functions.insert("coalesce", |args| {
        Ok(args
            .into_iter()
            .find(|arg| *arg != Value::Null)
            .unwrap_or(Value::Null))
    });

    functions
});

/// Returns the builtin function table.
pub fn builtin_functions() -> &'static HashMap<&'static str, TransformFunction> {
    &BUILTINS
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), String> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(format!(
            "{}() requires exactly {} argument(s), got {}",
            name,
            expected,
            args.len()
        ))
    }
}

fn number(name: &str, value: &Value) -> Result<f64, String> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Number(n) => Ok(*n),
        other => Err(format!("{}() requires numeric arguments, got {}", name, other.type_name())),
    }
}

fn two_numbers(name: &str, args: &[Value]) -> Result<(f64, f64), String> {
    arity(name, args, 2)?;
    Ok((number(name, &args[0])?, number(name, &args[1])?))
}

fn string<'a>(name: &str, value: &'a Value) -> Result<&'a str, String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(format!("{}() requires string arguments, got {}", name, other.type_name())),
    }
}

fn index(name: &str, value: &Value) -> Result<usize, String> {
    let n = number(name, value)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!("{}() requires a non-negative whole number, got {}", name, n));
    }
    Ok(n as usize)
}
