//! Abstract Syntax Tree (AST) definitions for the transform expression language.

use crate::error::{TransformError, TransformResult};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Represents a value in the transform language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An exact integer; wide enough for every JSON `i64` and `u64`
    Integer(i128),
    /// A numeric value (floating point)
    Number(f64),
    /// A boolean value
    Boolean(bool),
    /// A string value
    String(String),
    /// A null value
    Null,
    /// A JSON object value, opaque to the language
    Object(HashMap<String, JsonValue>),
    /// A JSON array value, opaque to the language
    Array(Vec<JsonValue>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Null => "null",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Null => write!(f, "null"),
            Value::Object(_) => write!(f, "<object>"),
            Value::Array(_) => write!(f, "<array>"),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Integer(i128::from(u))
                } else {
                    n.as_f64().map(Value::Number).unwrap_or(Value::Null)
                }
            }
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Null => Value::Null,
            JsonValue::Object(o) => Value::Object(o.into_iter().collect()),
            JsonValue::Array(a) => Value::Array(a),
        }
    }
}

impl TryFrom<Value> for JsonValue {
    type Error = TransformError;

    /// Integers come back exact; whole floats that fit an `i64` come back as
    /// JSON integers.
    fn try_from(value: Value) -> TransformResult<Self> {
        Ok(match value {
            Value::Integer(i) => {
                if let Ok(n) = i64::try_from(i) {
                    JsonValue::from(n)
                } else if let Ok(n) = u64::try_from(i) {
                    JsonValue::from(n)
                } else {
                    return Err(TransformError::Evaluation(format!(
                        "integer result {} is out of range",
                        i
                    )));
                }
            }
            Value::Number(n) if !n.is_finite() => {
                return Err(TransformError::Evaluation(format!("non-finite result {}", n)))
            }
            Value::Number(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 => {
                JsonValue::from(n as i64)
            }
            Value::Number(n) => JsonValue::from(n),
            Value::Boolean(b) => JsonValue::Bool(b),
            Value::String(s) => JsonValue::String(s),
            Value::Null => JsonValue::Null,
            Value::Object(o) => JsonValue::Object(o.into_iter().collect()),
            Value::Array(a) => JsonValue::Array(a),
        })
    }
}

/// Represents a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Addition, or string concatenation (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Remainder (%)
    Modulo,
    /// Power (^)
    Power,
    /// Equality (==)
    Equal,
    /// Inequality (!=)
    NotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "%" => Operator::Modulo,
            "^" => Operator::Power,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "&&" => Operator::And,
            "||" => Operator::Or,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Power => "^",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Represents a unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Negation (-)
    Negate,
    /// Logical NOT (!)
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}

/// Represents an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value
    Literal(Value),

    /// A variable reference
    Variable(String),

    /// A binary operation (e.g., a + b)
    BinaryOp {
        left: Box<Expression>,
        operator: Operator,
        right: Box<Expression>,
    },

    /// A unary operation (e.g., -a, !b)
    UnaryOp {
        operator: UnaryOperator,
        expr: Box<Expression>,
    },

    /// A call to a builtin function (e.g., min(a, b))
    FunctionCall { name: String, args: Vec<Expression> },

    /// if a > b then a else b
    IfElse {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },

    /// let x = a + b; x * 2
    LetBinding {
        name: String,
        value: Box<Expression>,
        body: Box<Expression>,
    },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::BinaryOp { left, operator, right } => {
                write!(f, "({} {} {})", left, operator, right)
            }
            Expression::UnaryOp { operator, expr } => write!(f, "{}({})", operator, expr),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::IfElse {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "if {} then {} else {}", condition, then_branch, else_branch),
            Expression::LetBinding { name, value, body } => {
                write!(f, "let {} = {}; {}", name, value, body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_numbers_convert_to_json_integers() {
        assert_eq!(JsonValue::try_from(Value::Number(42.0)), Ok(json!(42)));
        assert_eq!(JsonValue::try_from(Value::Number(-3.0)), Ok(json!(-3)));
        assert_eq!(JsonValue::try_from(Value::Number(2.5)), Ok(json!(2.5)));
    }

    #[test]
    fn test_large_integers_stay_exact() {
        let big = json!(9007199254740993i64);
        assert_eq!(Value::from(big.clone()), Value::Integer(9007199254740993));
        assert_eq!(JsonValue::try_from(Value::from(big.clone())), Ok(big));

        let unsigned = json!(u64::MAX);
        assert_eq!(JsonValue::try_from(Value::from(unsigned.clone())), Ok(unsigned));
        assert!(JsonValue::try_from(Value::Integer(i128::from(u64::MAX) + 1)).is_err());
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        assert!(JsonValue::try_from(Value::Number(f64::INFINITY)).is_err());
        assert!(JsonValue::try_from(Value::Number(f64::NAN)).is_err());
    }

    #[test]
    fn test_displays_expressions() {
        let expr = Expression::BinaryOp {
            left: Box::new(Expression::Variable("val".to_string())),
            operator: Operator::Multiply,
            right: Box::new(Expression::Literal(Value::Number(2.0))),
        };
        assert_eq!(expr.to_string(), "(val * 2)");
    }
}
