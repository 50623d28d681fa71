//! Interpreter for the transform expression language.
//!
//! Walks an [`Expression`] tree and produces a [`Value`]. The only names an
//! expression can reach are its own `let` bindings, the variables the caller
//! binds (normally just `val`), and the builtin function table.

use super::ast::{Expression, Operator, UnaryOperator, Value};
use crate::error::{TransformError, TransformResult};
use std::collections::HashMap;

pub mod builtins;
pub use builtins::{builtin_functions, TransformFunction};

/// Maximum nesting of expressions evaluated before giving up.
const MAX_DEPTH: usize = 256;

/// Interpreter for the transform expression language.
pub struct Interpreter {
    /// Variables in the current scope
    variables: HashMap<String, Value>,

    /// Built-in functions
    functions: &'static HashMap<&'static str, TransformFunction>,

    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            variables: HashMap::new(),
            functions: builtin_functions(),
            depth: 0,
        }
    }
}

impl Interpreter {
    /// Creates a new interpreter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new interpreter with the given variables.
    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        let mut interpreter = Self::new();
        interpreter.variables = variables;
        interpreter
    }

    /// Evaluates an expression.
    pub fn evaluate(&mut self, expr: &Expression) -> TransformResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(TransformError::Evaluation(
                "Expression nesting too deep".to_string(),
            ));
        }
        self.depth += 1;
        let result = self.evaluate_inner(expr);
        self.depth -= 1;
        result
    }

    fn evaluate_inner(&mut self, expr: &Expression) -> TransformResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => self.evaluate_variable(name),
            Expression::BinaryOp {
                left,
                operator,
                right,
            } => self.evaluate_binary_op(left, *operator, right),
            Expression::UnaryOp { operator, expr } => self.evaluate_unary_op(*operator, expr),
            Expression::FunctionCall { name, args } => self.evaluate_function_call(name, args),
            Expression::IfElse {
                condition,
                then_branch,
                else_branch,
            } => self.evaluate_if_else(condition, then_branch, else_branch),
            Expression::LetBinding { name, value, body } => {
                self.evaluate_let_binding(name, value, body)
            }
        }
    }

    /// Evaluates a variable reference.
    fn evaluate_variable(&self, name: &str) -> TransformResult<Value> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| TransformError::Evaluation(format!("Variable not found: {}", name)))
    }

    /// Evaluates binary operations. `&&` and `||` short-circuit.
    fn evaluate_binary_op(
        &mut self,
        left: &Expression,
        operator: Operator,
        right: &Expression,
    ) -> TransformResult<Value> {
        let left_val = self.evaluate(left)?;

        if let Operator::And | Operator::Or = operator {
            return self.evaluate_logical(&left_val, operator, right);
        }

        let right_val = self.evaluate(right)?;

        match operator {
            Operator::Add => add(&left_val, &right_val),
            Operator::Subtract
            | Operator::Multiply
            | Operator::Divide
            | Operator::Modulo
            | Operator::Power => arithmetic(operator, &left_val, &right_val),
            Operator::Equal => Ok(Value::Boolean(equal(&left_val, &right_val))),
            Operator::NotEqual => Ok(Value::Boolean(!equal(&left_val, &right_val))),
            _ => compare(operator, &left_val, &right_val),
        }
    }

    fn evaluate_logical(
        &mut self,
        left_val: &Value,
        operator: Operator,
        right: &Expression,
    ) -> TransformResult<Value> {
        let left_bool = expect_boolean(left_val, operator)?;
        let decided = match operator {
            Operator::And => !left_bool,
            _ => left_bool,
        };
        if decided {
            return Ok(Value::Boolean(left_bool));
        }
        let right_val = self.evaluate(right)?;
        Ok(Value::Boolean(expect_boolean(&right_val, operator)?))
    }

    /// Evaluates unary operations.
    fn evaluate_unary_op(&mut self, operator: UnaryOperator, expr: &Expression) -> TransformResult<Value> {
        let val = self.evaluate(expr)?;

        match (operator, val) {
            (UnaryOperator::Negate, Value::Integer(i)) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| TransformError::Evaluation("Integer overflow".to_string())),
            (UnaryOperator::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (operator, other) => Err(TransformError::Evaluation(format!(
                "Cannot apply {} to a {}",
                operator,
                other.type_name()
            ))),
        }
    }

    /// Evaluates calls to builtin functions.
    fn evaluate_function_call(&mut self, name: &str, args: &[Expression]) -> TransformResult<Value> {
        let function = *self.functions.get(name).ok_or_else(|| {
            TransformError::Evaluation(format!("Function not found: {}", name))
        })?;

        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.evaluate(arg)?);
        }

        function(evaluated_args).map_err(|reason| TransformError::Function {
            name: name.to_string(),
            reason,
        })
    }

    /// Evaluates if-else conditional expressions.
    fn evaluate_if_else(
        &mut self,
        condition: &Expression,
        then_branch: &Expression,
        else_branch: &Expression,
    ) -> TransformResult<Value> {
        match self.evaluate(condition)? {
            Value::Boolean(true) => self.evaluate(then_branch),
            Value::Boolean(false) => self.evaluate(else_branch),
            other => Err(TransformError::Evaluation(format!(
                "Condition must be a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluates a let binding; the binding is visible only inside `body`.
    fn evaluate_let_binding(
        &mut self,
        name: &str,
        value: &Expression,
        body: &Expression,
    ) -> TransformResult<Value> {
        let val = self.evaluate(value)?;
        let shadowed = self.variables.insert(name.to_string(), val);

        let result = self.evaluate(body);

        match shadowed {
            Some(previous) => {
                self.variables.insert(name.to_string(), previous);
            }
            None => {
                self.variables.remove(name);
            }
        }

        result
    }
}

fn expect_boolean(value: &Value, operator: Operator) -> TransformResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        other => Err(TransformError::Evaluation(format!(
            "Cannot apply {} to a {}",
            operator,
            other.type_name()
        ))),
    }
}

fn add(left: &Value, right: &Value) -> TransformResult<Value> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::String(_), _) | (_, Value::String(_)) => Err(TransformError::Evaluation(format!(
            "Cannot add {} and {}",
            left.type_name(),
            right.type_name()
        ))),
        _ => arithmetic(Operator::Add, left, right),
    }
}

/// Integer operands stay exact; a float on either side makes the result a float.
fn arithmetic(operator: Operator, left: &Value, right: &Value) -> TransformResult<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(operator, *a, *b),
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => float_arithmetic(operator, a, b).map(Value::Number),
            _ => Err(TransformError::Evaluation(format!(
                "Cannot apply {} to {} and {}",
                operator,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn integer_arithmetic(operator: Operator, a: i128, b: i128) -> TransformResult<Value> {
    let overflow = || TransformError::Evaluation(format!("Integer overflow in {} {} {}", a, operator, b));
    let result = match operator {
        Operator::Add => a.checked_add(b),
        Operator::Subtract => a.checked_sub(b),
        Operator::Multiply => a.checked_mul(b),
        Operator::Divide => {
            if b == 0 {
                return Err(TransformError::Evaluation("Division by zero".to_string()));
            }
            match a.checked_rem(b) {
                Some(0) => a.checked_div(b),
                Some(_) => return Ok(Value::Number(a as f64 / b as f64)),
                None => None,
            }
        }
        Operator::Modulo => {
            if b == 0 {
                return Err(TransformError::Evaluation("Modulo by zero".to_string()));
            }
            a.checked_rem(b)
        }
        Operator::Power => match u32::try_from(b) {
            Ok(exponent) => a.checked_pow(exponent),
            Err(_) => return float_arithmetic(operator, a as f64, b as f64).map(Value::Number),
        },
        _ => None,
    };
    result.map(Value::Integer).ok_or_else(overflow)
}

fn float_arithmetic(operator: Operator, a: f64, b: f64) -> TransformResult<f64> {
    match operator {
        Operator::Add => Ok(a + b),
        Operator::Subtract => Ok(a - b),
        Operator::Multiply => Ok(a * b),
        Operator::Divide if b == 0.0 => Err(TransformError::Evaluation("Division by zero".to_string())),
        Operator::Divide => Ok(a / b),
        Operator::Modulo if b == 0.0 => Err(TransformError::Evaluation("Modulo by zero".to_string())),
        Operator::Modulo => Ok(a % b),
        Operator::Power => Ok(a.powf(b)),
        _ => Err(TransformError::Evaluation(format!("{} is not arithmetic", operator))),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Integer(_), Value::Number(_)) | (Value::Number(_), Value::Integer(_)) => {
            as_float(left) == as_float(right)
        }
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn compare(operator: Operator, left: &Value, right: &Value) -> TransformResult<Value> {
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
    .ok_or_else(|| {
        TransformError::Evaluation(format!(
            "Cannot compare {} and {}",
            left.type_name(),
            right.type_name()
        ))
    })?;

    let result = match operator {
        Operator::LessThan => ordering.is_lt(),
        Operator::LessThanOrEqual => ordering.is_le(),
        Operator::GreaterThan => ordering.is_gt(),
        Operator::GreaterThanOrEqual => ordering.is_ge(),
        _ => {
            return Err(TransformError::Evaluation(format!(
                "{} is not a comparison",
                operator
            )))
        }
    };
    Ok(Value::Boolean(result))
}
