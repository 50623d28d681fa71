//! Parser for the transform expression language.
//!
//! Uses PEST to turn transform text into an [`Expression`] tree. The grammar
//! lives in `transform.pest`.

use super::ast::{Expression, Operator, UnaryOperator, Value};
use crate::error::{TransformError, TransformResult};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

/// Parser for the transform expression language.
#[derive(Parser, Debug, Default, Clone, Copy)]
#[grammar = "transform/transform.pest"]
pub struct TransformParser;

impl TransformParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses the input into an expression AST.
    pub fn parse_expression(&self, input: &str) -> TransformResult<Expression> {
        let mut pairs = Self::parse(Rule::complete_expr, input)
            .map_err(|e| TransformError::Parse(e.to_string()))?;

        let complete = next_pair(&mut pairs, "complete_expr")?;
        let mut inner = complete.into_inner();
        let expr_pair = next_pair(&mut inner, "expression")?;

        self.build_ast(expr_pair)
    }

    /// Builds an AST from a parse tree.
    fn build_ast(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        match pair.as_rule() {
            Rule::expr => {
                let mut inner = pair.into_inner();
                self.build_ast(next_pair(&mut inner, "expr")?)
            }
            Rule::let_expr => self.parse_let_expr(pair),
            Rule::if_expr => self.parse_if_expr(pair),
            Rule::or_expr
            | Rule::and_expr
            | Rule::comp_expr
            | Rule::add_expr
            | Rule::mul_expr => self.parse_left_assoc(pair),
            Rule::pow_expr => self.parse_pow_expr(pair),
            Rule::unary_expr => self.parse_unary_expr(pair),
            Rule::atom => self.parse_atom(pair),
            rule => Err(TransformError::Parse(format!("Unexpected rule: {:?}", rule))),
        }
    }

    /// Parses `let name = value; body`.
    fn parse_let_expr(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut pairs = without_keywords(pair.into_inner());

        let name = next_pair(&mut pairs, "let name")?.as_str().to_string();
        let value = self.build_ast(next_pair(&mut pairs, "let value")?)?;
        let body = self.build_ast(next_pair(&mut pairs, "let body")?)?;

        Ok(Expression::LetBinding {
            name,
            value: Box::new(value),
            body: Box::new(body),
        })
    }

    /// Parses `if condition then a else b`.
    fn parse_if_expr(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut pairs = without_keywords(pair.into_inner());

        let condition = self.build_ast(next_pair(&mut pairs, "if condition")?)?;
        let then_branch = self.build_ast(next_pair(&mut pairs, "then branch")?)?;
        let else_branch = self.build_ast(next_pair(&mut pairs, "else branch")?)?;

        Ok(Expression::IfElse {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// Parses a chain of left-associative binary operations (`a - b - c`).
    fn parse_left_assoc(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut pairs = pair.into_inner();
        let mut expr = self.build_ast(next_pair(&mut pairs, "left operand")?)?;

        while let Some(op_pair) = pairs.next() {
            let operator = parse_operator(&op_pair)?;
            let right = self.build_ast(next_pair(&mut pairs, "right operand")?)?;

            expr = Expression::BinaryOp {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parses a power expression; `^` associates to the right.
    fn parse_pow_expr(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut pairs = pair.into_inner();
        let base = self.build_ast(next_pair(&mut pairs, "base")?)?;

        match pairs.next() {
            Some(op_pair) => {
                let operator = parse_operator(&op_pair)?;
                let exponent = self.build_ast(next_pair(&mut pairs, "exponent")?)?;
                Ok(Expression::BinaryOp {
                    left: Box::new(base),
                    operator,
                    right: Box::new(exponent),
                })
            }
            None => Ok(base),
        }
    }

    /// Parses a unary expression (-, !).
    fn parse_unary_expr(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut unary_ops = Vec::new();
        let mut operand = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::unary_op => unary_ops.push(match inner.as_str() {
                    "-" => UnaryOperator::Negate,
                    "!" => UnaryOperator::Not,
                    op => {
                        return Err(TransformError::Parse(format!("Unknown unary operator: {}", op)))
                    }
                }),
                _ => operand = Some(self.build_ast(inner)?),
            }
        }

        let mut expr = operand
            .ok_or_else(|| TransformError::Parse("Missing operand after unary operator".to_string()))?;

        // innermost operator applies first
        for operator in unary_ops.into_iter().rev() {
            expr = Expression::UnaryOp {
                operator,
                expr: Box::new(expr),
            };
        }

        Ok(expr)
    }

    /// Parses an atom (literal, function call, identifier, or parenthesized expression).
    fn parse_atom(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut pairs = pair.into_inner();
        let inner = next_pair(&mut pairs, "atom")?;

        match inner.as_rule() {
            Rule::number => {
                let text = inner.as_str();
                if let Ok(i) = text.parse::<i128>() {
                    return Ok(Expression::Literal(Value::Integer(i)));
                }
                let n = text
                    .parse::<f64>()
                    .map_err(|e| TransformError::Parse(format!("Invalid number: {}", e)))?;
                Ok(Expression::Literal(Value::Number(n)))
            }
            Rule::string => Ok(Expression::Literal(Value::String(unescape(inner.as_str())))),
            Rule::boolean => Ok(Expression::Literal(Value::Boolean(inner.as_str() == "true"))),
            Rule::null => Ok(Expression::Literal(Value::Null)),
            Rule::function_call => self.parse_function_call(inner),
            Rule::identifier => Ok(Expression::Variable(inner.as_str().to_string())),
            Rule::expr => self.build_ast(inner),
            rule => Err(TransformError::Parse(format!("Unexpected rule in atom: {:?}", rule))),
        }
    }

    /// Parses a function call expression (func(arg1, arg2, ...)).
    fn parse_function_call(&self, pair: Pair<Rule>) -> TransformResult<Expression> {
        let mut pairs = pair.into_inner();
        let name = next_pair(&mut pairs, "function name")?.as_str().to_string();

        let args = pairs
            .map(|arg| self.build_ast(arg))
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Expression::FunctionCall { name, args })
    }
}

fn next_pair<'i>(pairs: &mut impl Iterator<Item = Pair<'i, Rule>>, what: &str) -> TransformResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| TransformError::Parse(format!("Missing {}", what)))
}

fn without_keywords(pairs: Pairs<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pairs.filter(|pair| {
        !matches!(
            pair.as_rule(),
            Rule::kw_let | Rule::kw_if | Rule::kw_then | Rule::kw_else
        )
    })
}

fn parse_operator(pair: &Pair<Rule>) -> TransformResult<Operator> {
    Operator::from_symbol(pair.as_str())
        .ok_or_else(|| TransformError::Parse(format!("Unknown operator: {}", pair.as_str())))
}

/// Strips the quotes of a string literal and resolves backslash escapes.
fn unescape(literal: &str) -> String {
    let body = &literal[1..literal.len() - 1];
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i128) -> Box<Expression> {
        Box::new(Expression::Literal(Value::Integer(i)))
    }

    fn var(name: &str) -> Box<Expression> {
        Box::new(Expression::Variable(name.to_string()))
    }

    #[test]
    fn test_parses_precedence() {
        let parser = TransformParser::new();
        let expr = parser.parse_expression("1 + val * 2").unwrap();
        assert_eq!(
            expr,
            Expression::BinaryOp {
                left: int(1),
                operator: Operator::Add,
                right: Box::new(Expression::BinaryOp {
                    left: var("val"),
                    operator: Operator::Multiply,
                    right: int(2),
                }),
            }
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let parser = TransformParser::new();
        let expr = parser.parse_expression("10 - 4 - 3").unwrap();
        assert_eq!(expr.to_string(), "((10 - 4) - 3)");
    }

    #[test]
    fn test_power_is_right_associative() {
        let parser = TransformParser::new();
        let expr = parser.parse_expression("2 ^ 3 ^ 2").unwrap();
        assert_eq!(expr.to_string(), "(2 ^ (3 ^ 2))");
    }

    #[test]
    fn test_parses_conditionals_and_bindings() {
        let parser = TransformParser::new();
        let expr = parser
            .parse_expression("let limit = 10; if val > limit then \"big\" else 'small'")
            .unwrap();
        assert_eq!(
            expr.to_string(),
            "let limit = 10; if (val > limit) then \"big\" else \"small\""
        );
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        let parser = TransformParser::new();
        assert!(parser.parse_expression("then + 1").is_err());
        assert_eq!(
            parser.parse_expression("iffy").unwrap(),
            Expression::Variable("iffy".to_string())
        );
    }

    #[test]
    fn test_parses_function_calls_and_escapes() {
        let parser = TransformParser::new();
        let expr = parser.parse_expression(r#"concat(val, "\"x\"")"#).unwrap();
        assert_eq!(
            expr,
            Expression::FunctionCall {
                name: "concat".to_string(),
                args: vec![
                    Expression::Variable("val".to_string()),
                    Expression::Literal(Value::String("\"x\"".to_string())),
                ],
            }
        );
    }

    #[test]
    fn test_rejects_invalid_input() {
        let parser = TransformParser::new();
        for input in ["val +", "foo(", "", "val; rm", "import os", "val.__class__"] {
            assert!(parser.parse_expression(input).is_err(), "{input} should not parse");
        }
    }
}
