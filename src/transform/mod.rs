//! # Value transforms
//!
//! A field mapping may carry a `transform` that rewrites its value before it
//! lands in the destination record. Two forms are supported:
//!
//! * `@module.function` or `@function` names a function registered in a
//!   [`TransformRegistry`].
//! * Anything else is an expression over the input `val`, written in a small
//!   language of arithmetic, comparisons, `if`/`let` and builtin calls.
//!
//! ## Components
//!
//! * `ast` - expression tree and runtime values
//! * `parser` - PEST parser for the expression language
//! * `interpreter` - evaluator and builtin function table
//! * `registry` - named reference functions
//! * `executor` - applies a field's transform to a value, with caching
//!
//! Expressions cannot reach the filesystem, the network or the process
//! environment: the only callable names are the builtins.

pub mod ast;
pub mod executor;
pub mod interpreter;
pub mod parser;
pub mod registry;

pub use ast::{Expression, Operator, UnaryOperator, Value};
pub use executor::{ValueTransformer, INPUT_VARIABLE};
pub use interpreter::Interpreter;
pub use parser::TransformParser;
pub use registry::{parse_reference, ReferenceFunction, TransformRegistry, DEFAULT_TRANSFORM_MODULE};
