//! # Document transformer
//!
//! Turns a raw source document into the flat record written to its
//! destination table, and materializes the rows that array fields produce in
//! linked tables.

pub mod children;
pub mod transformer;

pub use children::{array_fields, ChildRecords};
pub use transformer::DocumentTransformer;
