//! # Error types
//!
//! Two error families cross the crate boundary:
//!
//! * [`MappingError`] is fatal and raised while a mapping configuration is
//!   loaded, validated or queried through the lookup API.
//! * [`TransformError`] is raised while a single value is transformed. It never
//!   leaves [`ValueTransformer::apply`](crate::transform::ValueTransformer::apply),
//!   which logs it and keeps the original value.

use thiserror::Error;

/// Errors raised by the mapping configuration model, its validator and the
/// lookup API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    // ========== Structural Errors ==========
    /// The configuration does not conform to the declared mapping schema
    #[error("Supplied mapping is invalid at {path}: {reason}")]
    Schema { path: String, reason: String },

    /// Two fields of a collection produce the same output name
    #[error("Destination {dest} is produced by both {first} and {second} in {database}.{collection}")]
    DuplicateDestination {
        database: String,
        collection: String,
        dest: String,
        first: String,
        second: String,
    },

    /// A transform string cannot be compiled
    #[error("Invalid transform for {database}.{collection}.{field}: {reason}")]
    InvalidTransform {
        database: String,
        collection: String,
        field: String,
        reason: String,
    },

    // ========== Referential Errors ==========
    /// The primary key is neither mapped nor provided by a linked collection
    #[error("Primary key {pk} mapping not found in {database}.{collection}")]
    PrimaryKeyNotFound {
        database: String,
        collection: String,
        pk: String,
    },

    /// An array field points at a collection that has no mapping
    #[error("Collection {collection} mapping not found in {database}")]
    CollectionNotFound { database: String, collection: String },

    /// An array field names a foreign key the linked collection does not map
    #[error("Foreign key {fk} mapping not found in {database}.{collection}")]
    ForeignKeyNotFound {
        database: String,
        collection: String,
        fk: String,
    },

    /// Foreign key and referenced primary key disagree on their column type
    #[error("Foreign key {database}.{dest}.{fk} type {fk_type} mismatch with primary key {database}.{collection}.{pk} type {pk_type}")]
    ForeignKeyTypeMismatch {
        database: String,
        collection: String,
        pk: String,
        pk_type: String,
        dest: String,
        fk: String,
        fk_type: String,
    },

    /// An array-of-scalars field names a value field the linked collection does not map
    #[error("Value field {database}.{collection}.{value_field} not mapped in {database}.{dest}")]
    ValueFieldNotMapped {
        database: String,
        collection: String,
        value_field: String,
        dest: String,
    },

    // ========== Lookup Errors ==========
    /// A namespace or field has no mapping entry
    #[error("{0} is not mapped")]
    NotMapped(String),

    /// A namespace string is not of the form `database.collection`
    #[error("Invalid namespace '{0}': expected <database>.<collection>")]
    InvalidNamespace(String),

    /// A document lacks the value a child record needs as its foreign key
    #[error("Document in {namespace} has no value for primary key {pk}")]
    PrimaryKeyValueMissing { namespace: String, pk: String },
}

impl MappingError {
    /// Whether this error reports a schema (shape) problem rather than a
    /// broken reference between collections.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. } | Self::DuplicateDestination { .. } | Self::InvalidTransform { .. }
        )
    }

    /// Whether this error reports a broken reference between collections.
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            Self::PrimaryKeyNotFound { .. }
                | Self::CollectionNotFound { .. }
                | Self::ForeignKeyNotFound { .. }
                | Self::ForeignKeyTypeMismatch { .. }
                | Self::ValueFieldNotMapped { .. }
        )
    }

    pub(crate) fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(error: serde_json::Error) -> Self {
        MappingError::schema("$", error.to_string())
    }
}

/// Errors raised while compiling or running a single value transform.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The expression text does not parse
    #[error("Parse error: {0}")]
    Parse(String),

    /// The expression parsed but failed while running
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A builtin function rejected its arguments
    #[error("Function {name} failed: {reason}")]
    Function { name: String, reason: String },

    /// A reference transform names a function nobody registered
    #[error("Unregistered transform {module}.{name}")]
    Unregistered { module: String, name: String },

    /// A reference transform path is malformed
    #[error("Invalid transform reference '{0}'")]
    InvalidReference(String),

    /// A registered transform function returned an error
    #[error("Transform function {reference} failed: {reason}")]
    Reference { reference: String, reason: String },
}

/// Result alias for configuration and lookup operations
pub type MappingResult<T> = Result<T, MappingError>;

/// Result alias for value transform operations
pub type TransformResult<T> = Result<T, TransformError>;
