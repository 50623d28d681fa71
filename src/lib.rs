//! # relmap
//!
//! Maps schemaless documents onto relational records. A declarative mapping
//! says, per source database and collection, which document fields become
//! columns, what they are renamed to, how their values are transformed and
//! how nested arrays fan out into linked tables.
//!
//! ## Core Components
//!
//! * `mapping` - Mapping configuration model, validator, lookup API and store
//! * `document` - Turns documents into flat destination records and child rows
//! * `flatten` - Nested documents to dotted key paths
//! * `transform` - Value transforms: registered functions and a sandboxed expression language
//! * `config` - Engine settings
//! * `error` - Error types and handling
//! * `logging` - Logger initialization
//!
//! ## Architecture
//!
//! A configuration is checked against the mapping schema, validated for
//! referential integrity and installed in a [`MappingStore`]. Workers take a
//! snapshot of the store and hand it, with each document, to a
//! [`DocumentTransformer`], which flattens the document, keeps and renames
//! the mapped fields and runs each field's transform. Writing the records is
//! left to the caller.

pub mod config;
pub mod document;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod mapping;
pub mod transform;

// Re-export main types for convenience
pub use config::{ConfigError, EngineConfig};
pub use document::{array_fields, ChildRecords, DocumentTransformer};
pub use error::{MappingError, MappingResult, TransformError, TransformResult};
pub use flatten::{DocumentFlattener, FlatRecord, Flattener};
pub use logging::init_logging;
pub use mapping::{
    collection_mapping, field_mapping, is_id_autogenerated, is_mapped, mapped_field, primary_key,
    scalar_array_fields, table_columns, validate, validate_all, ColumnDef, MappingConfig,
    MappingStore, Namespace,
};
pub use transform::{TransformRegistry, ValueTransformer};
