//! # Mapping configuration
//!
//! The declarative description of how documents of each source collection
//! map onto destination records, together with its validator, the lookup API
//! and the shared store holding the active configuration.

pub mod columns;
pub mod lookup;
pub mod namespace;
pub mod store;
pub mod structure;
pub mod types;
pub mod validation;

pub use columns::{table_columns, ColumnDef};
pub use lookup::{
    collection_mapping, field_mapping, is_id_autogenerated, is_mapped, mapped_field, primary_key,
    scalar_array_fields,
};
pub use namespace::Namespace;
pub use store::MappingStore;
pub use structure::check_structure;
pub use types::{
    CollectionMapping, DatabaseMapping, FieldMapping, FieldType, MappingConfig, TransformKind,
    ARRAY_OF_SCALARS_TYPE, ARRAY_TYPE, DEFAULT_PK_TYPE, REFERENCE_SENTINEL,
};
pub use validation::{validate, validate_all};

use crate::error::MappingResult;
use serde_json::Value as JsonValue;

impl MappingConfig {
    /// Builds a configuration from its serialized form, checking it against
    /// the mapping schema first so failures name the offending path.
    ///
    /// Only the structure is checked; call [`validate`] for referential integrity.
    pub fn from_value(value: JsonValue) -> MappingResult<Self> {
        check_structure(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(json: &str) -> MappingResult<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }
}
