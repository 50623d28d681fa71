//! Mapping configuration model.
//!
//! The tree is `MappingConfig` → `DatabaseMapping` → `CollectionMapping` →
//! `FieldMapping`. It is deserialized once, validated, and then shared
//! read-only (see [`MappingStore`](super::MappingStore)).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Serialized type marker for a one-to-many relationship to a child collection.
pub const ARRAY_TYPE: &str = "_ARRAY";

/// Serialized type marker for a list of scalars stored in a child value table.
pub const ARRAY_OF_SCALARS_TYPE: &str = "_ARRAY_OF_SCALARS";

/// Column type assumed for a primary key that has no field mapping of its own.
pub const DEFAULT_PK_TYPE: &str = "SERIAL";

/// Leading character that marks a reference transform.
pub const REFERENCE_SENTINEL: char = '@';

/// Type of a mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Array of sub-documents stored in a linked collection
    Array,
    /// Array of scalars stored in a linked value collection
    ArrayOfScalars,
    /// Scalar value; the string is the destination column type
    Column(String),
}

impl FieldType {
    /// Whether values of this type are realized as child records.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array | FieldType::ArrayOfScalars)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Array => ARRAY_TYPE,
            FieldType::ArrayOfScalars => ARRAY_OF_SCALARS_TYPE,
            FieldType::Column(column_type) => column_type,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            ARRAY_TYPE => FieldType::Array,
            ARRAY_OF_SCALARS_TYPE => FieldType::ArrayOfScalars,
            _ => FieldType::Column(value),
        }
    }
}

impl From<&str> for FieldType {
    fn from(value: &str) -> Self {
        FieldType::from(value.to_string())
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Column(column_type) => column_type,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two forms a transform string can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind<'a> {
    /// `@module.function` or `@function`, the sentinel stripped
    Reference(&'a str),
    /// An expression over the bound input `val`
    Expression(&'a str),
}

impl<'a> TransformKind<'a> {
    pub fn parse(transform: &'a str) -> Self {
        match transform.strip_prefix(REFERENCE_SENTINEL) {
            Some(path) => TransformKind::Reference(path),
            None => TransformKind::Expression(transform),
        }
    }
}

/// Mapping rules for a single source field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Destination column, or linked collection for array types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,

    /// Field of the linked collection holding the key back to this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk: Option<String>,

    /// Field of the linked collection holding each scalar element
    #[serde(
        rename = "valueField",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub value_field: Option<String>,
}

impl FieldMapping {
    /// Scalar field stored in a column of the given type.
    pub fn column(column_type: impl Into<String>) -> Self {
        Self {
            field_type: FieldType::Column(column_type.into()),
            dest: None,
            transform: None,
            fk: None,
            value_field: None,
        }
    }

    /// Array of sub-documents stored in `dest`, linked back through `fk`.
    pub fn array(dest: impl Into<String>, fk: impl Into<String>) -> Self {
        Self {
            field_type: FieldType::Array,
            dest: Some(dest.into()),
            transform: None,
            fk: Some(fk.into()),
            value_field: None,
        }
    }

    /// Array of scalars stored in `dest` under `value_field`, linked back through `fk`.
    pub fn array_of_scalars(
        dest: impl Into<String>,
        fk: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            field_type: FieldType::ArrayOfScalars,
            dest: Some(dest.into()),
            transform: None,
            fk: Some(fk.into()),
            value_field: Some(value_field.into()),
        }
    }

    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn is_array(&self) -> bool {
        self.field_type.is_array()
    }

    /// Parsed transform, if any.
    pub fn transform_kind(&self) -> Option<TransformKind<'_>> {
        self.transform.as_deref().map(TransformKind::parse)
    }
}

/// Field mappings of one source collection plus its primary key name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMapping {
    pub pk: String,

    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldMapping>,
}

impl CollectionMapping {
    pub fn new(pk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.fields.insert(name.into(), mapping);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.get(name)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The field that supplies the primary key: either the field named `pk`,
    /// or the field whose destination is `pk`.
    pub fn primary_key_field(&self) -> Option<(&str, &FieldMapping)> {
        if let Some((name, mapping)) = self.fields.get_key_value(self.pk.as_str()) {
            return Some((name.as_str(), mapping));
        }
        self.fields
            .iter()
            .find(|(_, mapping)| mapping.dest.as_deref() == Some(self.pk.as_str()))
            .map(|(name, mapping)| (name.as_str(), mapping))
    }

    /// Column type of the primary key, `SERIAL` when no field supplies it.
    pub fn primary_key_type(&self) -> FieldType {
        self.primary_key_field()
            .map(|(_, mapping)| mapping.field_type.clone())
            .unwrap_or_else(|| FieldType::Column(DEFAULT_PK_TYPE.to_string()))
    }

    /// Fields realized as child records.
    pub fn array_fields(&self) -> impl Iterator<Item = (&str, &FieldMapping)> {
        self.fields
            .iter()
            .filter(|(_, mapping)| mapping.is_array())
            .map(|(name, mapping)| (name.as_str(), mapping))
    }

    /// Name a field takes in the output record.
    pub fn output_name<'a>(&'a self, field: &'a str) -> Option<&'a str> {
        self.fields
            .get(field)
            .map(|mapping| mapping.dest.as_deref().unwrap_or(field))
    }
}

/// Collection mappings of one source database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseMapping {
    pub collections: BTreeMap<String, CollectionMapping>,
}

impl DatabaseMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, mapping: CollectionMapping) -> Self {
        self.collections.insert(name.into(), mapping);
        self
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionMapping> {
        self.collections.get(name)
    }

    /// Whether another collection has an array field whose destination is `collection`.
    pub fn is_linked(&self, collection: &str) -> bool {
        self.collections
            .iter()
            .filter(|(name, _)| name.as_str() != collection)
            .any(|(_, mapping)| {
                mapping
                    .array_fields()
                    .any(|(_, field)| field.dest.as_deref() == Some(collection))
            })
    }
}

/// Root of the mapping configuration: database name to database mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingConfig {
    pub databases: BTreeMap<String, DatabaseMapping>,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, name: impl Into<String>, mapping: DatabaseMapping) -> Self {
        self.databases.insert(name.into(), mapping);
        self
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseMapping> {
        self.databases.get(name)
    }

    pub fn collection(&self, database: &str, collection: &str) -> Option<&CollectionMapping> {
        self.database(database)
            .and_then(|db| db.collection(collection))
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
