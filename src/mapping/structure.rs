//! Structural check of a serialized mapping configuration.
//!
//! The declared shape is:
//!
//! ```text
//! { <database>: { <collection>: { "pk": <string>,
//!                                 <field>: { "type": <string>,
//!                                            "dest"?: <string>,
//!                                            "transform"?: <string>,
//!                                            "fk"?: <string>,
//!                                            "valueField"?: <string> } } } }
//! ```
//!
//! Array types additionally require `dest` and `fk`; `_ARRAY_OF_SCALARS`
//! requires `valueField`. Every failure names the offending JSON path.

use super::types::{FieldMapping, FieldType, MappingConfig, ARRAY_OF_SCALARS_TYPE, ARRAY_TYPE};
use crate::error::{MappingError, MappingResult};
use serde_json::{Map, Value as JsonValue};

const FIELD_KEYS: [&str; 5] = ["type", "dest", "transform", "fk", "valueField"];

/// Checks a serialized configuration against the mapping schema.
pub fn check_structure(value: &JsonValue) -> MappingResult<()> {
    let databases = expect_object(value, "$")?;

    for (database, db_value) in databases {
        let db_path = format!("$.{}", database);
        let collections = expect_object(db_value, &db_path)?;

        for (collection, coll_value) in collections {
            let coll_path = format!("{}.{}", db_path, collection);
            check_collection(coll_value, &coll_path)?;
        }
    }

    Ok(())
}

fn check_collection(value: &JsonValue, path: &str) -> MappingResult<()> {
    let entries = expect_object(value, path)?;

    match entries.get("pk") {
        Some(JsonValue::String(pk)) if !pk.is_empty() => {}
        Some(JsonValue::String(_)) => {
            return Err(MappingError::schema(format!("{}.pk", path), "must not be empty"))
        }
        Some(other) => {
            return Err(MappingError::schema(
                format!("{}.pk", path),
                format!("expected a string, found {}", kind_of(other)),
            ))
        }
        None => return Err(MappingError::schema(path, "required property 'pk' is missing")),
    }

    for (field, field_value) in entries.iter().filter(|(key, _)| key.as_str() != "pk") {
        check_field(field_value, &format!("{}.{}", path, field))?;
    }

    Ok(())
}

fn check_field(value: &JsonValue, path: &str) -> MappingResult<()> {
    let entries = expect_object(value, path)?;

    for (key, entry) in entries {
        if !FIELD_KEYS.contains(&key.as_str()) {
            return Err(MappingError::schema(
                path,
                format!("additional property '{}' is not allowed", key),
            ));
        }
        if !entry.is_string() {
            return Err(MappingError::schema(
                format!("{}.{}", path, key),
                format!("expected a string, found {}", kind_of(entry)),
            ));
        }
    }

    let field_type = match entries.get("type").and_then(JsonValue::as_str) {
        Some(field_type) if !field_type.is_empty() => field_type,
        Some(_) => return Err(MappingError::schema(format!("{}.type", path), "must not be empty")),
        None => return Err(MappingError::schema(path, "required property 'type' is missing")),
    };

    let required: &[&str] = match field_type {
        ARRAY_TYPE => &["dest", "fk"],
        ARRAY_OF_SCALARS_TYPE => &["dest", "fk", "valueField"],
        _ => &[],
    };
    for key in required {
        if !entries.contains_key(*key) {
            return Err(MappingError::schema(
                path,
                format!("required property '{}' is missing for type {}", key, field_type),
            ));
        }
    }

    Ok(())
}

/// Re-checks the conditional requirements on an already typed configuration.
///
/// Serde guarantees the basic shape; the requirements that depend on the
/// field type are checked here.
pub fn check_typed_structure(config: &MappingConfig) -> MappingResult<()> {
    for (database, db_mapping) in &config.databases {
        for (collection, mapping) in &db_mapping.collections {
            let path = format!("$.{}.{}", database, collection);
            if mapping.pk.is_empty() {
                return Err(MappingError::schema(format!("{}.pk", path), "must not be empty"));
            }
            for (field, field_mapping) in &mapping.fields {
                if field == "pk" {
                    return Err(MappingError::schema(
                        format!("{}.pk", path),
                        "'pk' is reserved for the primary key name",
                    ));
                }
                check_typed_field(field_mapping, &format!("{}.{}", path, field))?;
            }
        }
    }
    Ok(())
}

fn check_typed_field(mapping: &FieldMapping, path: &str) -> MappingResult<()> {
    if let FieldType::Column(column_type) = &mapping.field_type {
        if column_type.is_empty() {
            return Err(MappingError::schema(format!("{}.type", path), "must not be empty"));
        }
        return Ok(());
    }

    let missing = |key: &str| {
        MappingError::schema(
            path,
            format!("required property '{}' is missing for type {}", key, mapping.field_type),
        )
    };
    if mapping.dest.is_none() {
        return Err(missing("dest"));
    }
    if mapping.fk.is_none() {
        return Err(missing("fk"));
    }
    if mapping.field_type == FieldType::ArrayOfScalars && mapping.value_field.is_none() {
        return Err(missing("valueField"));
    }
    Ok(())
}

fn expect_object<'a>(value: &'a JsonValue, path: &str) -> MappingResult<&'a Map<String, JsonValue>> {
    value.as_object().ok_or_else(|| {
        MappingError::schema(path, format!("expected an object, found {}", kind_of(value)))
    })
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
