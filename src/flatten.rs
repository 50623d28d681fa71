//! Flattening of nested documents into dotted key paths.
//!
//! `{"b": {"c": 1}, "e": [6, 7]}` becomes `{"b.c": 1, "e.0": 6, "e.1": 7}`.
//! Empty objects and arrays produce no keys.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A document flattened to `path -> scalar`, ordered by key.
pub type FlatRecord = BTreeMap<String, JsonValue>;

/// Turns a nested document into a [`FlatRecord`].
pub trait Flattener: Send + Sync {
    fn flatten(&self, document: &JsonValue) -> FlatRecord;
}

/// Default flattener: object keys joined with `.`, array elements keyed by
/// their index. Anything but an object at the root flattens to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentFlattener;

impl DocumentFlattener {
    pub fn new() -> Self {
        Self
    }

    fn flatten_into(&self, path: &mut Vec<String>, value: &JsonValue, out: &mut FlatRecord) {
        match value {
            JsonValue::Object(map) => {
                for (key, inner) in map {
                    path.push(key.clone());
                    self.flatten_into(path, inner, out);
                    path.pop();
                }
            }
            JsonValue::Array(items) => {
                for (index, inner) in items.iter().enumerate() {
                    path.push(index.to_string());
                    self.flatten_into(path, inner, out);
                    path.pop();
                }
            }
            scalar => {
                out.insert(path.join("."), scalar.clone());
            }
        }
    }
}

impl Flattener for DocumentFlattener {
    fn flatten(&self, document: &JsonValue) -> FlatRecord {
        let mut out = FlatRecord::new();
        if document.is_object() {
            self.flatten_into(&mut Vec::new(), document, &mut out);
        }
        out
    }
}

/// Follows a dotted path through nested objects.
pub fn lookup_path<'a>(document: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}
