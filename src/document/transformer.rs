//! Flatten, filter, rename and transform a single document.

use crate::flatten::{DocumentFlattener, FlatRecord, Flattener};
use crate::mapping::{CollectionMapping, MappingConfig, Namespace};
use crate::transform::ValueTransformer;
use log::{debug, trace};
use serde_json::Value as JsonValue;

/// Maps raw documents onto destination records.
///
/// Holds no mapping state of its own: every call takes the configuration
/// snapshot to use, so one transformer serves any number of threads and
/// survives configuration swaps.
#[derive(Debug, Default)]
pub struct DocumentTransformer<F: Flattener = DocumentFlattener> {
    flattener: F,
    values: ValueTransformer,
}

impl DocumentTransformer<DocumentFlattener> {
    pub fn new(values: ValueTransformer) -> Self {
        Self::with_flattener(DocumentFlattener, values)
    }
}

impl<F: Flattener> DocumentTransformer<F> {
    pub fn with_flattener(flattener: F, values: ValueTransformer) -> Self {
        Self { flattener, values }
    }

    pub fn values(&self) -> &ValueTransformer {
        &self.values
    }

    pub fn flattener(&self) -> &F {
        &self.flattener
    }

    /// Flattens `document`, keeps the keys the collection maps and renames
    /// them to their destinations. Values are not transformed.
    ///
    /// An unmapped or malformed namespace yields an empty record.
    pub fn map_document(
        &self,
        config: &MappingConfig,
        document: &JsonValue,
        namespace: &str,
    ) -> FlatRecord {
        let Some(mapping) = resolve(config, namespace) else {
            return FlatRecord::new();
        };

        let mut record = FlatRecord::new();
        for (key, value) in self.flattener.flatten(document) {
            // Arrays flatten to indexed keys, so an array field only matches
            // here when the document holds a scalar under it.
            match mapping.field(&key) {
                Some(field) => {
                    let name = field.dest.clone().unwrap_or(key);
                    record.insert(name, value);
                }
                None => trace!("Dropping unmapped key {} of {}", key, namespace),
            }
        }
        record
    }

    /// Applies field transforms to an already mapped record.
    ///
    /// Only non-array fields with a `dest` are transformed, and only when the
    /// destination key is present.
    pub fn transform_document(
        &self,
        config: &MappingConfig,
        mut record: FlatRecord,
        namespace: &str,
    ) -> FlatRecord {
        let Some(mapping) = resolve(config, namespace) else {
            return record;
        };

        for field in mapping.fields.values() {
            if field.is_array() || field.transform.is_none() {
                continue;
            }
            let Some(dest) = field.dest.as_deref() else {
                continue;
            };
            if let Some(value) = record.remove(dest) {
                let transformed = self.values.apply(field, value);
                record.insert(dest.to_string(), transformed);
            }
        }
        record
    }

    /// Maps and transforms `document` for `namespace`.
    pub fn transform(
        &self,
        config: &MappingConfig,
        document: &JsonValue,
        namespace: &str,
    ) -> FlatRecord {
        let record = self.map_document(config, document, namespace);
        self.transform_document(config, record, namespace)
    }
}

fn resolve<'a>(config: &'a MappingConfig, namespace: &str) -> Option<&'a CollectionMapping> {
    let ns = match Namespace::parse(namespace) {
        Ok(ns) => ns,
        Err(err) => {
            debug!("{}", err);
            return None;
        }
    };
    let mapping = config.collection(&ns.database, &ns.collection);
    if mapping.is_none() {
        trace!("No mapping for {}", namespace);
    }
    mapping
}
