//! Child rows produced by array fields.
//!
//! An `_ARRAY` field holds sub-documents stored in a linked collection, each
//! carrying the parent's key in the field named by `fk`. An
//! `_ARRAY_OF_SCALARS` field becomes one row per element, holding the
//! parent's key and the element under `valueField`.

use super::transformer::DocumentTransformer;
use crate::error::{MappingError, MappingResult};
use crate::flatten::{lookup_path, FlatRecord, Flattener};
use crate::mapping::{lookup, FieldMapping, FieldType, MappingConfig, Namespace};
use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};

/// Rows destined for one linked collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRecords {
    pub namespace: String,
    pub records: Vec<FlatRecord>,
}

/// Array fields of `namespace` that hold an array in `document`.
pub fn array_fields<'a>(
    config: &'a MappingConfig,
    namespace: &str,
    document: &JsonValue,
) -> MappingResult<Vec<&'a str>> {
    Ok(lookup::collection_mapping(config, namespace)?
        .array_fields()
        .filter(|(name, _)| matches!(lookup_path(document, name), Some(JsonValue::Array(_))))
        .map(|(name, _)| name)
        .collect())
}

impl<F: Flattener> DocumentTransformer<F> {
    /// Builds the linked-collection rows for every array field present in
    /// `document`, descending into sub-documents that have array fields of
    /// their own.
    ///
    /// Groups come out in field order, each followed by the groups its own
    /// elements produce.
    pub fn child_records(
        &self,
        config: &MappingConfig,
        document: &JsonValue,
        namespace: &str,
    ) -> MappingResult<Vec<ChildRecords>> {
        let mut groups = Vec::new();
        self.collect_children(config, document, namespace, &mut groups)?;
        Ok(groups)
    }

    fn collect_children(
        &self,
        config: &MappingConfig,
        document: &JsonValue,
        namespace: &str,
        groups: &mut Vec<ChildRecords>,
    ) -> MappingResult<()> {
        let ns = Namespace::parse(namespace)?;
        let mapping = lookup::collection_mapping(config, namespace)?;
        let fields = array_fields(config, namespace, document)?;
        if fields.is_empty() {
            return Ok(());
        }

        let parent_key = self.parent_key(config, document, namespace, &mapping.pk)?;

        for name in fields {
            let Some(field) = mapping.field(name) else {
                continue;
            };
            let Some(JsonValue::Array(items)) = lookup_path(document, name) else {
                continue;
            };
            let (Some(dest), Some(fk)) = (field.dest.as_deref(), field.fk.as_deref()) else {
                warn!("Array field {} of {} has no dest or fk", name, namespace);
                continue;
            };
            let child_namespace = Namespace::new(ns.database.clone(), dest).to_string();
            debug!(
                "Building {} child rows of {} for {}",
                items.len(),
                namespace,
                child_namespace
            );

            let mut records = Vec::with_capacity(items.len());
            let mut nested = Vec::new();
            for item in items {
                let Some(child) = child_document(field, name, fk, &parent_key, item) else {
                    continue;
                };
                records.push(self.transform(config, &child, &child_namespace));
                if field.field_type == FieldType::Array {
                    self.collect_children(config, &child, &child_namespace, &mut nested)?;
                }
            }

            groups.push(ChildRecords {
                namespace: child_namespace,
                records,
            });
            groups.extend(nested);
        }
        Ok(())
    }

    /// Value the parent stores under its primary key: the transformed record
    /// when a field supplies it, the raw document otherwise.
    fn parent_key(
        &self,
        config: &MappingConfig,
        document: &JsonValue,
        namespace: &str,
        pk: &str,
    ) -> MappingResult<JsonValue> {
        self.transform(config, document, namespace)
            .remove(pk)
            .or_else(|| lookup_path(document, pk).cloned())
            .filter(|value| !value.is_null())
            .ok_or_else(|| MappingError::PrimaryKeyValueMissing {
                namespace: namespace.to_string(),
                pk: pk.to_string(),
            })
    }
}

fn child_document(
    field: &FieldMapping,
    name: &str,
    fk: &str,
    parent_key: &JsonValue,
    item: &JsonValue,
) -> Option<JsonValue> {
    match (&field.field_type, item) {
        (FieldType::Array, JsonValue::Object(object)) => {
            let mut child = object.clone();
            child.insert(fk.to_string(), parent_key.clone());
            Some(JsonValue::Object(child))
        }
        (FieldType::Array, other) => {
            warn!("Skipping non-document element {} of array field {}", other, name);
            None
        }
        (_, scalar) => {
            let value_field = field.value_field.as_deref()?;
            let mut child = Map::new();
            child.insert(fk.to_string(), parent_key.clone());
            child.insert(value_field.to_string(), scalar.clone());
            Some(JsonValue::Object(child))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{CollectionMapping, DatabaseMapping};
    use serde_json::json;

    fn config() -> MappingConfig {
        MappingConfig::new().with_database(
            "blog",
            DatabaseMapping::new()
                .with_collection(
                    "posts",
                    CollectionMapping::new("id")
                        .with_field("_id", FieldMapping::column("TEXT").with_dest("id"))
                        .with_field("title", FieldMapping::column("TEXT"))
                        .with_field("comments", FieldMapping::array("comments", "post_id"))
                        .with_field(
                            "tags",
                            FieldMapping::array_of_scalars("post_tags", "post_id", "tag"),
                        ),
                )
                .with_collection(
                    "comments",
                    CollectionMapping::new("id")
                        .with_field("post_id", FieldMapping::column("TEXT"))
                        .with_field(
                            "body",
                            FieldMapping::column("TEXT")
                                .with_dest("text")
                                .with_transform("trim(val)"),
                        ),
                )
                .with_collection(
                    "post_tags",
                    CollectionMapping::new("id")
                        .with_field("post_id", FieldMapping::column("TEXT"))
                        .with_field("tag", FieldMapping::column("TEXT")),
                ),
        )
    }

    fn transformer() -> DocumentTransformer {
        DocumentTransformer::default()
    }

    fn record(pairs: &[(&str, JsonValue)]) -> FlatRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_lists_array_fields_present_in_the_document() {
        let config = config();
        let doc = json!({"_id": "p1", "tags": ["a"], "comments": "not an array"});
        assert_eq!(array_fields(&config, "blog.posts", &doc).unwrap(), vec!["tags"]);
        assert!(array_fields(&config, "blog.missing", &doc).is_err());
    }

    #[test]
    fn test_child_rows_carry_the_parent_key() {
        let doc = json!({
            "_id": "p1",
            "title": "Hello",
            "comments": [{"body": " first "}, 3, {"body": "second"}],
            "tags": ["rust", "sql"]
        });
        let groups = transformer()
            .child_records(&config(), &doc, "blog.posts")
            .unwrap();

        assert_eq!(
            groups,
            vec![
                ChildRecords {
                    namespace: "blog.comments".to_string(),
                    records: vec![
                        record(&[("post_id", json!("p1")), ("text", json!("first"))]),
                        record(&[("post_id", json!("p1")), ("text", json!("second"))]),
                    ],
                },
                ChildRecords {
                    namespace: "blog.post_tags".to_string(),
                    records: vec![
                        record(&[("post_id", json!("p1")), ("tag", json!("rust"))]),
                        record(&[("post_id", json!("p1")), ("tag", json!("sql"))]),
                    ],
                },
            ]
        );
    }

    #[test]
    fn test_missing_parent_key_is_an_error() {
        let doc = json!({"title": "No id", "tags": ["x"]});
        assert_eq!(
            transformer().child_records(&config(), &doc, "blog.posts"),
            Err(MappingError::PrimaryKeyValueMissing {
                namespace: "blog.posts".to_string(),
                pk: "id".to_string(),
            })
        );
    }

    #[test]
    fn test_documents_without_arrays_have_no_children() {
        let doc = json!({"_id": "p1", "title": "Plain"});
        assert!(transformer()
            .child_records(&config(), &doc, "blog.posts")
            .unwrap()
            .is_empty());
    }
}
