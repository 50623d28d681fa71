use relmap::transform::{TransformRegistry, ValueTransformer};
use relmap::{
    is_id_autogenerated, is_mapped, mapped_field, primary_key, scalar_array_fields, table_columns,
    validate, ColumnDef, DocumentTransformer, FlatRecord, MappingConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn doubling_registry() -> Arc<TransformRegistry> {
    let registry = TransformRegistry::new();
    registry.register_default("double", |v| {
        v.as_f64()
            .map(|n| json!(n as i64 * 2))
            .ok_or_else(|| format!("cannot double {}", v))
    });
    Arc::new(registry)
}

fn transformer() -> DocumentTransformer {
    DocumentTransformer::new(ValueTransformer::new(doubling_registry()))
}

fn scenario_config() -> MappingConfig {
    MappingConfig::from_value(json!({
        "db": {
            "coll": {
                "pk": "a_col",
                "a": {"type": "INT", "dest": "a_col"},
                "b.c.d": {"type": "INT", "dest": "bcd_col", "transform": "@double"}
            }
        }
    }))
    .unwrap()
}

fn record(value: Value) -> FlatRecord {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_flatten_rename_and_reference_transform() {
    let config = scenario_config();
    validate(&config).unwrap();

    let result = transformer().transform(
        &config,
        &json!({"a": 2, "b": {"c": {"d": 5}}, "e": [6, 7, 8]}),
        "db.coll",
    );
    assert_eq!(result, record(json!({"a_col": 2, "bcd_col": 10})));
}

#[test]
fn test_output_keys_are_mapped_names_of_present_fields() {
    let config = scenario_config();
    let result = transformer().transform(&config, &json!({"a": 1, "z": 3}), "db.coll");
    assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a_col"]);
}

#[test]
fn test_unmapped_namespace_yields_empty_record() {
    let config = scenario_config();
    let doc = json!({"a": 2});
    let transformer = transformer();
    assert!(transformer.transform(&config, &doc, "db.other").is_empty());
    assert!(transformer.transform(&config, &doc, "nodb.coll").is_empty());
    assert!(transformer.transform(&config, &doc, "nodot").is_empty());
}

#[test]
fn test_unknown_reference_leaves_value_unchanged() {
    let config = MappingConfig::from_value(json!({
        "db": {"coll": {
            "pk": "id",
            "_id": {"type": "INT", "dest": "id"},
            "n": {"type": "INT", "dest": "n", "transform": "@nowhere.missing"}
        }}
    }))
    .unwrap();

    let result = transformer().transform(&config, &json!({"_id": 1, "n": 7}), "db.coll");
    assert_eq!(result, record(json!({"id": 1, "n": 7})));
}

#[test]
fn test_expression_transforms() {
    let config = MappingConfig::from_value(json!({
        "db": {"coll": {
            "pk": "id",
            "_id": {"type": "INT", "dest": "id"},
            "n": {"type": "INT", "dest": "n", "transform": "val * 2"},
            "name": {"type": "TEXT", "dest": "name", "transform": "if len(val) > 3 then upper(val) else val"},
            "path": {"type": "TEXT", "dest": "path", "transform": "open(\"/etc/passwd\")"}
        }}
    }))
    .unwrap();
    validate(&config).unwrap();

    let result = transformer().transform(
        &config,
        &json!({"_id": 1, "n": 21, "name": "grace", "path": "/tmp"}),
        "db.coll",
    );
    assert_eq!(result.get("n"), Some(&json!(42)));
    assert_eq!(result.get("name"), Some(&json!("GRACE")));
    // no such capability: the value passes through untouched
    assert_eq!(result.get("path"), Some(&json!("/tmp")));
}

#[test]
fn test_transform_is_idempotent() {
    let config = scenario_config();
    let transformer = transformer();
    let doc = json!({"a": 2, "b": {"c": {"d": 5}}});

    let first = transformer.transform(&config, &doc, "db.coll");
    let second = transformer.transform(&config, &doc, "db.coll");
    assert_eq!(first, second);
}

#[test]
fn test_child_records_for_nested_arrays() {
    let config = MappingConfig::from_value(json!({
        "shop": {
            "orders": {
                "pk": "_id",
                "_id": {"type": "TEXT"},
                "items": {"type": "_ARRAY", "dest": "order_items", "fk": "order_id"}
            },
            "order_items": {
                "pk": "sku",
                "order_id": {"type": "TEXT"},
                "sku": {"type": "TEXT", "dest": "sku"},
                "qty": {"type": "INT", "dest": "quantity", "transform": "@double"},
                "codes": {"type": "_ARRAY_OF_SCALARS", "dest": "item_codes", "fk": "sku", "valueField": "code"}
            },
            "item_codes": {
                "pk": "id",
                "sku": {"type": "TEXT"},
                "code": {"type": "TEXT", "dest": "code"}
            }
        }
    }))
    .unwrap();
    validate(&config).unwrap();

    let doc = json!({
        "_id": "o1",
        "items": [
            {"sku": "A", "qty": 1, "codes": ["x", "y"]},
            {"sku": "B", "qty": 3}
        ]
    });
    let groups = transformer().child_records(&config, &doc, "shop.orders").unwrap();

    let namespaces: Vec<&str> = groups.iter().map(|g| g.namespace.as_str()).collect();
    assert_eq!(namespaces, vec!["shop.order_items", "shop.item_codes"]);
    assert_eq!(
        groups[0].records,
        vec![
            record(json!({"order_id": "o1", "sku": "A", "quantity": 2})),
            record(json!({"order_id": "o1", "sku": "B", "quantity": 6})),
        ]
    );
    assert_eq!(
        groups[1].records,
        vec![
            record(json!({"sku": "A", "code": "x"})),
            record(json!({"sku": "A", "code": "y"})),
        ]
    );
}

#[test]
fn test_lookup_api() {
    let config = MappingConfig::from_value(json!({
        "blog": {
            "posts": {
                "pk": "id",
                "_id": {"type": "INT", "dest": "id"},
                "title": {"type": "TEXT"},
                "tags": {"type": "_ARRAY_OF_SCALARS", "dest": "tags", "fk": "post_id", "valueField": "tag"}
            },
            "tags": {
                "pk": "id",
                "post_id": {"type": "INT"},
                "tag": {"type": "TEXT", "dest": "tag"}
            }
        }
    }))
    .unwrap();
    validate(&config).unwrap();

    assert!(is_mapped(&config, "blog.posts", None));
    assert!(is_mapped(&config, "blog.posts", Some("title")));
    assert!(!is_mapped(&config, "blog.posts", Some("body")));
    assert!(!is_mapped(&config, "blog.users", None));

    assert_eq!(primary_key(&config, "blog.posts"), Ok("id"));
    assert_eq!(mapped_field(&config, "blog.posts", "_id"), Ok("id"));
    assert_eq!(mapped_field(&config, "blog.posts", "title"), Ok("title"));
    assert!(mapped_field(&config, "blog.posts", "body").is_err());

    assert_eq!(is_id_autogenerated(&config, "blog.posts"), Ok(false));
    assert_eq!(is_id_autogenerated(&config, "blog.tags"), Ok(true));
    assert_eq!(scalar_array_fields(&config, "blog.posts"), Ok(vec!["tags"]));

    assert_eq!(
        table_columns(&config, "blog.tags").unwrap(),
        vec![
            ColumnDef {
                name: "id".to_string(),
                sql_type: "SERIAL".to_string(),
                primary_key: true,
            },
            ColumnDef {
                name: "tag".to_string(),
                sql_type: "TEXT".to_string(),
                primary_key: false,
            },
        ]
    );
}
