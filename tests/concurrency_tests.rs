use relmap::transform::{TransformRegistry, ValueTransformer};
use relmap::{DocumentTransformer, MappingConfig, MappingStore};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn config_with_dest(dest: &str) -> MappingConfig {
    MappingConfig::from_value(json!({
        "db": {"coll": {
            "pk": "id",
            "_id": {"type": "INT", "dest": "id"},
            "n": {"type": "INT", "dest": dest, "transform": "val * 2"}
        }}
    }))
    .unwrap()
}

#[test]
fn test_concurrent_transforms_agree() {
    let store = Arc::new(MappingStore::new(config_with_dest("n")).unwrap());
    let transformer = Arc::new(DocumentTransformer::new(ValueTransformer::new(Arc::new(
        TransformRegistry::new(),
    ))));
    let doc = json!({"_id": 1, "n": 21});
    let expected = transformer.transform(&store.snapshot(), &doc, "db.coll");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let transformer = Arc::clone(&transformer);
            let doc = doc.clone();
            thread::spawn(move || {
                (0..200)
                    .map(|_| transformer.transform(&store.snapshot(), &doc, "db.coll"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for result in handle.join().unwrap() {
            assert_eq!(result, expected);
        }
    }
}

#[test]
fn test_swap_is_atomic_for_readers() {
    let store = Arc::new(MappingStore::new(config_with_dest("old_n")).unwrap());
    let transformer = Arc::new(DocumentTransformer::new(ValueTransformer::default()));
    let doc = json!({"_id": 1, "n": 5});

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let transformer = Arc::clone(&transformer);
            let doc = doc.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let record = transformer.transform(&store.snapshot(), &doc, "db.coll");
                    let keys: Vec<&str> = record.keys().map(String::as_str).collect();
                    assert!(
                        keys == ["id", "old_n"] || keys == ["id", "new_n"],
                        "mixed configuration: {:?}",
                        record
                    );
                }
            })
        })
        .collect();

    for i in 0..50 {
        let dest = if i % 2 == 0 { "new_n" } else { "old_n" };
        store.install(config_with_dest(dest)).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_rejected_install_keeps_previous_configuration() {
    let store = MappingStore::new(config_with_dest("n")).unwrap();
    let before = store.snapshot();

    let broken = MappingConfig::from_value(json!({
        "db": {"coll": {"pk": "id", "n": {"type": "INT"}}}
    }))
    .unwrap();
    assert!(store.install(broken).is_err());
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
}
