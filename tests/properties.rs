//! Property tests for path-addressed reads and writes.

use freshdb::{Store, StoreConfig};
use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn test_store(dir: &TempDir) -> Store {
    Store::open(StoreConfig::new("prop").with_folder(dir.path())).unwrap()
}

/// Key paths of one to four lowercase segments.
fn key_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}", 1..=4).prop_map(|segments| segments.join("."))
}

/// JSON values a few levels deep.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        // Quarters survive a text round trip exactly.
        (-4_000_000i32..4_000_000).prop_map(|n| json!(f64::from(n) / 4.0)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,5}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn set_then_get_returns_value(path in key_path(), value in json_value()) {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.set(&path, value.clone()).unwrap();
        prop_assert_eq!(store.get(&path).unwrap(), Some(value));
    }

    #[test]
    fn del_then_has_is_false(path in key_path(), value in json_value(), other in key_path()) {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.set(&path, value).unwrap();
        prop_assert!(store.del(&path).unwrap());
        prop_assert!(!store.has(&path).unwrap());
        prop_assert!(!store.del(&path).unwrap());

        // Deleting something that was never there is not an error.
        if !store.has(&other).unwrap() {
            prop_assert!(!store.del(&other).unwrap());
        }
    }

    #[test]
    fn get_or_persists_default(path in key_path(), default in json_value()) {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        prop_assert_eq!(store.get_or(&path, default.clone()).unwrap(), default.clone());
        prop_assert_eq!(store.get(&path).unwrap(), Some(default));
    }

    #[test]
    fn sequential_updates_count(n in 1usize..20) {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        for _ in 0..n {
            store
                .update("count", |d| json!(d.and_then(|v| v.as_u64()).unwrap_or(0) + 1))
                .unwrap();
        }
        prop_assert_eq!(store.get("count").unwrap(), Some(json!(n)));
    }

    #[test]
    fn reload_round_trip(entries in prop::collection::vec((key_path(), json_value()), 1..6)) {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        for (path, value) in &entries {
            store.set(path, value.clone()).unwrap();
        }
        let before = store.get_all().unwrap();

        let reopened = test_store(&dir);
        prop_assert_eq!(reopened.get_all().unwrap(), before);
    }

    #[test]
    fn set_leaves_unrelated_keys(value in json_value(), path in key_path()) {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.set("Untouched.Key", "keep").unwrap();
        store.set(&path, value).unwrap();
        prop_assert_eq!(store.get("Untouched.Key").unwrap(), Some(json!("keep")));
    }
}
