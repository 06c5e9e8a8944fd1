mod common;

use common::{conditional_schema, form_definition, nested_conditional_schema};
use serde_json::json;
use trellis_interpreter::{InterpreterStore, InterpreterStoreOptions};

fn store_with(schema: trellis_core::Schema) -> InterpreterStore {
    InterpreterStore::new(form_definition(), schema, InterpreterStoreOptions::default()).unwrap()
}

// ===== PREDICATE-DRIVEN PROCESSABILITY =====

#[test]
fn test_conditional_entity_unprocessable_while_toggle_off() {
    let store = store_with(conditional_schema());

    // The toggle defaults to false.
    assert!(!store.is_entity_processable("extra"));
    assert!(store.is_entity_processable("name"));
    assert!(store.is_entity_processable("toggle"));
    assert_eq!(
        store.get_unprocessable_entities_ids(),
        ["extra".to_string()].into()
    );
}

#[test]
fn test_processability_recomputed_on_value_change() {
    let store = store_with(conditional_schema());

    store.set_entity_value("toggle", json!(true)).unwrap();
    assert!(store.is_entity_processable("extra"));

    store.set_entity_value("toggle", json!(false)).unwrap();
    assert!(!store.is_entity_processable("extra"));
}

#[test]
fn test_processability_recomputed_on_clear_and_reset() {
    let store = store_with(conditional_schema());
    store.set_entity_value("toggle", json!(true)).unwrap();
    assert!(store.is_entity_processable("extra"));

    store.clear_entity_value("toggle").unwrap();
    assert!(!store.is_entity_processable("extra"));

    store.set_entity_value("toggle", json!(true)).unwrap();
    store.reset_entity_value("toggle").unwrap();
    assert!(!store.is_entity_processable("extra"));
}

#[test]
fn test_unprocessable_entity_keeps_its_stored_value() {
    let store = store_with(conditional_schema());
    store.set_entity_value("toggle", json!(true)).unwrap();
    store.set_entity_value("extra", json!("kept")).unwrap();

    store.set_entity_value("toggle", json!(false)).unwrap();

    assert!(!store.is_entity_processable("extra"));
    assert_eq!(store.get_entity_value("extra"), Some(json!("kept")));
}

// ===== HEREDITARY PROCESSABILITY =====

#[test]
fn test_descendants_of_unprocessable_entity_are_unprocessable() {
    let store = store_with(nested_conditional_schema());

    // `details` is switched off, so `nickname` is excluded regardless of its
    // own (always-true) predicate.
    assert!(!store.is_entity_processable("details"));
    assert!(!store.is_entity_processable("nickname"));

    store.set_entity_value("toggle", json!(true)).unwrap();
    assert!(store.is_entity_processable("details"));
    assert!(store.is_entity_processable("nickname"));
}

#[test]
fn test_unknown_entity_is_not_processable() {
    let store = store_with(conditional_schema());
    assert!(!store.is_entity_processable("ghost"));
}
