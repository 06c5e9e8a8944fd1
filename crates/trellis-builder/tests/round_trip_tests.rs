mod common;

use common::{form_definition, seeded_store};
use serde_json::json;
use trellis_builder::{BuilderStore, BuilderStoreData, BuilderStoreError};

// ===== ROUND TRIP =====

#[test]
fn test_store_data_round_trips_through_constructor() {
    let (store, _, field_id) = seeded_store();
    store
        .set_entity_attribute_error(&field_id, "label", json!("from the server"))
        .unwrap();
    store.set_schema_error(json!("pending review"));
    let exported = store.get_data();

    let restored = BuilderStore::new(form_definition(), Some(exported.clone())).unwrap();

    assert_eq!(restored.get_data(), exported);
}

#[test]
fn test_store_data_round_trips_through_set_data() {
    let (store, _, _) = seeded_store();
    let exported = store.get_data();

    let fresh = BuilderStore::new(form_definition(), None).unwrap();
    fresh.set_data(exported.clone()).unwrap();

    assert_eq!(fresh.get_data(), exported);
}

#[test]
fn test_store_data_round_trips_through_json() {
    let (store, _, _) = seeded_store();
    let exported = store.get_data();

    let wire = serde_json::to_string(&exported).unwrap();
    let parsed: BuilderStoreData = serde_json::from_str(&wire).unwrap();

    assert_eq!(parsed, exported);
}

// ===== DEFENSIVE CHECKS =====

#[test]
fn test_set_data_rejects_broken_schema() {
    let (store, section_id, field_id) = seeded_store();
    let mut data = store.get_data();
    // Break bidirectional consistency by hand.
    data.schema
        .entities
        .get_mut(&field_id)
        .unwrap()
        .parent_id = None;

    let fresh = BuilderStore::new(form_definition(), None).unwrap();
    let result = fresh.set_data(data);

    assert!(matches!(result, Err(BuilderStoreError::Integrity(_))));
    let _ = section_id;
}

#[test]
fn test_initial_data_with_unknown_error_entity_rejected() {
    let (store, _, _) = seeded_store();
    let mut data = store.get_data();
    data.entities_attributes_errors
        .insert("ghost".to_string(), [("label".to_string(), json!("x"))].into());

    let result = BuilderStore::new(form_definition(), Some(data));
    assert!(matches!(result, Err(BuilderStoreError::EntityNotFound { .. })));
}
