mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{form_definition, seeded_store};
use serde_json::json;
use trellis_builder::{BuilderStore, BuilderStoreError, BuilderStoreEvent, NewEntity};

fn capture_events(store: &BuilderStore) -> Rc<RefCell<Vec<BuilderStoreEvent>>> {
    let captured = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&captured);
    store.subscribe(move |_, events| sink.borrow_mut().extend(events.to_vec()));
    captured
}

// ===== ADD ENTITY =====

#[test]
fn test_add_entity_appends_to_root() {
    let store = BuilderStore::new(form_definition(), None).unwrap();

    let first = store.add_entity(NewEntity::new("section")).unwrap();
    let second = store.add_entity(NewEntity::new("section")).unwrap();

    assert_eq!(store.get_schema().root, vec![first, second]);
}

#[test]
fn test_add_entity_at_index() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let first = store.add_entity(NewEntity::new("section")).unwrap();
    let second = store.add_entity(NewEntity::new("section")).unwrap();

    let inserted = store
        .add_entity(NewEntity {
            kind: "section".to_string(),
            index: Some(1),
            ..NewEntity::default()
        })
        .unwrap();

    assert_eq!(store.get_schema().root, vec![first, inserted, second]);
}

#[test]
fn test_add_entity_into_parent_emits_batch() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let section_id = store.add_entity(NewEntity::new("section")).unwrap();
    let captured = capture_events(&store);

    let field_id = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            parent_id: Some(section_id.clone()),
            ..NewEntity::default()
        })
        .unwrap();

    let events = captured.borrow();
    assert_eq!(events.len(), 3);
    assert!(
        matches!(&events[0], BuilderStoreEvent::EntityAdded { entity_id, .. } if *entity_id == field_id)
    );
    assert!(
        matches!(&events[1], BuilderStoreEvent::EntityUpdated { entity_id, entity } if *entity_id == section_id && entity.child_ids() == [field_id.clone()])
    );
    assert!(matches!(&events[2], BuilderStoreEvent::SchemaUpdated { .. }));
}

#[test]
fn test_add_entity_unknown_type_rejected() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let result = store.add_entity(NewEntity::new("mystery"));
    assert!(matches!(
        result,
        Err(BuilderStoreError::UnknownEntityType { .. })
    ));
}

#[test]
fn test_add_entity_unknown_attribute_rejected_before_mutation() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let before = store.get_data();

    let result = store.add_entity(NewEntity {
        kind: "text_field".to_string(),
        attributes: [("color".to_string(), json!("red"))].into(),
        ..NewEntity::default()
    });

    assert!(matches!(
        result,
        Err(BuilderStoreError::UnknownEntityAttribute { .. })
    ));
    assert_eq!(store.get_data(), before);
}

#[test]
fn test_add_parent_required_entity_without_parent_rejected() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let before = store.get_data();

    let result = store.add_entity(NewEntity::new("option"));

    assert!(matches!(
        result,
        Err(BuilderStoreError::ParentRequired { .. })
    ));
    assert_eq!(store.get_data(), before);
}

#[test]
fn test_add_entity_under_childless_kind_rejected() {
    let (store, _, field_id) = seeded_store();

    let result = store.add_entity(NewEntity {
        kind: "text_field".to_string(),
        parent_id: Some(field_id),
        ..NewEntity::default()
    });

    assert!(matches!(
        result,
        Err(BuilderStoreError::ChildNotAllowed { .. })
    ));
}

// ===== SET / UNSET PARENT =====

#[test]
fn test_set_entity_parent_moves_from_root() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let section_id = store.add_entity(NewEntity::new("section")).unwrap();
    let field_id = store.add_entity(NewEntity::new("text_field")).unwrap();
    let captured = capture_events(&store);

    store.set_entity_parent(&field_id, &section_id, None).unwrap();

    let schema = store.get_schema();
    assert_eq!(schema.root, vec![section_id.clone()]);
    assert_eq!(
        schema.entity(&field_id).unwrap().parent_id.as_deref(),
        Some(section_id.as_str())
    );

    let events = captured.borrow();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], BuilderStoreEvent::RootUpdated { root } if *root == vec![section_id.clone()]));
    assert!(
        matches!(&events[1], BuilderStoreEvent::EntityUpdated { entity_id, .. } if *entity_id == section_id)
    );
    assert!(matches!(&events[2], BuilderStoreEvent::SchemaUpdated { .. }));
}

#[test]
fn test_set_entity_parent_between_parents_preserves_index() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let first_section = store.add_entity(NewEntity::new("section")).unwrap();
    let second_section = store.add_entity(NewEntity::new("section")).unwrap();
    let a = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            parent_id: Some(second_section.clone()),
            ..NewEntity::default()
        })
        .unwrap();
    let b = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            parent_id: Some(second_section.clone()),
            ..NewEntity::default()
        })
        .unwrap();

    let moved = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            parent_id: Some(first_section.clone()),
            ..NewEntity::default()
        })
        .unwrap();

    store.set_entity_parent(&moved, &second_section, Some(1)).unwrap();

    let schema = store.get_schema();
    assert_eq!(
        schema.entity(&second_section).unwrap().child_ids(),
        &[a, moved.clone(), b][..]
    );
    assert!(schema.entity(&first_section).unwrap().child_ids().is_empty());
}

#[test]
fn test_cycle_rejected_and_state_preserved() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let outer = store.add_entity(NewEntity::new("section")).unwrap();
    let extra = store.add_entity(NewEntity::new("section")).unwrap();
    let inner = store
        .add_entity(NewEntity {
            kind: "section".to_string(),
            parent_id: Some(outer.clone()),
            ..NewEntity::default()
        })
        .unwrap();
    let leaf = store
        .add_entity(NewEntity {
            kind: "section".to_string(),
            parent_id: Some(inner.clone()),
            ..NewEntity::default()
        })
        .unwrap();
    let _ = extra;
    let before = store.get_data();

    // `leaf` is a descendant of `outer`; moving `outer` under it must fail.
    let result = store.set_entity_parent(&outer, &leaf, None);

    assert!(matches!(
        result,
        Err(BuilderStoreError::CycleDetected { .. })
    ));
    assert_eq!(store.get_data(), before);
}

#[test]
fn test_self_parent_rejected() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let first = store.add_entity(NewEntity::new("section")).unwrap();
    let _second = store.add_entity(NewEntity::new("section")).unwrap();

    let result = store.set_entity_parent(&first, &first, None);
    assert!(matches!(
        result,
        Err(BuilderStoreError::CycleDetected { .. })
    ));
}

#[test]
fn test_sole_root_member_cannot_leave_root() {
    let (store, section_id, field_id) = seeded_store();
    let _ = field_id;

    // `section_id` is the only root member.
    let result = store.set_entity_parent(&section_id, &section_id, None);
    assert!(matches!(
        result,
        Err(BuilderStoreError::LastRootEntity { .. })
    ));
}

#[test]
fn test_unset_entity_parent_moves_to_root() {
    let (store, section_id, field_id) = seeded_store();
    let captured = capture_events(&store);

    store.unset_entity_parent(&field_id, Some(0)).unwrap();

    let schema = store.get_schema();
    assert_eq!(schema.root, vec![field_id.clone(), section_id.clone()]);
    assert!(schema.entity(&field_id).unwrap().is_root());
    assert!(schema.entity(&section_id).unwrap().child_ids().is_empty());

    let events = captured.borrow();
    assert_eq!(events.len(), 3);
    assert!(
        matches!(&events[0], BuilderStoreEvent::EntityUpdated { entity_id, .. } if *entity_id == section_id)
    );
    assert!(matches!(&events[1], BuilderStoreEvent::RootUpdated { .. }));
    assert!(matches!(&events[2], BuilderStoreEvent::SchemaUpdated { .. }));
}

// ===== SET INDEX =====

#[test]
fn test_set_entity_index_reorders_root() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let a = store.add_entity(NewEntity::new("section")).unwrap();
    let b = store.add_entity(NewEntity::new("section")).unwrap();
    let c = store.add_entity(NewEntity::new("section")).unwrap();

    store.set_entity_index(&c, 0).unwrap();

    assert_eq!(store.get_schema().root, vec![c, a, b]);
}

#[test]
fn test_set_entity_index_reorders_children() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let section = store.add_entity(NewEntity::new("section")).unwrap();
    let a = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            parent_id: Some(section.clone()),
            ..NewEntity::default()
        })
        .unwrap();
    let b = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            parent_id: Some(section.clone()),
            ..NewEntity::default()
        })
        .unwrap();

    store.set_entity_index(&b, 0).unwrap();

    assert_eq!(
        store.get_schema().entity(&section).unwrap().child_ids(),
        &[b, a][..]
    );
}

// ===== SET ATTRIBUTE =====

#[test]
fn test_set_entity_attribute_updates_and_emits() {
    let (store, _, field_id) = seeded_store();
    let captured = capture_events(&store);

    store
        .set_entity_attribute(&field_id, "label", json!("Surname"))
        .unwrap();

    assert_eq!(
        store.get_entity(&field_id).unwrap().attributes["label"],
        json!("Surname")
    );
    let events = captured.borrow();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        BuilderStoreEvent::EntityAttributeUpdated { entity_id, attribute, value }
            if *entity_id == field_id && attribute == "label" && *value == json!("Surname")
    ));
    assert!(matches!(&events[1], BuilderStoreEvent::SchemaUpdated { .. }));
}

#[test]
fn test_set_unknown_attribute_rejected() {
    let (store, _, field_id) = seeded_store();
    let result = store.set_entity_attribute(&field_id, "color", json!("red"));
    assert!(matches!(
        result,
        Err(BuilderStoreError::UnknownEntityAttribute { .. })
    ));
}

#[test]
fn test_unknown_entity_rejected() {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let result = store.set_entity_attribute("ghost", "label", json!("x"));
    assert!(matches!(
        result,
        Err(BuilderStoreError::EntityNotFound { .. })
    ));
}
