//! Shared fixtures for builder store tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use trellis_builder::{BuilderStore, NewEntity};
use trellis_core::{
    AttributeContext, AttributeValidator, BuilderDefinition, ChildrenRule, EntityKind, IdStrategy,
    ValidateResult,
};

/// Sequential ids, accepting any non-empty string
#[derive(Debug, Default)]
pub struct SeqIds(AtomicU64);

impl IdStrategy for SeqIds {
    fn generate(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::Relaxed))
    }

    fn validate(&self, id: &str) -> Result<(), String> {
        if id.is_empty() {
            Err("id must not be empty".to_string())
        } else {
            Ok(())
        }
    }
}

/// Base validator for the `label` attribute: non-empty string required
pub struct RequireLabel;

#[async_trait]
impl AttributeValidator for RequireLabel {
    async fn validate(&self, value: Option<Value>, _ctx: &AttributeContext<'_>) -> ValidateResult {
        match value {
            Some(Value::String(label)) if !label.is_empty() => Ok(Value::String(label)),
            _ => Err(json!("label is required")),
        }
    }
}

/// Registry with `section` (any children), `text_field` (label attribute)
/// and `option` (parent required)
pub fn form_definition() -> Arc<BuilderDefinition> {
    Arc::new(
        BuilderDefinition::builder()
            .ids(SeqIds::default())
            .kind(EntityKind::new("section").with_children(ChildrenRule::Any))
            .kind(EntityKind::new("text_field").with_attribute("label", RequireLabel))
            .kind(EntityKind::new("option").with_parent_required())
            .build()
            .expect("registry is valid"),
    )
}

/// Store seeded with a section and one labeled text field under it
///
/// Returns the store plus the (section, field) ids.
pub fn seeded_store() -> (BuilderStore, String, String) {
    let store = BuilderStore::new(form_definition(), None).unwrap();
    let section_id = store.add_entity(NewEntity::new("section")).unwrap();
    let field_id = store
        .add_entity(NewEntity {
            kind: "text_field".to_string(),
            attributes: [("label".to_string(), json!("First name"))].into(),
            parent_id: Some(section_id.clone()),
            index: None,
        })
        .unwrap();
    (store, section_id, field_id)
}
