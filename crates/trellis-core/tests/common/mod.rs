//! Shared fixtures for integration tests
//!
//! Builds a small form-flavored registry: labeled text fields under
//! sections, plus a sequential id strategy so tests can use readable ids.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use trellis_core::{
    AttributeContext, AttributeValidator, BuilderDefinition, ChildrenRule, EntityKind,
    EntityValueHooks, FnValidator, IdStrategy, ValidateResult, ValueContext,
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
pub fn require_label(value: Option<Value>, _ctx: &AttributeContext<'_>) -> ValidateResult {
    match value {
        Some(Value::String(label)) if !label.is_empty() => Ok(Value::String(label)),
        _ => Err(json!("label is required")),
    }
}

/// Value hooks for text fields: non-empty string required, empty default
pub struct TextValue;

#[async_trait]
impl EntityValueHooks for TextValue {
    async fn validate(&self, value: Option<Value>, _ctx: &ValueContext<'_>) -> ValidateResult {
        match value {
            Some(Value::String(text)) if !text.is_empty() => Ok(Value::String(text)),
            _ => Err(json!("value is required")),
        }
    }

    fn default_value(&self, _ctx: &ValueContext<'_>) -> Option<Value> {
        Some(json!(""))
    }
}

/// Attribute validator that accepts anything
pub struct AnyAttribute;

#[async_trait]
impl AttributeValidator for AnyAttribute {
    async fn validate(&self, value: Option<Value>, _ctx: &AttributeContext<'_>) -> ValidateResult {
        Ok(value.unwrap_or(Value::Null))
    }
}

/// Registry with a `text_field` (label attribute, text value) and a
/// `section` (any children, no value)
pub fn form_definition() -> Arc<BuilderDefinition> {
    Arc::new(
        BuilderDefinition::builder()
            .ids(SeqIds::default())
            .kind(
                EntityKind::new("text_field")
                    .with_attribute("label", FnValidator(require_label))
                    .with_attribute("placeholder", AnyAttribute)
                    .with_value(TextValue),
            )
            .kind(EntityKind::new("section").with_children(ChildrenRule::Any))
            .build()
            .expect("registry is valid"),
    )
}

/// A schema value with one text field under one section
pub fn nested_schema() -> Value {
    json!({
        "entities": {
            "section-1": {
                "type": "section",
                "attributes": {},
                "children": ["field-1"],
            },
            "field-1": {
                "type": "text_field",
                "attributes": { "label": "First name" },
                "parentId": "section-1",
            },
        },
        "root": ["section-1"],
    })
}
