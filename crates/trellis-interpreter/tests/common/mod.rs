//! Shared fixtures for interpreter store tests
//!
//! The registry models a small conditional form: text fields with defaults,
//! a boolean toggle, and a `conditional_field` kind that is only processed
//! while the entity with id `toggle` holds the value `true`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use trellis_core::{
    BuilderDefinition, ChildrenRule, EntityKind, EntityValueHooks, IdStrategy, Schema,
    ValidateResult, ValueContext,
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

/// Text value: non-empty string required, empty-string default
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

/// Boolean toggle value: defaults to false, accepts booleans
pub struct ToggleValue;

#[async_trait]
impl EntityValueHooks for ToggleValue {
    async fn validate(&self, value: Option<Value>, _ctx: &ValueContext<'_>) -> ValidateResult {
        match value {
            Some(Value::Bool(flag)) => Ok(Value::Bool(flag)),
            _ => Err(json!("expected a boolean")),
        }
    }

    fn default_value(&self, _ctx: &ValueContext<'_>) -> Option<Value> {
        Some(json!(false))
    }
}

/// Processed only while the entity with id `toggle` holds `true`
pub struct SwitchedValue;

#[async_trait]
impl EntityValueHooks for SwitchedValue {
    async fn validate(&self, value: Option<Value>, _ctx: &ValueContext<'_>) -> ValidateResult {
        match value {
            Some(Value::String(text)) if !text.is_empty() => Ok(Value::String(text)),
            _ => Err(json!("value is required")),
        }
    }

    fn should_be_processed(&self, ctx: &ValueContext<'_>) -> bool {
        ctx.values.get("toggle") == Some(&json!(true))
    }
}

pub fn form_definition() -> Arc<BuilderDefinition> {
    Arc::new(
        BuilderDefinition::builder()
            .ids(SeqIds::default())
            .kind(EntityKind::new("section").with_children(ChildrenRule::Any))
            .kind(EntityKind::new("text_field").with_value(TextValue))
            .kind(EntityKind::new("toggle_field").with_value(ToggleValue))
            .kind(EntityKind::new("conditional_field").with_value(SwitchedValue))
            .kind(
                EntityKind::new("conditional_section")
                    .with_children(ChildrenRule::Any)
                    .with_value(SwitchedValue),
            )
            .build()
            .expect("registry is valid"),
    )
}

/// Schema with a toggle, a plain field, and a conditional field
pub fn conditional_schema() -> Schema {
    serde_json::from_value(json!({
        "entities": {
            "toggle": { "type": "toggle_field", "attributes": {} },
            "name": { "type": "text_field", "attributes": {} },
            "extra": { "type": "conditional_field", "attributes": {} },
        },
        "root": ["toggle", "name", "extra"],
    }))
    .expect("schema parses")
}

/// Schema where a conditional section owns a child field
pub fn nested_conditional_schema() -> Schema {
    serde_json::from_value(json!({
        "entities": {
            "toggle": { "type": "toggle_field", "attributes": {} },
            "details": {
                "type": "conditional_section",
                "attributes": {},
                "children": ["nickname"],
            },
            "nickname": {
                "type": "text_field",
                "attributes": {},
                "parentId": "details",
            },
        },
        "root": ["toggle", "details"],
    }))
    .expect("schema parses")
}
