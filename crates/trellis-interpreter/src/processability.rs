//! Processability derivation
//!
//! An entity's value only participates in validation and collection while
//! its kind's `should_be_processed` predicate holds, given the current value
//! map. The property is hereditary: once an ancestor is unprocessable the
//! whole subtree is, and the predicates below it are not consulted at all.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use trellis_core::{BuilderDefinition, Schema, ValueContext};

/// Derive the set of currently unprocessable entity ids
///
/// Walks top-down from the root set; a subtree is cut off as soon as its
/// top entity's predicate fails.
pub(crate) fn compute_unprocessable(
    definition: &BuilderDefinition,
    schema: &Schema,
    values: &BTreeMap<String, Value>,
) -> BTreeSet<String> {
    let mut unprocessable = BTreeSet::new();
    for root_id in &schema.root {
        visit(definition, schema, values, root_id, &mut unprocessable);
    }
    unprocessable
}

fn visit(
    definition: &BuilderDefinition,
    schema: &Schema,
    values: &BTreeMap<String, Value>,
    entity_id: &str,
    unprocessable: &mut BTreeSet<String>,
) {
    let Some(entity) = schema.entity(entity_id) else {
        return;
    };
    let Some(kind) = definition.kind(&entity.kind) else {
        return;
    };

    let ctx = ValueContext {
        schema,
        entity_id,
        entity,
        values,
    };
    if !kind.hooks().should_be_processed(&ctx) {
        mark_subtree(schema, entity_id, unprocessable);
        return;
    }

    for child_id in entity.child_ids() {
        visit(definition, schema, values, child_id, unprocessable);
    }
}

/// Mark an entity and all its descendants unprocessable
fn mark_subtree(schema: &Schema, entity_id: &str, unprocessable: &mut BTreeSet<String>) {
    let mut stack = vec![entity_id.to_string()];
    while let Some(current) = stack.pop() {
        if let Some(entity) = schema.entity(&current) {
            for child_id in entity.child_ids() {
                stack.push(child_id.clone());
            }
        }
        unprocessable.insert(current);
    }
}
