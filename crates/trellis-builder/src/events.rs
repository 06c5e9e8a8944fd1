use serde::Serialize;
use serde_json::Value;
use trellis_core::{Entity, Schema};

use crate::data::BuilderStoreData;

/// Semantic change notifications emitted by the builder store
///
/// Every mutation commits exactly one ordered batch; listeners receive the
/// batch together with the new state and can rely on it being the minimal
/// description of what changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", content = "payload")]
pub enum BuilderStoreEvent {
    /// A new entity entered the schema
    #[serde(rename_all = "camelCase")]
    EntityAdded { entity_id: String, entity: Entity },

    /// An entity's structural fields changed (children or parent)
    #[serde(rename_all = "camelCase")]
    EntityUpdated { entity_id: String, entity: Entity },

    /// One attribute value changed
    #[serde(rename_all = "camelCase")]
    EntityAttributeUpdated {
        entity_id: String,
        attribute: String,
        value: Value,
    },

    /// An entity left the schema (one event per removed entity)
    #[serde(rename_all = "camelCase")]
    EntityDeleted { entity_id: String, entity: Entity },

    /// An entity was produced by a clone operation
    #[serde(rename_all = "camelCase")]
    EntityCloned {
        source_entity_id: String,
        entity_id: String,
        entity: Entity,
        is_clone_origin: bool,
    },

    /// The ordered root list changed
    #[serde(rename_all = "camelCase")]
    RootUpdated { root: Vec<String> },

    /// An attribute's recorded error changed; `None` clears stale state
    #[serde(rename_all = "camelCase")]
    EntityAttributeErrorUpdated {
        entity_id: String,
        attribute: String,
        error: Option<Value>,
    },

    /// The whole-schema error changed
    #[serde(rename_all = "camelCase")]
    SchemaErrorUpdated { error: Option<Value> },

    /// The schema changed in any way (always last before commit)
    #[serde(rename_all = "camelCase")]
    SchemaUpdated { schema: Schema },

    /// The entire store data was replaced
    #[serde(rename_all = "camelCase")]
    DataSet { data: BuilderStoreData },
}
