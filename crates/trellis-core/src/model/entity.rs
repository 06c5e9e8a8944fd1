use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity - a typed node in the authored tree
///
/// Entities form a tree through `parent_id` references and ordered `children`
/// lists; the two sides are kept mutually consistent by the integrity
/// validator. Attribute values are opaque JSON validated against the entity
/// kind's attribute definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Key into the builder definition's entity kind registry
    #[serde(rename = "type")]
    pub kind: String,

    /// Attribute name to value, keys restricted to the kind's declared attributes
    pub attributes: BTreeMap<String, Value>,

    /// Optional parent entity ID (None for root entities)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Ordered child entity IDs, present only for kinds that allow children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

impl Entity {
    /// Create a new entity of the given kind with no attributes
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
            parent_id: None,
            children: None,
        }
    }

    /// Check if this entity is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The entity's child IDs, empty when the kind carries no children
    pub fn child_ids(&self) -> &[String] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Check if this entity currently has any children
    pub fn has_children(&self) -> bool {
        !self.child_ids().is_empty()
    }
}
