use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::Entity;

/// Schema - the serializable entity tree
///
/// The tree is stored arena-style: entities keyed by ID in a flat map, with
/// parent/child edges recorded as ID references. `root` is the ordered list
/// of parentless entity IDs. A `BTreeMap` keeps entity iteration
/// deterministic, which validation order relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Map of entity ID to entity
    pub entities: BTreeMap<String, Entity>,

    /// Ordered IDs of the parentless entities
    pub root: Vec<String>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the schema holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an entity by ID
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Check if an entity exists
    pub fn contains_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }
}
