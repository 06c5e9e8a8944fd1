use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Entity, Schema};
use crate::registry::BuilderDefinition;

/// Structural integrity failure
///
/// The closed set of reasons a schema can be rejected before any attribute
/// validation runs. Each variant maps to a stable code (see [`code`]) and
/// serializes as `{code, payload}` so callers can render field-level
/// diagnostics.
///
/// [`code`]: SchemaIntegrityError::code
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", content = "payload")]
pub enum SchemaIntegrityError {
    /// `entities` is missing or not a keyed object
    #[error("entities must be a keyed object")]
    InvalidEntitiesFormat,

    /// `root` is missing or not an array
    #[error("root must be an array of entity ids")]
    InvalidRootFormat,

    /// `root` is empty while `entities` is not; every entity must be reachable
    #[error("root must not be empty when entities exist")]
    EmptyRoot,

    /// An entity id does not satisfy the definition's id format
    #[error("invalid entity id: {entity_id}")]
    #[serde(rename_all = "camelCase")]
    InvalidEntityId { entity_id: String },

    /// A parent reference does not satisfy the definition's id format
    #[error("entity {entity_id} has an invalid parent id: {parent_id}")]
    #[serde(rename_all = "camelCase")]
    InvalidEntityParentId { entity_id: String, parent_id: String },

    /// The entity has no usable `type` field
    #[error("entity {entity_id} is missing its type")]
    #[serde(rename_all = "camelCase")]
    MissingEntityType { entity_id: String },

    /// The entity's type is not registered
    #[error("entity {entity_id} has unknown type: {entity_type}")]
    #[serde(rename_all = "camelCase")]
    UnknownEntityType {
        entity_id: String,
        entity_type: String,
    },

    /// The entity has no `attributes` field
    #[error("entity {entity_id} is missing its attributes")]
    #[serde(rename_all = "camelCase")]
    MissingEntityAttributes { entity_id: String },

    /// The entity's `attributes` field is not a keyed object
    #[error("entity {entity_id} attributes must be a keyed object")]
    #[serde(rename_all = "camelCase")]
    InvalidEntityAttributesFormat { entity_id: String },

    /// An attribute key is not declared by the entity's type
    #[error("entity {entity_id} has unknown attribute: {attribute}")]
    #[serde(rename_all = "camelCase")]
    UnknownEntityAttribute { entity_id: String, attribute: String },

    /// The entity's parent id does not exist in the entity map
    #[error("entity {entity_id} references nonexistent parent: {parent_id}")]
    #[serde(rename_all = "camelCase")]
    NonexistentEntityParent { entity_id: String, parent_id: String },

    /// The entity references itself as parent or child
    #[error("entity {entity_id} references itself")]
    #[serde(rename_all = "camelCase")]
    SelfEntityReference { entity_id: String },

    /// The entity's `children` field is not an array
    #[error("entity {entity_id} children must be an array of entity ids")]
    #[serde(rename_all = "camelCase")]
    InvalidChildrenFormat { entity_id: String },

    /// The entity carries a `children` field but its type allows none
    #[error("entity {entity_id} is of a type that does not accept children")]
    #[serde(rename_all = "camelCase")]
    ChildrenNotAllowed { entity_id: String },

    /// A child id does not satisfy the definition's id format
    #[error("entity {entity_id} has an invalid child id: {child_id}")]
    #[serde(rename_all = "camelCase")]
    InvalidChildId { entity_id: String, child_id: String },

    /// A referenced entity id (child or root) does not exist in the entity map
    #[error("nonexistent entity id: {entity_id}")]
    #[serde(rename_all = "camelCase")]
    NonexistentEntityId { entity_id: String },

    /// A child id appears more than once in the same children list
    #[error("entity {entity_id} lists duplicate child: {child_id}")]
    #[serde(rename_all = "camelCase")]
    DuplicateChildId { entity_id: String, child_id: String },

    /// The child's type is not allowed under the entity's type
    #[error("entity {entity_id} does not allow child {child_id}")]
    #[serde(rename_all = "camelCase")]
    ChildNotAllowed { entity_id: String, child_id: String },

    /// A listed child does not name this entity as its parent
    #[error("child {child_id} of entity {entity_id} does not reference it as parent")]
    #[serde(rename_all = "camelCase")]
    EntityChildrenMismatch { entity_id: String, child_id: String },

    /// The entity's parent does not list it among its children
    #[error("parent {parent_id} of entity {entity_id} does not list it as child")]
    #[serde(rename_all = "camelCase")]
    EntityParentMismatch { entity_id: String, parent_id: String },

    /// The entity's type requires a parent but none is set
    #[error("entity {entity_id} is of a type that requires a parent")]
    #[serde(rename_all = "camelCase")]
    ParentRequired { entity_id: String },

    /// The entity's type does not accept its parent's type
    #[error("entity {entity_id} does not allow parent {parent_id}")]
    #[serde(rename_all = "camelCase")]
    ParentNotAllowed { entity_id: String, parent_id: String },

    /// A parentless entity is missing from the root list
    #[error("parentless entity {entity_id} is not listed in root")]
    #[serde(rename_all = "camelCase")]
    EntityNotInRoot { entity_id: String },

    /// A root id appears more than once
    #[error("duplicate root id: {entity_id}")]
    #[serde(rename_all = "camelCase")]
    DuplicateRootId { entity_id: String },

    /// A root-listed entity has a parent
    #[error("root entity {entity_id} must not have a parent")]
    #[serde(rename_all = "camelCase")]
    RootEntityWithParent { entity_id: String },
}

impl SchemaIntegrityError {
    /// Get the stable error code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEntitiesFormat => "InvalidEntitiesFormat",
            Self::InvalidRootFormat => "InvalidRootFormat",
            Self::EmptyRoot => "EmptyRoot",
            Self::InvalidEntityId { .. } => "InvalidEntityId",
            Self::InvalidEntityParentId { .. } => "InvalidEntityParentId",
            Self::MissingEntityType { .. } => "MissingEntityType",
            Self::UnknownEntityType { .. } => "UnknownEntityType",
            Self::MissingEntityAttributes { .. } => "MissingEntityAttributes",
            Self::InvalidEntityAttributesFormat { .. } => "InvalidEntityAttributesFormat",
            Self::UnknownEntityAttribute { .. } => "UnknownEntityAttribute",
            Self::NonexistentEntityParent { .. } => "NonexistentEntityParent",
            Self::SelfEntityReference { .. } => "SelfEntityReference",
            Self::InvalidChildrenFormat { .. } => "InvalidChildrenFormat",
            Self::ChildrenNotAllowed { .. } => "ChildrenNotAllowed",
            Self::InvalidChildId { .. } => "InvalidChildId",
            Self::NonexistentEntityId { .. } => "NonexistentEntityId",
            Self::DuplicateChildId { .. } => "DuplicateChildId",
            Self::ChildNotAllowed { .. } => "ChildNotAllowed",
            Self::EntityChildrenMismatch { .. } => "EntityChildrenMismatch",
            Self::EntityParentMismatch { .. } => "EntityParentMismatch",
            Self::ParentRequired { .. } => "ParentRequired",
            Self::ParentNotAllowed { .. } => "ParentNotAllowed",
            Self::EntityNotInRoot { .. } => "EntityNotInRoot",
            Self::DuplicateRootId { .. } => "DuplicateRootId",
            Self::RootEntityWithParent { .. } => "RootEntityWithParent",
        }
    }
}

fn field_present(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

/// Check the structural integrity of a raw schema
///
/// `None` or JSON `null` input yields an empty schema. Otherwise the checks
/// run in a fixed order and the first failure wins:
///
/// 1. `entities` is a keyed object, `root` an array
/// 2. a non-empty entity map requires a non-empty root
/// 3. every entity, in map order: id and parent-id format, registered type,
///    attribute membership, parent existence, no self-reference, children
///    shape/membership/uniqueness/compatibility, bidirectional parent/child
///    consistency, parent-required and allowed-parent rules, root reachability
/// 4. every root id: format, existence, uniqueness, parentlessness
///
/// On success the normalized schema is returned with any extraneous JSON
/// members dropped.
pub fn check_schema_integrity(
    input: Option<&Value>,
    definition: &BuilderDefinition,
) -> Result<Schema, SchemaIntegrityError> {
    let raw = match input {
        None | Some(Value::Null) => return Ok(Schema::new()),
        Some(value) => value,
    };

    let entities = raw
        .get("entities")
        .and_then(Value::as_object)
        .ok_or(SchemaIntegrityError::InvalidEntitiesFormat)?;
    let root = raw
        .get("root")
        .and_then(Value::as_array)
        .ok_or(SchemaIntegrityError::InvalidRootFormat)?;

    if root.is_empty() && !entities.is_empty() {
        return Err(SchemaIntegrityError::EmptyRoot);
    }

    for (id, entity_raw) in entities {
        check_entity(id, entity_raw, entities, root, definition)?;
    }

    let mut seen = BTreeSet::new();
    let mut root_ids = Vec::with_capacity(root.len());
    for raw_id in root {
        let id = raw_id
            .as_str()
            .ok_or_else(|| SchemaIntegrityError::InvalidEntityId {
                entity_id: raw_id.to_string(),
            })?;
        definition
            .ids()
            .validate(id)
            .map_err(|_| SchemaIntegrityError::InvalidEntityId {
                entity_id: id.to_string(),
            })?;
        let entity = entities
            .get(id)
            .ok_or_else(|| SchemaIntegrityError::NonexistentEntityId {
                entity_id: id.to_string(),
            })?;
        if !seen.insert(id.to_string()) {
            return Err(SchemaIntegrityError::DuplicateRootId {
                entity_id: id.to_string(),
            });
        }
        if field_present(entity.get("parentId")) {
            return Err(SchemaIntegrityError::RootEntityWithParent {
                entity_id: id.to_string(),
            });
        }
        root_ids.push(id.to_string());
    }

    let mut schema = Schema::new();
    for (id, entity_raw) in entities {
        schema.entities.insert(id.clone(), build_entity(entity_raw));
    }
    schema.root = root_ids;
    tracing::trace!(entities = schema.entities.len(), "schema integrity check passed");
    Ok(schema)
}

/// Re-check an already-typed schema
///
/// Used by the stores for defensive validation of externally supplied data.
pub fn ensure_schema_integrity(
    schema: &Schema,
    definition: &BuilderDefinition,
) -> Result<Schema, SchemaIntegrityError> {
    // A typed schema always serializes; the fallback is unreachable.
    let raw = serde_json::to_value(schema)
        .map_err(|_| SchemaIntegrityError::InvalidEntitiesFormat)?;
    check_schema_integrity(Some(&raw), definition)
}

fn check_entity(
    id: &str,
    raw: &Value,
    entities: &Map<String, Value>,
    root: &[Value],
    definition: &BuilderDefinition,
) -> Result<(), SchemaIntegrityError> {
    definition
        .ids()
        .validate(id)
        .map_err(|_| SchemaIntegrityError::InvalidEntityId {
            entity_id: id.to_string(),
        })?;

    let parent_id = match raw.get("parentId") {
        None | Some(Value::Null) => None,
        Some(Value::String(parent)) => {
            definition.ids().validate(parent).map_err(|_| {
                SchemaIntegrityError::InvalidEntityParentId {
                    entity_id: id.to_string(),
                    parent_id: parent.clone(),
                }
            })?;
            Some(parent.as_str())
        }
        Some(other) => {
            return Err(SchemaIntegrityError::InvalidEntityParentId {
                entity_id: id.to_string(),
                parent_id: other.to_string(),
            })
        }
    };

    let kind_name = match raw.get("type") {
        Some(Value::String(name)) if !name.is_empty() => name.as_str(),
        _ => {
            return Err(SchemaIntegrityError::MissingEntityType {
                entity_id: id.to_string(),
            })
        }
    };
    let kind =
        definition
            .kind(kind_name)
            .ok_or_else(|| SchemaIntegrityError::UnknownEntityType {
                entity_id: id.to_string(),
                entity_type: kind_name.to_string(),
            })?;

    let attributes = match raw.get("attributes") {
        None => {
            return Err(SchemaIntegrityError::MissingEntityAttributes {
                entity_id: id.to_string(),
            })
        }
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(SchemaIntegrityError::InvalidEntityAttributesFormat {
                entity_id: id.to_string(),
            })
        }
    };
    for attribute in attributes.keys() {
        if kind.attribute(attribute).is_none() {
            return Err(SchemaIntegrityError::UnknownEntityAttribute {
                entity_id: id.to_string(),
                attribute: attribute.clone(),
            });
        }
    }

    if let Some(parent) = parent_id {
        if parent == id {
            return Err(SchemaIntegrityError::SelfEntityReference {
                entity_id: id.to_string(),
            });
        }
        if !entities.contains_key(parent) {
            return Err(SchemaIntegrityError::NonexistentEntityParent {
                entity_id: id.to_string(),
                parent_id: parent.to_string(),
            });
        }
    }

    if field_present(raw.get("children")) {
        let children = raw
            .get("children")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaIntegrityError::InvalidChildrenFormat {
                entity_id: id.to_string(),
            })?;
        if !kind.allows_children() {
            return Err(SchemaIntegrityError::ChildrenNotAllowed {
                entity_id: id.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for raw_child in children {
            let child_id =
                raw_child
                    .as_str()
                    .ok_or_else(|| SchemaIntegrityError::InvalidChildId {
                        entity_id: id.to_string(),
                        child_id: raw_child.to_string(),
                    })?;
            if child_id == id {
                return Err(SchemaIntegrityError::SelfEntityReference {
                    entity_id: id.to_string(),
                });
            }
            definition.ids().validate(child_id).map_err(|_| {
                SchemaIntegrityError::InvalidChildId {
                    entity_id: id.to_string(),
                    child_id: child_id.to_string(),
                }
            })?;
            let child = entities.get(child_id).ok_or_else(|| {
                SchemaIntegrityError::NonexistentEntityId {
                    entity_id: child_id.to_string(),
                }
            })?;
            if !seen.insert(child_id.to_string()) {
                return Err(SchemaIntegrityError::DuplicateChildId {
                    entity_id: id.to_string(),
                    child_id: child_id.to_string(),
                });
            }
            // The child's own pass reports a missing/unknown type; only the
            // compatibility rule is checked from this side.
            if let Some(child_kind) = child.get("type").and_then(Value::as_str) {
                if !kind.allows_child_kind(child_kind) {
                    return Err(SchemaIntegrityError::ChildNotAllowed {
                        entity_id: id.to_string(),
                        child_id: child_id.to_string(),
                    });
                }
            }
            if child.get("parentId").and_then(Value::as_str) != Some(id) {
                return Err(SchemaIntegrityError::EntityChildrenMismatch {
                    entity_id: id.to_string(),
                    child_id: child_id.to_string(),
                });
            }
        }
    }

    if let Some(parent) = parent_id {
        let listed = entities
            .get(parent)
            .and_then(|p| p.get("children"))
            .and_then(Value::as_array)
            .is_some_and(|children| children.iter().any(|c| c.as_str() == Some(id)));
        if !listed {
            return Err(SchemaIntegrityError::EntityParentMismatch {
                entity_id: id.to_string(),
                parent_id: parent.to_string(),
            });
        }
        if let Some(parent_kind) = entities
            .get(parent)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        {
            if !kind.allows_parent_kind(parent_kind) {
                return Err(SchemaIntegrityError::ParentNotAllowed {
                    entity_id: id.to_string(),
                    parent_id: parent.to_string(),
                });
            }
        }
    } else {
        if kind.parent_required() {
            return Err(SchemaIntegrityError::ParentRequired {
                entity_id: id.to_string(),
            });
        }
        if !root.iter().any(|r| r.as_str() == Some(id)) {
            return Err(SchemaIntegrityError::EntityNotInRoot {
                entity_id: id.to_string(),
            });
        }
    }

    Ok(())
}

fn build_entity(raw: &Value) -> Entity {
    let mut entity = Entity::new(
        raw.get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    );
    if let Some(attributes) = raw.get("attributes").and_then(Value::as_object) {
        entity.attributes = attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
    }
    entity.parent_id = raw
        .get("parentId")
        .and_then(Value::as_str)
        .map(str::to_string);
    entity.children = raw.get("children").and_then(Value::as_array).map(|list| {
        list.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    });
    entity
}
