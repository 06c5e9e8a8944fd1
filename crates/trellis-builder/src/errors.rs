use thiserror::Error;
use trellis_core::SchemaIntegrityError;

/// Result type alias using BuilderStoreError
pub type Result<T> = std::result::Result<T, BuilderStoreError>;

/// Contract errors raised by builder store operations
///
/// These signal invalid API usage and are returned before any state change
/// occurs; the store's published data is never left half-mutated. Domain
/// validation outcomes (attribute rejections, custom schema errors) are not
/// represented here - they travel through the tagged results of the
/// validation methods.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuilderStoreError {
    /// Entity not found in the schema
    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// Entity type is not registered in the builder definition
    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    /// Attribute is not declared by the entity type
    #[error("Unknown attribute {attribute} for entity type {entity_type}")]
    UnknownEntityAttribute {
        entity_type: String,
        attribute: String,
    },

    /// The id strategy produced or was handed an invalid id
    #[error("Invalid entity id {entity_id}: {reason}")]
    InvalidEntityId { entity_id: String, reason: String },

    /// A generated id collides with an existing entity
    #[error("Entity id collision: {entity_id}")]
    EntityIdCollision { entity_id: String },

    /// The entity type requires a parent
    #[error("Entity type {entity_type} requires a parent")]
    ParentRequired { entity_type: String },

    /// The parent/child type pairing is not allowed by the definition
    #[error("Entity type {child_type} is not allowed under entity type {parent_type}")]
    ChildNotAllowed {
        parent_type: String,
        child_type: String,
    },

    /// Reparenting would create a cycle
    #[error("Cycle detected: entity {entity_id} cannot be moved under its own descendant")]
    CycleDetected { entity_id: String },

    /// Moving the sole root entity out of the root is not allowed
    #[error("Cannot remove the last root entity: {entity_id}")]
    LastRootEntity { entity_id: String },

    /// Externally supplied data failed the schema integrity check
    #[error("Schema integrity check failed: {0}")]
    Integrity(#[from] SchemaIntegrityError),
}
