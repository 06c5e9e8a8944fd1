use thiserror::Error;
use trellis_core::SchemaIntegrityError;

/// Result type alias using InterpreterStoreError
pub type Result<T> = std::result::Result<T, InterpreterStoreError>;

/// Contract errors raised by interpreter store operations
///
/// Value validation outcomes are not represented here; they travel through
/// the tagged result of `validate_entities` and the store's error map.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpreterStoreError {
    /// Entity not found in the store's schema
    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// Entity type is not registered in the builder definition
    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    /// The entity's type does not carry a runtime value
    #[error("Entity {entity_id} of type {entity_type} does not carry a value")]
    ValueNotAllowed {
        entity_id: String,
        entity_type: String,
    },

    /// The supplied schema failed the integrity check
    #[error("Schema integrity check failed: {0}")]
    Integrity(#[from] SchemaIntegrityError),
}
