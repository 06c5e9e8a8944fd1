use thiserror::Error;

/// Errors raised while constructing a builder definition
///
/// A definition is validated up front so that stores can trust the registry
/// unconditionally at runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// Two entity kinds share a name
    #[error("Duplicate entity kind: {kind}")]
    DuplicateKind { kind: String },

    /// An entity kind declares the same attribute twice
    #[error("Duplicate attribute {attribute} on entity kind {kind}")]
    DuplicateAttribute { kind: String, attribute: String },

    /// An extension targets an entity kind that is not registered
    #[error("Extension references unknown entity kind: {kind}")]
    UnknownExtensionKind { kind: String },

    /// An extension targets an attribute the entity kind does not declare
    #[error("Extension references unknown attribute {attribute} on entity kind {kind}")]
    UnknownExtensionAttribute { kind: String, attribute: String },

    /// A children-allowed rule names an entity kind that is not registered
    #[error("Children rule of entity kind {kind} references unknown kind: {referenced}")]
    UnknownChildKind { kind: String, referenced: String },

    /// A parents-allowed rule names an entity kind that is not registered
    #[error("Parents rule of entity kind {kind} references unknown kind: {referenced}")]
    UnknownParentKind { kind: String, referenced: String },
}
