//! Trellis Core - schema model, registry and validation engine
//!
//! This crate provides the foundations shared by the builder and interpreter
//! stores:
//! - Entity and Schema models with a JSON-stable interchange format
//! - The builder definition registry (entity kinds, attributes, structural
//!   rules, id strategy, extension hooks)
//! - Two-phase schema validation: structural integrity, then asynchronous
//!   attribute and whole-schema validation with collect-all aggregation
//! - Subscription and data-cell primitives for the event-sourced stores
//! - Logging initialization

pub mod errors;
pub mod logging;
pub mod model;
pub mod pubsub;
pub mod registry;
pub mod validation;

// Re-export commonly used types
pub use errors::DefinitionError;
pub use model::{Entity, Schema};
pub use pubsub::{DataManager, ListenerId, Subscribers};
pub use registry::{
    AttributeContext, AttributeDef, AttributeExtension, AttributeValidator, BuilderDefinition,
    ChildrenRule, EntityExtension, EntityKind, EntityValueHooks, FnExtension, FnValidator,
    IdStrategy, NextValidate, ParentsRule, SchemaHook, UuidV4Ids, ValidateResult, ValueContext,
};
pub use validation::{
    check_schema_integrity, ensure_schema_integrity, validate_checked_schema, validate_schema,
    validate_schema_attributes, EntitiesAttributesErrors, SchemaError, SchemaIntegrityError,
};
