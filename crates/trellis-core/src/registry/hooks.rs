use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::model::{Entity, Schema};

/// Outcome of a user-supplied validator
///
/// `Ok` carries the accepted value; `Err` carries the opaque rejection
/// payload exactly as produced by the hook. Rejections are never coerced to
/// a library error shape.
pub type ValidateResult = std::result::Result<Value, Value>;

/// Context handed to attribute validators
pub struct AttributeContext<'a> {
    /// The full schema the entity belongs to
    pub schema: &'a Schema,
    /// ID of the entity whose attribute is being validated
    pub entity_id: &'a str,
    /// The entity whose attribute is being validated
    pub entity: &'a Entity,
}

/// Context handed to entity value hooks (validate/default/should-be-processed)
pub struct ValueContext<'a> {
    /// The full schema the entity belongs to
    pub schema: &'a Schema,
    /// ID of the entity whose value is in question
    pub entity_id: &'a str,
    /// The entity whose value is in question
    pub entity: &'a Entity,
    /// Current values of every entity, keyed by entity ID
    pub values: &'a BTreeMap<String, Value>,
}

/// Validator for a single declared attribute
#[async_trait]
pub trait AttributeValidator: Send + Sync {
    /// Validate an attribute value; `None` means the attribute is unset
    async fn validate(&self, value: Option<Value>, ctx: &AttributeContext<'_>) -> ValidateResult;
}

/// Adapter turning a plain function into an [`AttributeValidator`]
pub struct FnValidator<F>(pub F);

#[async_trait]
impl<F> AttributeValidator for FnValidator<F>
where
    F: for<'a> Fn(Option<Value>, &AttributeContext<'a>) -> ValidateResult + Send + Sync,
{
    async fn validate(&self, value: Option<Value>, ctx: &AttributeContext<'_>) -> ValidateResult {
        (self.0)(value, ctx)
    }
}

/// Runtime value behavior of an entity kind
///
/// Implemented by kinds whose instances collect a value during
/// interpretation. `should_be_processed` drives processability: entities for
/// which it returns false (or with an unprocessable ancestor) are excluded
/// from validation and collection without losing their stored value.
#[async_trait]
pub trait EntityValueHooks: Send + Sync {
    /// Validate the entity's runtime value; `None` means unset
    async fn validate(&self, value: Option<Value>, ctx: &ValueContext<'_>) -> ValidateResult;

    /// Initial value populated at interpreter construction, if any
    fn default_value(&self, _ctx: &ValueContext<'_>) -> Option<Value> {
        None
    }

    /// Whether the entity's value currently participates in validation
    fn should_be_processed(&self, _ctx: &ValueContext<'_>) -> bool {
        true
    }
}

/// Value hooks for kinds that carry no runtime value
pub(crate) struct PassthroughValueHooks;

#[async_trait]
impl EntityValueHooks for PassthroughValueHooks {
    async fn validate(&self, value: Option<Value>, _ctx: &ValueContext<'_>) -> ValidateResult {
        Ok(value.unwrap_or(Value::Null))
    }
}

/// Whole-schema custom validator, run once every attribute passes
#[async_trait]
pub trait SchemaHook: Send + Sync {
    /// Accept (possibly normalizing) or reject the schema
    async fn validate(&self, schema: Schema) -> Result<Schema, Value>;
}

/// Default whole-schema validator: identity
pub(crate) struct IdentitySchemaHook;

#[async_trait]
impl SchemaHook for IdentitySchemaHook {
    async fn validate(&self, schema: Schema) -> Result<Schema, Value> {
        Ok(schema)
    }
}
