use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::Schema;
use crate::registry::{AttributeContext, BuilderDefinition};

use super::integrity::{check_schema_integrity, SchemaIntegrityError};

/// Attribute rejections keyed by entity id, then attribute name
pub type EntitiesAttributesErrors = BTreeMap<String, BTreeMap<String, Value>>;

/// Failure of full schema validation
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", content = "payload")]
pub enum SchemaError {
    /// The schema failed the structural integrity check
    #[error(transparent)]
    Integrity(#[from] SchemaIntegrityError),

    /// One or more attribute validators rejected their value
    #[error("schema attribute validation failed")]
    Attributes(EntitiesAttributesErrors),

    /// The whole-schema custom validator rejected the schema
    #[error("custom schema validator rejected the schema")]
    Custom(Value),
}

/// Validate a raw schema end to end
///
/// Runs the structural integrity check first; only a structurally valid
/// schema proceeds to attribute validation. Attribute failures are collected
/// across every attribute of every entity before returning, so a UI can show
/// all problems at once. The whole-schema custom validator runs only when
/// every attribute passed.
pub async fn validate_schema(
    input: Option<&Value>,
    definition: &BuilderDefinition,
) -> Result<Schema, SchemaError> {
    let schema = check_schema_integrity(input, definition)?;
    validate_checked_schema(schema, definition).await
}

/// Validate the attributes and custom rules of an integrity-checked schema
pub async fn validate_checked_schema(
    schema: Schema,
    definition: &BuilderDefinition,
) -> Result<Schema, SchemaError> {
    let errors = validate_schema_attributes(&schema, definition).await;
    if !errors.is_empty() {
        tracing::debug!(entities = errors.len(), "schema attribute validation failed");
        return Err(SchemaError::Attributes(errors));
    }

    definition
        .schema_hook()
        .validate(schema)
        .await
        .map_err(SchemaError::Custom)
}

/// Run every entity's every attribute validator, collecting all rejections
///
/// Entities are visited in map order, attributes in declaration order; the
/// result is empty when everything passed. Entities whose kind is absent from
/// the registry are skipped (the integrity check has already excluded that).
pub async fn validate_schema_attributes(
    schema: &Schema,
    definition: &BuilderDefinition,
) -> EntitiesAttributesErrors {
    let mut errors = EntitiesAttributesErrors::new();

    for (entity_id, entity) in &schema.entities {
        let Some(kind) = definition.kind(&entity.kind) else {
            continue;
        };
        for attribute in kind.attributes() {
            let ctx = AttributeContext {
                schema,
                entity_id,
                entity,
            };
            let value = entity.attributes.get(attribute.name()).cloned();
            if let Err(rejection) = definition
                .run_attribute_validator(kind, attribute, value, &ctx)
                .await
            {
                errors
                    .entry(entity_id.clone())
                    .or_default()
                    .insert(attribute.name().to_string(), rejection);
            }
        }
    }

    errors
}
