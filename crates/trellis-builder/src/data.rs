use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::{EntitiesAttributesErrors, Schema};

/// Published state of a builder store
///
/// Attribute errors are caller-attached (through the validation methods or
/// the manual error setters), never recomputed implicitly on mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderStoreData {
    /// The entity tree being authored
    pub schema: Schema,

    /// Recorded attribute rejections, keyed by entity id then attribute name
    #[serde(default)]
    pub entities_attributes_errors: EntitiesAttributesErrors,

    /// Recorded whole-schema error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_error: Option<Value>,
}
