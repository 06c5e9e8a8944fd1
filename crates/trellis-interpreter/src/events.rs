use serde::Serialize;
use serde_json::Value;

use crate::data::InterpreterStoreData;

/// Semantic change notifications emitted by the interpreter store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", content = "payload")]
pub enum InterpreterStoreEvent {
    /// An entity's runtime value changed; `None` means unset
    #[serde(rename_all = "camelCase")]
    EntityValueUpdated {
        entity_id: String,
        value: Option<Value>,
    },

    /// An entity's recorded error changed; `None` clears stale state
    #[serde(rename_all = "camelCase")]
    EntityErrorUpdated {
        entity_id: String,
        error: Option<Value>,
    },

    /// The entire store data was replaced
    #[serde(rename_all = "camelCase")]
    DataSet { data: InterpreterStoreData },
}
