use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published state of an interpreter store
///
/// Scoped to one fixed, integrity-checked schema. Values and errors survive
/// processability changes; only the derived processability tracking reacts
/// to value mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterStoreData {
    /// Current runtime value per entity id
    #[serde(default)]
    pub entities_values: BTreeMap<String, Value>,

    /// Current validation error per entity id, captured verbatim
    #[serde(default)]
    pub entities_errors: BTreeMap<String, Value>,
}
