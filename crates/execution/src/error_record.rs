use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single node failure recorded on the run's `errors` list.
///
/// Mirrors the dict shape `write_error` puts on `state["errors"]` in the
/// original engine: enough to report which node failed, with what, and
/// (when available) the structured error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub node_id: String,
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorRecord {
    pub fn new(node_id: impl Into<String>, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            error_type: error_type.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
