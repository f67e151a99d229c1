use nebula_core::NodeId;
use serde_json::{json, Value};

use crate::ErrorRecord;

/// The accumulated state of a single workflow run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    pub input: Value,
    pub data: indexmap::IndexMap<String, Value>,
    pub last_node: Option<String>,
    pub output: Option<Value>,
    pub errors: Vec<ErrorRecord>,
}

/// What a single node execution contributes to the run. Any field left at
/// its default contributes nothing when merged via [`ExecutionState::apply`].
#[derive(Debug, Clone, Default)]
pub struct PartialStateUpdate {
    pub data: indexmap::IndexMap<String, Value>,
    pub last_node: Option<String>,
    pub output: Option<Value>,
    pub errors: Vec<ErrorRecord>,
}

impl PartialStateUpdate {
    pub fn node_output(node_id: impl Into<String>, output: Value) -> Self {
        let node_id = node_id.into();
        let mut data = indexmap::IndexMap::with_capacity(1);
        data.insert(node_id.clone(), output);
        Self {
            data,
            last_node: Some(node_id),
            output: None,
            errors: Vec::new(),
        }
    }

    pub fn node_error(error: ErrorRecord) -> Self {
        Self {
            data: indexmap::IndexMap::new(),
            last_node: Some(error.node_id.clone()),
            output: None,
            errors: vec![error],
        }
    }

    pub fn workflow_output(output: Value) -> Self {
        Self {
            data: indexmap::IndexMap::new(),
            last_node: None,
            output: Some(output),
            errors: Vec::new(),
        }
    }
}

impl ExecutionState {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            data: indexmap::IndexMap::new(),
            last_node: None,
            output: None,
            errors: Vec::new(),
        }
    }

    /// Merges a node's [`PartialStateUpdate`] into this state, following the
    /// reducer semantics each field is annotated with upstream: `data` is a
    /// dict union (right wins on key conflicts), `errors` concatenate in
    /// order, and `last_node` / `output` are last-writer-wins.
    pub fn apply(&mut self, update: PartialStateUpdate) {
        for (k, v) in update.data {
            self.data.insert(k, v);
        }
        if let Some(last_node) = update.last_node {
            self.last_node = Some(last_node);
        }
        if let Some(output) = update.output {
            self.output = Some(output);
        }
        self.errors.extend(update.errors);
    }

    pub fn node_output(&self, node_id: &str) -> Option<&Value> {
        self.data.get(node_id)
    }

    pub fn node_output_for(&self, node_id: &NodeId) -> Option<&Value> {
        self.node_output(node_id.as_str())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Produces the plain-JSON snapshot `{input, data, last_node, output,
    /// errors}` that `nebula-expression`'s mapping and condition evaluators
    /// operate on.
    pub fn as_value(&self) -> Value {
        json!({
            "input": self.input,
            "data": Value::Object(self.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            "last_node": self.last_node,
            "output": self.output,
            "errors": self.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_updates_union_with_right_precedence() {
        let mut state = ExecutionState::new(json!({}));
        state.apply(PartialStateUpdate::node_output("a", json!({"x": 1})));
        state.apply(PartialStateUpdate::node_output("b", json!({"y": 2})));
        assert_eq!(state.node_output("a"), Some(&json!({"x": 1})));
        assert_eq!(state.node_output("b"), Some(&json!({"y": 2})));
    }

    #[test]
    fn last_node_is_last_writer_wins() {
        let mut state = ExecutionState::new(json!({}));
        state.apply(PartialStateUpdate::node_output("a", json!(1)));
        state.apply(PartialStateUpdate::node_output("b", json!(2)));
        assert_eq!(state.last_node.as_deref(), Some("b"));
    }

    #[test]
    fn errors_concatenate_in_completion_order() {
        let mut state = ExecutionState::new(json!({}));
        state.apply(PartialStateUpdate::node_error(ErrorRecord::new("a", "router_error", "boom")));
        state.apply(PartialStateUpdate::node_error(ErrorRecord::new("b", "http_request_error", "bang")));
        assert_eq!(state.errors.len(), 2);
        assert_eq!(state.errors[0].node_id, "a");
        assert_eq!(state.errors[1].node_id, "b");
    }

    #[test]
    fn output_is_set_exactly_once_by_last_writer() {
        let mut state = ExecutionState::new(json!({}));
        assert!(state.output.is_none());
        state.apply(PartialStateUpdate::workflow_output(json!({"result": 1})));
        assert_eq!(state.output, Some(json!({"result": 1})));
    }

    #[test]
    fn as_value_snapshot_has_expected_shape() {
        let mut state = ExecutionState::new(json!({"a": 1}));
        state.apply(PartialStateUpdate::node_output("n1", json!({"b": 2})));
        let snapshot = state.as_value();
        assert_eq!(snapshot["input"], json!({"a": 1}));
        assert_eq!(snapshot["data"]["n1"], json!({"b": 2}));
        assert_eq!(snapshot["last_node"], json!("n1"));
    }
}
