use async_trait::async_trait;
use nebula_core::NodeId;
use nebula_execution::PartialStateUpdate;
use nebula_expression::{apply_output_mapping, resolve_inputs};
use nebula_workflow::{IoConfig, NoopNode};
use serde_json::Value;

use crate::{Action, ActionContext};

/// Copies resolved inputs straight through to outputs.
pub struct NoopAction {
    id: NodeId,
    io: IoConfig,
}

impl NoopAction {
    pub fn new(node: &NoopNode) -> Self {
        Self {
            id: node.base.id.clone(),
            io: node.io.clone(),
        }
    }
}

#[async_trait]
impl Action for NoopAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        match resolve_inputs(snapshot, &self.io.input_mapping, true) {
            Ok(inputs) => {
                let inputs_value = Value::Object(inputs.into_iter().collect());
                let outputs = apply_output_mapping(&inputs_value, &self.io.output_mapping);
                ctx.emit(&self.id, "noop", None);
                PartialStateUpdate::node_output(self.id.as_str(), outputs)
            }
            Err(e) => PartialStateUpdate::node_error(nebula_execution::ErrorRecord::new(
                self.id.as_str(),
                "mapping_error",
                e.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(input_mapping: Value, output_mapping: Value) -> NoopNode {
        serde_json::from_value(json!({
            "id": "copy",
            "input_mapping": input_mapping,
            "output_mapping": output_mapping,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn passes_resolved_inputs_through() {
        let n = node(json!({"x": "$input.x"}), json!({}));
        let action = NoopAction::new(&n);
        let ctx = ActionContext::new();
        let snapshot = json!({"input": {"x": 5}, "data": {}});
        let update = action.execute(&snapshot, &ctx).await;
        assert_eq!(update.data.get("copy"), Some(&json!({"x": 5})));
    }
}
