use async_trait::async_trait;
use indexmap::IndexMap;
use nebula_core::NodeId;
use nebula_execution::{ErrorRecord, PartialStateUpdate};
use nebula_expression::resolve_inputs;
use serde_json::Value;

use crate::{Action, ActionContext};

/// The workflow exit: projects the final output from `workflow.output.input_mapping`,
/// installed by the compiler on every graph rather than authored in the DSL.
pub struct EndAction {
    id: NodeId,
    input_mapping: IndexMap<String, Value>,
}

impl EndAction {
    pub fn new(input_mapping: IndexMap<String, Value>) -> Self {
        Self {
            id: NodeId::end(),
            input_mapping,
        }
    }
}

#[async_trait]
impl Action for EndAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        match resolve_inputs(snapshot, &self.input_mapping, true) {
            Ok(outputs) => {
                ctx.emit(&self.id, "end", None);
                PartialStateUpdate::workflow_output(Value::Object(outputs.into_iter().collect()))
            }
            Err(e) => PartialStateUpdate::node_error(ErrorRecord::new(
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

    #[tokio::test]
    async fn projects_final_output_from_state() {
        let mut mapping = IndexMap::new();
        mapping.insert("result".to_string(), json!("$nodes.compute.value"));
        let action = EndAction::new(mapping);
        let ctx = ActionContext::new();
        let snapshot = json!({"input": {}, "data": {"compute": {"value": 42}}});
        let update = action.execute(&snapshot, &ctx).await;
        assert_eq!(update.output, Some(json!({"result": 42})));
    }
}
