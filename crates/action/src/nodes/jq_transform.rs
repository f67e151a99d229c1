use async_trait::async_trait;
use nebula_core::NodeId;
use nebula_execution::{ErrorRecord, PartialStateUpdate};
use nebula_expression::{apply_output_mapping, resolve_inputs};
use nebula_workflow::{IoConfig, JqNode};
use serde_json::Value;

use crate::{Action, ActionContext};

/// Runs a jq program over resolved inputs. Missing input keys are resolved
/// leniently (`null`) since jq programs commonly "pick" from optional
/// branch outputs.
pub struct JqTransformAction {
    id: NodeId,
    io: IoConfig,
    code: String,
}

impl JqTransformAction {
    pub fn new(node: &JqNode) -> Self {
        Self {
            id: node.base.id.clone(),
            io: node.io.clone(),
            code: node.code.clone(),
        }
    }
}

#[async_trait]
impl Action for JqTransformAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        let inputs = match resolve_inputs(snapshot, &self.io.input_mapping, false) {
            Ok(inputs) => inputs,
            Err(e) => {
                return PartialStateUpdate::node_error(ErrorRecord::new(
                    self.id.as_str(),
                    "jq_error",
                    e.to_string(),
                ))
            }
        };
        let input_value = Value::Object(inputs.into_iter().collect());

        match ctx.jq.run(&self.code, input_value) {
            Ok(result) => {
                let outputs = apply_output_mapping(&result, &self.io.output_mapping);
                ctx.emit(&self.id, "jq_transform", None);
                PartialStateUpdate::node_output(self.id.as_str(), outputs)
            }
            Err(e) => PartialStateUpdate::node_error(ErrorRecord::new(
                self.id.as_str(),
                "jq_error",
                e.to_string(),
            )),
        }
    }
}
