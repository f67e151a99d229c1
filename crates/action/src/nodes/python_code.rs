use std::sync::Arc;

use async_trait::async_trait;
use nebula_core::NodeId;
use nebula_execution::{ErrorRecord, PartialStateUpdate};
use nebula_expression::{apply_output_mapping, resolve_inputs};
use nebula_sandbox::SandboxRunner;
use nebula_workflow::{IoConfig, PythonCodeNode};
use serde_json::Value;

use crate::{Action, ActionContext};

pub struct PythonCodeAction {
    id: NodeId,
    io: IoConfig,
    code: String,
    timeout_s: f64,
}

impl PythonCodeAction {
    pub fn new(node: &PythonCodeNode) -> Self {
        Self {
            id: node.base.id.clone(),
            io: node.io.clone(),
            code: node.code.clone(),
            timeout_s: node.timeout_s,
        }
    }
}

#[async_trait]
impl Action for PythonCodeAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        let Some(sandbox) = ctx.sandbox.as_ref().map(Arc::clone) else {
            return PartialStateUpdate::node_error(ErrorRecord::new(
                self.id.as_str(),
                "missing_dependency",
                "sandbox runner is not configured",
            ));
        };

        let inputs = match resolve_inputs(snapshot, &self.io.input_mapping, true) {
            Ok(inputs) => inputs,
            Err(e) => {
                return PartialStateUpdate::node_error(ErrorRecord::new(
                    self.id.as_str(),
                    "python_code_error",
                    e.to_string(),
                ))
            }
        };
        let input_value = Value::Object(inputs.into_iter().collect());

        match sandbox.run(&self.code, input_value, self.timeout_s).await {
            Ok(result) => {
                let outputs = apply_output_mapping(&result, &self.io.output_mapping);
                ctx.emit(&self.id, "python_code", None);
                PartialStateUpdate::node_output(self.id.as_str(), outputs)
            }
            Err(e) => PartialStateUpdate::node_error(ErrorRecord::new(
                self.id.as_str(),
                "python_code_error",
                e.to_string(),
            )),
        }
    }
}
