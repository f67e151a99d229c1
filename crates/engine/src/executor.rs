//! Top-level entry point: compiles and runs a workflow against an input,
//! validating both ends against the declared schemas.

use std::sync::Arc;

use serde_json::Value;

use nebula_action::{build_actions, ActionContext};
use nebula_error::{NebulaError, Result};
use nebula_workflow::Workflow;

use crate::compile;
use crate::scheduler::Scheduler;

/// Compiles and executes workflows against a shared [`ActionContext`].
///
/// A single `WorkflowExecutor` is re-entrant across invocations: compiling
/// and running a workflow never mutates the executor or the workflow
/// definition.
pub struct WorkflowExecutor {
    ctx: Arc<ActionContext>,
}

impl WorkflowExecutor {
    pub fn new(ctx: ActionContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Validates `input` against the workflow's input schema, compiles and
    /// runs the workflow, then validates the projected output against its
    /// output schema (if any).
    pub async fn invoke(&self, workflow: &Workflow, input: Value) -> Result<Value> {
        nebula_schema::validate(&input, &workflow.input.schema)
            .map_err(|e| wrap_boundary_error(workflow, "input", e))?;

        let graph = compile::compile(workflow)?;
        let actions = build_actions(workflow)?;
        let scheduler = Scheduler::new(graph, actions, Arc::clone(&self.ctx));

        let output = scheduler.run(input).await?;

        if let Some(schema) = &workflow.output.schema {
            nebula_schema::validate(&output, schema)
                .map_err(|e| wrap_boundary_error(workflow, "output", e))?;
        }

        Ok(output)
    }
}

fn wrap_boundary_error(workflow: &Workflow, boundary: &str, err: NebulaError) -> NebulaError {
    let prefix = |reason: &str| format!("workflow '{}' {boundary} schema validation failed: {reason}", workflow.id);
    match err {
        NebulaError::SchemaValidation { path, reason } => NebulaError::SchemaValidation {
            path,
            reason: prefix(&reason),
        },
        NebulaError::InvalidSchema { path, reason } => NebulaError::InvalidSchema {
            path,
            reason: prefix(&reason),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn workflow(src: serde_json::Value) -> Workflow {
        nebula_workflow::from_json(&src.to_string()).unwrap()
    }

    #[tokio::test]
    async fn identity_workflow_returns_input() {
        let wf = workflow(json!({
            "id": "identity",
            "version": 1,
            "input": {"schema": "object"},
            "output": {"input_mapping": {"value": "$input.value"}},
            "nodes": [],
            "edges": [{"from": "start", "to": "end"}],
        }));
        let executor = WorkflowExecutor::new(ActionContext::new());
        let output = executor.invoke(&wf, json!({"value": 42})).await.unwrap();
        assert_eq!(output, json!({"value": 42}));
    }

    #[tokio::test]
    async fn sequential_transform_chains_jq_nodes() {
        let wf = workflow(json!({
            "id": "sequential",
            "version": 1,
            "input": {"schema": "object"},
            "output": {"input_mapping": {"result": "$nodes.double.value"}},
            "nodes": [{
                "kind": "jq_transform",
                "id": "double",
                "input_mapping": {"value": "$input.value"},
                "output_mapping": {"value": "$result"},
                "code": ".value * 2",
            }],
            "edges": [
                {"from": "start", "to": "double"},
                {"from": "double", "to": "end"},
            ],
        }));
        let executor = WorkflowExecutor::new(ActionContext::new());
        let output = executor.invoke(&wf, json!({"value": 21})).await.unwrap();
        assert_eq!(output, json!({"result": 42}));
    }

    #[tokio::test]
    async fn input_schema_violation_is_rejected_before_compiling() {
        let wf = workflow(json!({
            "id": "typed",
            "version": 1,
            "input": {"schema": {"type": "object", "required": ["value"]}},
            "output": {"input_mapping": {}},
            "nodes": [],
            "edges": [{"from": "start", "to": "end"}],
        }));
        let executor = WorkflowExecutor::new(ActionContext::new());
        let err = executor.invoke(&wf, json!({})).await.unwrap_err();
        assert!(matches!(err, NebulaError::SchemaValidation { .. }));
    }

    #[tokio::test]
    async fn router_skips_the_unselected_branch_and_joins_at_a_shared_target() {
        let wf = workflow(json!({
            "id": "router_add_sub",
            "version": 1,
            "input": {"schema": "object"},
            "output": {"input_mapping": {"result": "$nodes.pick_result"}},
            "nodes": [
                {
                    "kind": "router", "id": "route_op",
                    "cases": {"add": "$input.op == 'add'", "sub": "$input.op == 'sub'"},
                },
                {
                    "kind": "jq_transform", "id": "do_add",
                    "input_mapping": {"x": "$input.x", "y": "$input.y"},
                    "output_mapping": {"value": "$.value"},
                    "code": "{value: (.x + .y)}",
                },
                {
                    "kind": "jq_transform", "id": "do_sub",
                    "input_mapping": {"x": "$input.x", "y": "$input.y"},
                    "output_mapping": {"value": "$.value"},
                    "code": "{value: (.x - .y)}",
                },
                {
                    "kind": "jq_transform", "id": "pick_result",
                    "input_mapping": {
                        "add_result": "$nodes.do_add.value",
                        "sub_result": "$nodes.do_sub.value",
                    },
                    "output_mapping": {},
                    "code": ".add_result // .sub_result",
                },
            ],
            "edges": [
                {"from": "start", "to": "route_op"},
                {"from": "route_op", "to": "do_add", "when_label": "add"},
                {"from": "route_op", "to": "do_sub", "when_label": "sub"},
                {"from": "do_add", "to": "pick_result"},
                {"from": "do_sub", "to": "pick_result"},
                {"from": "pick_result", "to": "end"},
            ],
        }));
        let executor = WorkflowExecutor::new(ActionContext::new());

        let added = executor
            .invoke(&wf, json!({"x": 3, "y": 4, "op": "add"}))
            .await
            .unwrap();
        assert_eq!(added, json!({"result": 7}));

        let subtracted = executor
            .invoke(&wf, json!({"x": 3, "y": 4, "op": "sub"}))
            .await
            .unwrap();
        assert_eq!(subtracted, json!({"result": -1}));
    }
}
