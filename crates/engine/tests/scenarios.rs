//! End-to-end scenarios run through [`WorkflowExecutor`], covering the
//! fan-out/fan-in join, both schema gates, and the `fail_fast` switch.

use nebula_action::ActionContext;
use nebula_engine::WorkflowExecutor;
use nebula_error::NebulaError;
use nebula_workflow::Workflow;
use pretty_assertions::assert_eq;
use serde_json::json;

fn workflow(src: serde_json::Value) -> Workflow {
    nebula_workflow::from_json(&src.to_string()).unwrap()
}

#[tokio::test]
async fn three_way_fan_out_joins_once_all_branches_complete() {
    let wf = workflow(json!({
        "id": "fan_out",
        "version": 1,
        "input": {"schema": "object"},
        "output": {"input_mapping": {"total": "$nodes.sum"}},
        "nodes": [
            {
                "kind": "jq_transform", "id": "a",
                "input_mapping": {"x": "$input.x"},
                "output_mapping": {"value": "$.value"},
                "code": "{value: (.x * 2)}",
            },
            {
                "kind": "jq_transform", "id": "b",
                "input_mapping": {"x": "$input.x"},
                "output_mapping": {"value": "$.value"},
                "code": "{value: (.x * 3)}",
            },
            {
                "kind": "jq_transform", "id": "c",
                "input_mapping": {"x": "$input.x"},
                "output_mapping": {"value": "$.value"},
                "code": "{value: (.x * 4)}",
            },
            {
                "kind": "jq_transform", "id": "sum",
                "input_mapping": {
                    "a": "$nodes.a.value", "b": "$nodes.b.value", "c": "$nodes.c.value",
                },
                "output_mapping": {},
                "code": ".a + .b + .c",
            },
        ],
        "edges": [
            {"from": "start", "to": "a"},
            {"from": "start", "to": "b"},
            {"from": "start", "to": "c"},
            {"from": "a", "to": "sum"},
            {"from": "b", "to": "sum"},
            {"from": "c", "to": "sum"},
            {"from": "sum", "to": "end"},
        ],
    }));

    let executor = WorkflowExecutor::new(ActionContext::new());
    let output = executor.invoke(&wf, json!({"x": 2})).await.unwrap();
    assert_eq!(output, json!({"total": 18}));
}

#[tokio::test]
async fn output_schema_violation_is_rejected_after_the_run_completes() {
    let wf = workflow(json!({
        "id": "typed_output",
        "version": 1,
        "input": {"schema": "object"},
        "output": {
            "schema": {"type": "object", "required": ["count"], "properties": {"count": {"type": "integer"}}},
            "input_mapping": {"count": "$input.label"},
        },
        "nodes": [],
        "edges": [{"from": "start", "to": "end"}],
    }));

    let executor = WorkflowExecutor::new(ActionContext::new());
    let err = executor
        .invoke(&wf, json!({"label": "not-an-integer"}))
        .await
        .unwrap_err();
    assert!(matches!(err, NebulaError::SchemaValidation { .. }));
}

#[tokio::test]
async fn fail_fast_aborts_the_run_when_a_sandboxed_script_exhausts_its_operation_budget() {
    let wf = workflow(json!({
        "id": "runaway_script",
        "version": 1,
        "input": {"schema": "object"},
        "output": {"input_mapping": {}},
        "fail_fast": true,
        "nodes": [{
            "kind": "python_code", "id": "loop_forever",
            "input_mapping": {},
            "output_mapping": {},
            "code": "let x = 0; loop { x += 1; }",
            "timeout_s": 5.0,
        }],
        "edges": [
            {"from": "start", "to": "loop_forever"},
            {"from": "loop_forever", "to": "end"},
        ],
    }));

    let ctx = ActionContext::new().with_sandbox(std::sync::Arc::new(nebula_sandbox::RhaiSandbox::new()));
    let executor = WorkflowExecutor::new(ctx);
    let err = executor.invoke(&wf, json!({})).await.unwrap_err();
    match err {
        NebulaError::ExecutionAborted { node_id, reason } => {
            assert_eq!(node_id, "loop_forever");
            assert!(reason.contains("python_code"), "unexpected reason: {reason}");
        }
        other => panic!("expected ExecutionAborted, got {other:?}"),
    }
}

#[tokio::test]
async fn non_fail_fast_run_continues_past_a_node_error_and_still_produces_output() {
    let wf = workflow(json!({
        "id": "tolerant",
        "version": 1,
        "input": {"schema": "object"},
        "output": {"input_mapping": {"result": "$nodes.join"}},
        "fail_fast": false,
        "nodes": [
            {
                "kind": "jq_transform", "id": "ok_branch",
                "input_mapping": {"x": "$input.x"},
                "output_mapping": {"value": "$.value"},
                "code": "{value: .x}",
            },
            {
                "kind": "http_request", "id": "failing_branch",
                "input_mapping": {"url": "$input.missing_url"},
                "output_mapping": {},
            },
            {
                "kind": "jq_transform", "id": "join",
                "input_mapping": {
                    "ok": "$nodes.ok_branch.value",
                    "bad": "$nodes.failing_branch",
                },
                "output_mapping": {},
                "code": ".ok // .bad",
            },
        ],
        "edges": [
            {"from": "start", "to": "ok_branch"},
            {"from": "start", "to": "failing_branch"},
            {"from": "ok_branch", "to": "join"},
            {"from": "failing_branch", "to": "join"},
            {"from": "join", "to": "end"},
        ],
    }));

    let executor = WorkflowExecutor::new(ActionContext::new());
    let output = executor.invoke(&wf, json!({"x": 9})).await.unwrap();
    assert_eq!(output, json!({"result": 9}));
}
