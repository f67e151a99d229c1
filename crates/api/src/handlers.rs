use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    wf_spec: Value,
    input_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    wf_spec: Value,
    input_data: Value,
}

/// `POST /workflow/validate`
///
/// Parses and compiles `wf_spec` without running it; if `input_data` is
/// given, also checks it against the workflow's input schema.
pub async fn validate_workflow(Json(req): Json<ValidateRequest>) -> Result<Json<Value>, ApiError> {
    let workflow = nebula_workflow::parse(req.wf_spec)?;
    nebula_engine::compile(&workflow)?;
    if let Some(input) = &req.input_data {
        nebula_schema::validate(input, &workflow.input.schema)?;
    }
    Ok(Json(json!({ "status": "ok" })))
}

/// `POST /workflow/invoke`
///
/// Parses, compiles, and runs `wf_spec` against `input_data`, returning the
/// `end` node's projected output.
pub async fn invoke_workflow(
    State(state): State<AppState>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<Value>, ApiError> {
    let workflow = nebula_workflow::parse(req.wf_spec)?;
    let output = state.executor.invoke(&workflow, req.input_data).await?;
    Ok(Json(output))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
