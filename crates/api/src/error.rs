//! Maps [`NebulaError`] onto HTTP status codes and a stable JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use nebula_error::NebulaError;

/// Wraps a [`NebulaError`] so it can be returned directly from a handler.
pub struct ApiError(pub NebulaError);

impl From<NebulaError> for ApiError {
    fn from(err: NebulaError) -> Self {
        Self(err)
    }
}

fn status_for(err: &NebulaError) -> StatusCode {
    match err {
        NebulaError::InvalidWorkflow { .. }
        | NebulaError::InvalidSchema { .. }
        | NebulaError::SchemaValidation { .. }
        | NebulaError::ReservedIdUsed { .. }
        | NebulaError::NoStartEdge { .. }
        | NebulaError::NoEndEdge { .. }
        | NebulaError::UnsupportedNodeKind { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        tracing::error!(
            target: "nebula_api::error",
            code = self.0.code(),
            error = %self.0,
            "request failed"
        );
        (
            status,
            Json(json!({
                "error": {
                    "code": self.0.code(),
                    "message": self.0.to_string(),
                }
            })),
        )
            .into_response()
    }
}
