//! Illustrative HTTP boundary for the Nebula workflow engine.
//!
//! Exposes the same two operations the engine crate offers programmatically
//! — compile-only validation and full invocation — as a small `axum`
//! service, plus a liveness probe.

mod error;
mod handlers;
mod state;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the service's router over a shared [`AppState`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/workflow/validate", post(handlers::validate_workflow))
        .route("/workflow/invoke", post(handlers::invoke_workflow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    fn identity_workflow() -> serde_json::Value {
        json!({
            "id": "identity",
            "version": 1,
            "input": {"schema": "object"},
            "output": {"input_mapping": {"value": "$input.value"}},
            "nodes": [],
            "edges": [{"from": "start", "to": "end"}],
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(AppState::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validate_accepts_a_well_formed_workflow() {
        let app = router(AppState::default());
        let body = json!({"wf_spec": identity_workflow(), "input_data": {"value": 1}});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/workflow/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validate_rejects_a_workflow_missing_an_end_edge() {
        let mut spec = identity_workflow();
        spec["edges"] = json!([]);
        let app = router(AppState::default());
        let body = json!({"wf_spec": spec});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/workflow/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn invoke_runs_the_workflow_end_to_end() {
        let app = router(AppState::default());
        let body = json!({"wf_spec": identity_workflow(), "input_data": {"value": 7}});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/workflow/invoke")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
