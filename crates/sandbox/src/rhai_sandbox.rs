use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rhai::{Dynamic, Engine, Scope, AST};
use serde_json::Value;

use nebula_error::{NebulaError, Result};

use crate::SandboxRunner;

fn sandbox_error(reason: impl Into<String>) -> NebulaError {
    NebulaError::PythonCodeError {
        node_id: String::new(),
        reason: reason.into(),
    }
}

fn build_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(500_000);
    engine.set_max_call_levels(32);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(1 << 20);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);
    engine.disable_symbol("eval");
    engine
}

/// Allows workflow authors to write a bare script body, the same way the
/// Python backend lets them write a top-level `return {...}` statement.
fn wrap_user_code(code: &str) -> String {
    format!("fn user_main(input) {{\n{code}\n}}\n")
}

/// `rhai`-based runner for the `python_code` node.
///
/// The interpreter is built once and reused across calls: operation/call-depth/
/// container-size limits bound a single script's resource use, and each `run`
/// call compiles and executes the script on a blocking thread pool task
/// guarded by a [`tokio::time::timeout`].
pub struct RhaiSandbox {
    engine: Arc<Engine>,
}

impl Default for RhaiSandbox {
    fn default() -> Self {
        Self {
            engine: Arc::new(build_engine()),
        }
    }
}

impl RhaiSandbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SandboxRunner for RhaiSandbox {
    async fn run(&self, code: &str, input: Value, timeout_s: f64) -> Result<Value> {
        let engine = Arc::clone(&self.engine);
        let wrapped = wrap_user_code(code);

        let task = tokio::task::spawn_blocking(move || -> Result<Value> {
            let ast: AST = engine
                .compile(&wrapped)
                .map_err(|e| sandbox_error(format!("compilation failed: {e}")))?;

            let input_dynamic: Dynamic = rhai::serde::to_dynamic(&input)
                .map_err(|e| sandbox_error(format!("input conversion failed: {e}")))?;

            let mut scope = Scope::new();
            let result: Dynamic = engine
                .call_fn(&mut scope, &ast, "user_main", (input_dynamic,))
                .map_err(|e| sandbox_error(format!("script execution failed: {e}")))?;

            rhai::serde::from_dynamic::<Value>(&result)
                .map_err(|e| sandbox_error(format!("result conversion failed: {e}")))
        });

        let timeout = Duration::from_secs_f64(timeout_s.max(0.0));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(inner)) => inner,
            Ok(Err(join_err)) => Err(sandbox_error(format!("sandbox task panicked: {join_err}"))),
            Err(_) => Err(sandbox_error(format!(
                "execution timed out after {timeout_s} seconds"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_mapped_result() {
        let sandbox = RhaiSandbox::new();
        let result = sandbox
            .run("#{ doubled: input.x * 2 }", json!({"x": 4}), 1.0)
            .await
            .unwrap();
        assert_eq!(result, json!({"doubled": 8}));
    }

    #[tokio::test]
    async fn compile_error_is_reported() {
        let sandbox = RhaiSandbox::new();
        let err = sandbox.run("this is not valid {{{", json!({}), 1.0).await.unwrap_err();
        assert!(err.to_string().contains("compilation failed"));
    }

    #[tokio::test]
    async fn runaway_loop_is_stopped_by_operation_limit() {
        let sandbox = RhaiSandbox::new();
        let err = sandbox
            .run("let x = 0; loop { x += 1; }", json!({}), 5.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("script execution failed"));
    }

    #[tokio::test]
    async fn input_fields_are_visible_to_the_script() {
        let sandbox = RhaiSandbox::new();
        let result = sandbox
            .run("#{ greeting: \"hi \" + input.name }", json!({"name": "ada"}), 1.0)
            .await
            .unwrap();
        assert_eq!(result, json!({"greeting": "hi ada"}));
    }
}
