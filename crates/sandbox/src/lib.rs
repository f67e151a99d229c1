//! Sandboxed evaluation of user-supplied scripts for the `python_code` node.
//!
//! The original engine runs author-supplied Python through RestrictedPython;
//! that isn't available here, so [`RhaiSandbox`] runs a comparable restricted
//! scripting language instead, wrapping the author's code as a `user_main`
//! function the same way and enforcing the same wall-clock timeout.
//!
//! Important limitation, carried over from upstream: this is a language-level
//! sandbox, not an OS sandbox. It bounds the interpreter's own operations and
//! call depth but does not provide hard process isolation.

mod rhai_sandbox;

pub use rhai_sandbox::RhaiSandbox;

use async_trait::async_trait;
use serde_json::Value;

use nebula_error::Result;

/// Runs a user-supplied script against a JSON input object and returns a
/// JSON result, enforcing `timeout_s`.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(&self, code: &str, input: Value, timeout_s: f64) -> Result<Value>;
}
