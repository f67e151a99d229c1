//! [`NebulaError`]: the single error type threaded through compilation and
//! execution of a workflow.

use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result alias used throughout the Nebula workflow engine.
pub type Result<T> = std::result::Result<T, NebulaError>;

/// Unified error type for the Nebula workflow engine.
///
/// Variants map roughly onto the stages a workflow passes through: DSL
/// parsing and validation, schema compilation, expression resolution, node
/// execution, and scheduling. Each variant carries enough context to surface
/// a useful message without the caller needing to downcast.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NebulaError {
    /// The workflow DSL failed structural or semantic validation.
    #[error("invalid workflow: {reason}")]
    InvalidWorkflow { reason: String },

    /// A JSON Schema document attached to a workflow is itself malformed.
    #[error("invalid schema at {path}: {reason}")]
    InvalidSchema { path: String, reason: String },

    /// An instance failed validation against a compiled JSON Schema.
    #[error("schema validation failed for {path}: {reason}")]
    SchemaValidation { path: String, reason: String },

    /// A node declared a dependency (credential, client, model) that was not
    /// available in the runtime context.
    #[error("missing dependency for node '{node_id}': {reason}")]
    MissingDependency { node_id: String, reason: String },

    /// Resolving an input or output mapping expression failed.
    #[error("mapping error while resolving '{expr}': {reason}")]
    MappingError { expr: String, reason: String },

    /// The jq backend rejected a filter or failed to evaluate one.
    #[error("jq error in node '{node_id}': {reason}")]
    JqError { node_id: String, reason: String },

    /// The sandboxed `python_code` node raised, timed out, or its script
    /// failed to compile.
    #[error("python_code error in node '{node_id}': {reason}")]
    PythonCodeError { node_id: String, reason: String },

    /// A call to a chat model failed.
    #[error("llm error in node '{node_id}': {reason}")]
    LlmError { node_id: String, reason: String },

    /// Rendering an `{placeholder}` prompt template failed.
    #[error("prompt format error in node '{node_id}': {reason}")]
    PromptFormatError { node_id: String, reason: String },

    /// The `http_request` node's request could not be built or its response
    /// could not be decoded.
    #[error("http_request error in node '{node_id}': {reason}")]
    HttpRequestError { node_id: String, reason: String },

    /// The router's condition language rejected or failed to evaluate a
    /// case expression.
    #[error("router error in node '{node_id}': {reason}")]
    RouterError { node_id: String, reason: String },

    /// A node declared a `kind` with no registered executor factory.
    #[error("unsupported node kind '{kind}' for node '{node_id}'")]
    UnsupportedNodeKind { node_id: String, kind: String },

    /// A node used `start` or `end` as its id, which are reserved for the
    /// compiler's synthetic entry/exit nodes.
    #[error("node id '{node_id}' is reserved")]
    ReservedIdUsed { node_id: String },

    /// The compiled graph has no edge originating at `start`.
    #[error("workflow '{workflow_id}' has no edge from start")]
    NoStartEdge { workflow_id: String },

    /// The compiled graph has no edge terminating at `end`.
    #[error("workflow '{workflow_id}' has no edge to end")]
    NoEndEdge { workflow_id: String },

    /// A node failed during execution and `fail_fast` aborted the run.
    #[error("execution aborted after node '{node_id}' failed: {reason}")]
    ExecutionAborted { node_id: String, reason: String },
}

impl NebulaError {
    /// Stable, machine-readable identifier for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidWorkflow { .. } => "INVALID_WORKFLOW",
            Self::InvalidSchema { .. } => "INVALID_SCHEMA",
            Self::SchemaValidation { .. } => "SCHEMA_VALIDATION",
            Self::MissingDependency { .. } => "MISSING_DEPENDENCY",
            Self::MappingError { .. } => "MAPPING_ERROR",
            Self::JqError { .. } => "JQ_ERROR",
            Self::PythonCodeError { .. } => "PYTHON_CODE_ERROR",
            Self::LlmError { .. } => "LLM_ERROR",
            Self::PromptFormatError { .. } => "PROMPT_FORMAT_ERROR",
            Self::HttpRequestError { .. } => "HTTP_REQUEST_ERROR",
            Self::RouterError { .. } => "ROUTER_ERROR",
            Self::UnsupportedNodeKind { .. } => "UNSUPPORTED_NODE_KIND",
            Self::ReservedIdUsed { .. } => "RESERVED_ID_USED",
            Self::NoStartEdge { .. } => "NO_START_EDGE",
            Self::NoEndEdge { .. } => "NO_END_EDGE",
            Self::ExecutionAborted { .. } => "EXECUTION_ABORTED",
        }
    }

    /// Whether a caller might reasonably retry the operation that produced
    /// this error unchanged. Structural/validation errors are never
    /// retryable; transient node failures (LLM calls, HTTP requests) are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LlmError { .. } | Self::HttpRequestError { .. }
        )
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::MissingDependency { node_id, .. }
            | Self::JqError { node_id, .. }
            | Self::PythonCodeError { node_id, .. }
            | Self::LlmError { node_id, .. }
            | Self::PromptFormatError { node_id, .. }
            | Self::HttpRequestError { node_id, .. }
            | Self::RouterError { node_id, .. }
            | Self::UnsupportedNodeKind { node_id, .. }
            | Self::ReservedIdUsed { node_id }
            | Self::ExecutionAborted { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}

/// A convenience struct-printer used by node error records in the execution
/// state; kept distinct from [`NebulaError`]'s `Display` impl so the wire
/// shape (`type`, `message`) stays stable even if variant messages change.
impl NebulaError {
    pub fn error_type(&self) -> &'static str {
        self.code()
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for NebulaError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidWorkflow {
            reason: err.to_string(),
        }
    }
}

// `thiserror::Error` already gives us `Display`; re-export a short debug
// alias some call sites prefer for log lines.
impl NebulaError {
    pub fn short(&self) -> impl fmt::Display + '_ {
        struct Short<'a>(&'a NebulaError);
        impl fmt::Display for Short<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}: {}", self.0.code(), self.0)
            }
        }
        Short(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let transient = NebulaError::HttpRequestError {
            node_id: "n1".into(),
            reason: "timeout".into(),
        };
        assert!(transient.is_retryable());

        let structural = NebulaError::InvalidWorkflow {
            reason: "bad".into(),
        };
        assert!(!structural.is_retryable());
    }

    #[test]
    fn node_id_extraction() {
        let err = NebulaError::RouterError {
            node_id: "router1".into(),
            reason: "bad condition".into(),
        };
        assert_eq!(err.node_id(), Some("router1"));

        let err = NebulaError::InvalidWorkflow {
            reason: "x".into(),
        };
        assert_eq!(err.node_id(), None);
    }
}
