//! Workflow DSL model, parser, and structural validator.
//!
//! A [`Workflow`] is authored as data — JSON or YAML — and parsed with
//! [`parse`], which both deserialises the tree and enforces the DSL's
//! structural invariants (unique, well-formed node ids; edges that only
//! reference declared or reserved node ids; non-empty branch routes). The
//! compiler in `nebula-engine` consumes the resulting [`Workflow`] and
//! performs the remaining *semantic* checks (start/end edge presence) that
//! depend on the synthetic system nodes it installs.

mod model;
mod parse;
mod validate;

pub use model::{
    BranchEdge, Edge, EdgeRoute, HttpRequestNode, Input, IoConfig, JqNode, JsonSchema, LlmNode,
    LlmPrompt, LlmPromptPart, LlmPromptPartKind, LlmSchema, Node, NodeBase, NodeKind, NoopNode,
    Output, PythonCodeNode, RouterNode, SimpleEdge, Workflow,
};
pub use parse::{from_json, from_yaml, parse};
pub use validate::validate;
