//! Workflow DSL data model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nebula_core::NodeId;

/// A JSON Schema definition as authored on the wire.
///
/// The DSL accepts either a full schema object or a bare type-name shorthand
/// (`"string"`, `"object"`, …), which [`JsonSchema::to_value`] expands into
/// `{"type": "<name>"}` before it reaches the Draft 7 validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonSchema {
    Shorthand(String),
    Schema(Value),
}

impl JsonSchema {
    pub fn object() -> Self {
        Self::Schema(serde_json::json!({ "type": "object" }))
    }

    /// Expand shorthand into a full schema object; pass full schemas through
    /// unchanged.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Shorthand(name) => serde_json::json!({ "type": name }),
            Self::Schema(v) => v.clone(),
        }
    }
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::object()
    }
}

/// Attributes shared by every authored node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBase {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Input/output mapping attributes shared by every authored node kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default)]
    pub input_mapping: IndexMap<String, Value>,
    #[serde(default)]
    pub output_mapping: IndexMap<String, Value>,
}

/// The workflow input container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    #[serde(rename = "schema", default = "JsonSchema::object")]
    pub schema: JsonSchema,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            schema: JsonSchema::object(),
        }
    }
}

/// The workflow output container: a final projection (`input_mapping`, read
/// against the completed execution state) plus an optional schema gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub input_mapping: IndexMap<String, Value>,
    #[serde(rename = "schema", default = "default_output_schema")]
    pub schema: Option<JsonSchema>,
}

fn default_output_schema() -> Option<JsonSchema> {
    Some(JsonSchema::object())
}

/// A single multimodal prompt part, normalised into this canonical shape by
/// [`crate::parse::parse`] regardless of the legacy form it was authored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmPromptPart {
    #[serde(rename = "type")]
    pub kind: LlmPromptPartKind,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmPromptPartKind {
    Text,
    ImageUrl,
}

/// A prompt is either a plain template string or an ordered multimodal part
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LlmPrompt {
    Text(String),
    Parts(Vec<LlmPromptPart>),
}

/// The schema an `llm` node asks its model to produce structured output
/// against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSchema {
    #[serde(default = "default_object_type")]
    pub r#type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

fn default_object_type() -> String {
    "object".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub io: IoConfig,
    pub model: String,
    #[serde(default)]
    pub model_params: IndexMap<String, Value>,
    pub prompt: LlmPrompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<LlmSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JqNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub io: IoConfig,
    pub code: String,
}

fn default_timeout_s() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonCodeNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub io: IoConfig,
    pub code: String,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub io: IoConfig,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub io: IoConfig,
    /// Routing cases in declared order: `label -> condition expression`.
    /// An [`IndexMap`] so evaluation order matches authoring order — the
    /// router picks the first truthy case.
    pub cases: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoopNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub io: IoConfig,
}

/// A declared workflow node, tagged by `kind`.
///
/// `start` and `end` are never authored: they're system kinds the compiler
/// installs on every workflow and are not representable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Noop(NoopNode),
    JqTransform(JqNode),
    PythonCode(PythonCodeNode),
    Llm(LlmNode),
    Router(RouterNode),
    HttpRequest(HttpRequestNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Noop(n) => &n.base.id,
            Self::JqTransform(n) => &n.base.id,
            Self::PythonCode(n) => &n.base.id,
            Self::Llm(n) => &n.base.id,
            Self::Router(n) => &n.base.id,
            Self::HttpRequest(n) => &n.base.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Noop(_) => NodeKind::Noop,
            Self::JqTransform(_) => NodeKind::JqTransform,
            Self::PythonCode(_) => NodeKind::PythonCode,
            Self::Llm(_) => NodeKind::Llm,
            Self::Router(_) => NodeKind::Router,
            Self::HttpRequest(_) => NodeKind::HttpRequest,
        }
    }

    pub fn io(&self) -> &IoConfig {
        match self {
            Self::Noop(n) => &n.io,
            Self::JqTransform(n) => &n.io,
            Self::PythonCode(n) => &n.io,
            Self::Llm(n) => &n.io,
            Self::Router(n) => &n.io,
            Self::HttpRequest(n) => &n.io,
        }
    }
}

/// Every node kind, including the two system kinds the compiler installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Noop,
    JqTransform,
    PythonCode,
    Llm,
    Router,
    HttpRequest,
    Start,
    End,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Noop => "noop",
            Self::JqTransform => "jq_transform",
            Self::PythonCode => "python_code",
            Self::Llm => "llm",
            Self::Router => "router",
            Self::HttpRequest => "http_request",
            Self::Start => "start",
            Self::End => "end",
        };
        f.write_str(s)
    }
}

/// A single route inside a [`BranchEdge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRoute {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleEdge {
    #[serde(rename = "from")]
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchEdge {
    #[serde(rename = "from")]
    pub from: String,
    pub routes: Vec<EdgeRoute>,
}

/// An edge either connects two nodes directly or fans out to several
/// conditional routes from the same source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Edge {
    Branch(BranchEdge),
    Simple(SimpleEdge),
}

impl Edge {
    pub fn from(&self) -> &str {
        match self {
            Self::Simple(e) => &e.from,
            Self::Branch(e) => &e.from,
        }
    }
}

/// Top-level workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub version: i64,
    pub input: Input,
    pub output: Output,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

fn default_fail_fast() -> bool {
    true
}
