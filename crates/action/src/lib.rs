//! Node executors for the Nebula workflow engine.
//!
//! Each authored node kind (`noop`, `jq_transform`, `python_code`, `llm`,
//! `router`, `http_request`) and the two system kinds the compiler installs
//! on every graph (`start`, `end`) implement the [`Action`] trait. An
//! [`ActionContext`] carries the compile-time dependencies (jq backend,
//! sandbox runner, HTTP client, chat model) a workflow's actions are built
//! against; [`registry::build_actions`] constructs one action per node from
//! a parsed [`nebula_workflow::Workflow`].

mod action;
mod chat;
mod context;
mod http_client;
mod jq;
mod nodes;
mod registry;

pub use action::Action;
pub use chat::{ChatMessage, ChatMessagePart, ChatMessagePartKind, ChatModel};
pub use context::{ActionContext, NodeEvent};
pub use http_client::{HttpClient, HttpRequestSpec, HttpResponseSpec};
pub use jq::{JaqRunner, JqRunner};
pub use nodes::{EndAction, HttpRequestAction, JqTransformAction, LlmAction, NoopAction, PythonCodeAction, RouterAction, StartAction};
pub use registry::build_actions;

#[cfg(feature = "http-llm")]
pub use chat::ReqwestChatModel;
#[cfg(feature = "http-llm")]
pub use http_client::ReqwestHttpClient;
