use std::sync::Arc;

use nebula_core::NodeId;
use nebula_sandbox::SandboxRunner;
use tokio::sync::mpsc::UnboundedSender;

use crate::chat::ChatModel;
use crate::http_client::HttpClient;
use crate::jq::{JaqRunner, JqRunner};

/// Emitted once a node finishes successfully, mirroring the `node_completed`
/// events the original engine's `emit_event` callback published.
#[derive(Debug, Clone)]
pub struct NodeEvent {
    pub node_id: NodeId,
    pub kind: &'static str,
    pub route: Option<String>,
}

/// Compile-time dependencies shared by every node action across a single
/// compiled workflow graph: the jq backend, the sandbox runner, the HTTP
/// client, and the chat model, plus an optional event sink.
#[derive(Clone)]
pub struct ActionContext {
    pub jq: Arc<dyn JqRunner>,
    pub sandbox: Option<Arc<dyn SandboxRunner>>,
    pub http_client: Option<Arc<dyn HttpClient>>,
    pub chat_model: Option<Arc<dyn ChatModel>>,
    pub events: Option<UnboundedSender<NodeEvent>>,
}

impl Default for ActionContext {
    fn default() -> Self {
        Self {
            jq: Arc::new(JaqRunner::new()),
            sandbox: None,
            http_client: None,
            chat_model: None,
            events: None,
        }
    }
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sandbox(mut self, sandbox: Arc<dyn SandboxRunner>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    pub fn with_events(mut self, sender: UnboundedSender<NodeEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn emit(&self, node_id: &NodeId, kind: &'static str, route: Option<String>) {
        tracing::debug!(node_id = %node_id, kind, route = route.as_deref(), "node_completed");
        if let Some(sender) = &self.events {
            let _ = sender.send(NodeEvent { node_id: node_id.clone(), kind, route });
        }
    }
}
