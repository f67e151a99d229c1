use async_trait::async_trait;
use nebula_core::NodeId;
use nebula_execution::PartialStateUpdate;
use serde_json::Value;

use crate::{Action, ActionContext};

/// The workflow entrypoint: a pure passthrough, installed by the compiler on
/// every graph rather than authored in the DSL.
pub struct StartAction {
    id: NodeId,
}

impl StartAction {
    pub fn new() -> Self {
        Self { id: NodeId::start() }
    }
}

impl Default for StartAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for StartAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, _snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        ctx.emit(&self.id, "start", None);
        PartialStateUpdate::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn is_a_no_op() {
        let action = StartAction::new();
        let ctx = ActionContext::new();
        let update = action.execute(&json!({}), &ctx).await;
        assert!(update.data.is_empty());
        assert!(update.errors.is_empty());
    }
}
