use async_trait::async_trait;
use nebula_core::NodeId;
use nebula_execution::PartialStateUpdate;
use serde_json::Value;

use crate::ActionContext;

/// A single node's executable behavior.
///
/// `execute` never fails outright: a node that hits a runtime problem
/// (missing dependency, bad jq program, non-2xx HTTP response, ...) reports
/// it as an [`nebula_execution::ErrorRecord`] on the returned update rather
/// than propagating a [`nebula_error::NebulaError`] — the scheduler decides
/// whether that halts the run.
#[async_trait]
pub trait Action: Send + Sync {
    fn node_id(&self) -> &NodeId;

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate;
}
