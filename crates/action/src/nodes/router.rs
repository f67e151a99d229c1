use async_trait::async_trait;
use indexmap::IndexMap;
use nebula_core::NodeId;
use nebula_execution::{ErrorRecord, PartialStateUpdate};
use nebula_expression::pick_route;
use nebula_workflow::{IoConfig, RouterNode};
use serde_json::{json, Value};

use crate::{Action, ActionContext};

/// Picks a route label by evaluating `cases` in declared order against the
/// run's state, falling back to `default` if none match.
pub struct RouterAction {
    id: NodeId,
    io: IoConfig,
    cases: IndexMap<String, String>,
    default: Option<String>,
}

impl RouterAction {
    pub fn new(node: &RouterNode) -> Self {
        Self {
            id: node.base.id.clone(),
            io: node.io.clone(),
            cases: node.cases.clone(),
            default: node.default.clone(),
        }
    }
}

#[async_trait]
impl Action for RouterAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        match pick_route(&self.cases, self.default.as_deref(), snapshot) {
            Ok(Some(label)) => {
                ctx.emit(&self.id, "router", Some(label.clone()));
                PartialStateUpdate::node_output(self.id.as_str(), json!({ "label": label }))
            }
            Ok(None) => PartialStateUpdate::node_error(ErrorRecord::new(
                self.id.as_str(),
                "router_error",
                "no route selected",
            )),
            Err(e) => PartialStateUpdate::node_error(ErrorRecord::new(
                self.id.as_str(),
                "router_error",
                e.to_string(),
            )),
        }
    }
}
