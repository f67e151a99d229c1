use std::sync::Arc;

use nebula_action::ActionContext;
use nebula_engine::WorkflowExecutor;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<WorkflowExecutor>,
}

impl AppState {
    pub fn new(ctx: ActionContext) -> Self {
        Self {
            executor: Arc::new(WorkflowExecutor::new(ctx)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ActionContext::new())
    }
}
