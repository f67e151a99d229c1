use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::{ExecutionState, PartialStateUpdate};

/// A cheaply-cloneable handle to an [`ExecutionState`] shared across the
/// concurrently-running node tasks a scheduler spawns for a single run.
#[derive(Debug, Clone)]
pub struct SharedExecutionState(Arc<RwLock<ExecutionState>>);

impl SharedExecutionState {
    pub fn new(input: Value) -> Self {
        Self(Arc::new(RwLock::new(ExecutionState::new(input))))
    }

    pub fn apply(&self, update: PartialStateUpdate) {
        self.0.write().apply(update);
    }

    pub fn as_value(&self) -> Value {
        self.0.read().as_value()
    }

    pub fn has_errors(&self) -> bool {
        self.0.read().has_errors()
    }

    /// Returns a clone of the underlying state, for callers that need to
    /// finish a run and hand back an owned [`ExecutionState`].
    pub fn snapshot(&self) -> ExecutionState {
        self.0.read().clone()
    }
}
