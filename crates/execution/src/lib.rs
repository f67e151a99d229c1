//! Execution state for a single workflow run.
//!
//! [`ExecutionState`] tracks everything a run accumulates as nodes complete:
//! the validated workflow input, each node's output keyed by node id, the
//! last node to have run, the final projected output, and any errors raised
//! along the way. [`PartialStateUpdate`] is what a single node execution
//! produces; [`ExecutionState::apply`] merges it in using the same reducer
//! semantics as the LangGraph-backed original: `data` is a dict union with
//! right-hand precedence, `errors` concatenate in completion order, and
//! `last_node` / `output` are last-writer-wins.

mod error_record;
mod shared;
mod state;

pub use error_record::ErrorRecord;
pub use shared::SharedExecutionState;
pub use state::{ExecutionState, PartialStateUpdate};
