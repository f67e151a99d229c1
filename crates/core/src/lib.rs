//! Core identifier types shared across the Nebula workflow engine.

mod id;

pub use id::{NodeId, WorkflowId};
