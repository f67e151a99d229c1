//! Compiler and scheduler: turns a validated [`nebula_workflow::Workflow`]
//! into a runnable graph and executes it.
//!
//! [`compile::compile`] performs the semantic checks that depend on the
//! synthetic `start`/`end` nodes and installs router fallback dispatch;
//! [`Scheduler`] walks the resulting [`CompiledGraph`] with dependency-driven
//! fan-out/fan-in; [`WorkflowExecutor`] wires both together with the input
//! and output schema gates for a single call.

mod compile;
mod executor;
mod scheduler;

pub use compile::{compile, CompiledGraph};
pub use executor::WorkflowExecutor;
pub use scheduler::Scheduler;
