//! Unified error type for the Nebula workflow engine.
//!
//! Every fallible operation across the workflow model, schema validator,
//! expression engine, node executors, sandbox, and scheduler returns
//! [`Result<T>`], built on a single [`NebulaError`] taxonomy so that callers
//! never have to match on crate-specific error enums.

mod error;

pub use error::{NebulaError, Result};
