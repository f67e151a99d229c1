//! Mapping and router-condition expression engine.
//!
//! Resolves the `$input` / `$nodes` / `$state` expression grammar against an
//! execution-state snapshot (a plain [`serde_json::Value`] shaped like
//! `{input, data, last_node, output, errors}`, see `nebula-execution`), and
//! evaluates the restricted boolean expression language used by router
//! conditions.

pub mod condition;
mod mapping;

pub use condition::{eval_condition, pick_route};
pub use mapping::{apply_output_mapping, resolve_expr, resolve_inputs};
