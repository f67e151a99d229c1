//! `JqRunner`: the interface the `jq_transform` node evaluates its program
//! through, plus a `jaq`-backed default implementation.

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

use nebula_error::{NebulaError, Result};

fn jq_error(reason: impl Into<String>) -> NebulaError {
    NebulaError::JqError {
        node_id: String::new(),
        reason: reason.into(),
    }
}

/// Evaluates a jq program against a JSON input, returning the program's
/// (first) emitted value.
pub trait JqRunner: Send + Sync {
    fn run(&self, program: &str, input: Value) -> Result<Value>;
}

/// Pure-Rust `jaq`-backed default [`JqRunner`].
#[derive(Debug, Default)]
pub struct JaqRunner;

impl JaqRunner {
    pub fn new() -> Self {
        Self
    }
}

impl JqRunner for JaqRunner {
    fn run(&self, program: &str, input: Value) -> Result<Value> {
        let arena = Arena::default();
        let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let modules = loader
            .load(&arena, File { code: program, path: () })
            .map_err(|errs| jq_error(format!("{errs:?}")))?;

        let filter = jaq_core::Compiler::<Val, jaq_core::compile::Native<Val>>::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errs| jq_error(format!("{errs:?}")))?;

        let inputs = RcIter::new(core::iter::empty());
        let ctx = Ctx::new([], &inputs);
        let mut outputs = filter.run((ctx, Val::from(input)));

        match outputs.next() {
            Some(Ok(val)) => Ok(Value::from(val)),
            Some(Err(e)) => Err(jq_error(e.to_string())),
            None => Err(jq_error("program produced no output")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_program() {
        let runner = JaqRunner::new();
        let out = runner.run(".", json!({"x": 1})).unwrap();
        assert_eq!(out, json!({"x": 1}));
    }

    #[test]
    fn field_projection() {
        let runner = JaqRunner::new();
        let out = runner.run(".x + 1", json!({"x": 1})).unwrap();
        assert_eq!(out, json!(2));
    }

    #[test]
    fn invalid_program_errors() {
        let runner = JaqRunner::new();
        let err = runner.run("this is not jq {{{", json!(null)).unwrap_err();
        assert!(matches!(err, NebulaError::JqError { .. }));
    }
}
