//! JSON Schema (Draft 7) validation gate.
//!
//! Used at the workflow's input and output boundaries: before a run starts,
//! the input object is validated against the workflow's declared input
//! schema; after `end` projects the final output, it is validated against
//! the declared output schema (if any).

use nebula_error::{NebulaError, Result};
use nebula_workflow::JsonSchema;
use serde_json::Value;

fn invalid_schema(path: &str, reason: impl std::fmt::Display) -> NebulaError {
    NebulaError::InvalidSchema {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn build_validator(schema: &Value) -> Result<jsonschema::Validator> {
    jsonschema::options()
        .with_draft(jsonschema::Draft::Draft7)
        .build(schema)
        .map_err(|e| invalid_schema("", e))
}

/// Fails with [`NebulaError::InvalidSchema`] if `schema` is not itself a
/// well-formed Draft 7 schema.
pub fn check_schema(schema: &JsonSchema) -> Result<()> {
    build_validator(&schema.to_value()).map(|_| ())
}

/// Validates `instance` against `schema`, checking the schema definition
/// first. Fails with [`NebulaError::SchemaValidation`] carrying a dotted
/// instance path and a dotted schema path on the first violation.
pub fn validate(instance: &Value, schema: &JsonSchema) -> Result<()> {
    let schema_value = schema.to_value();
    let validator = build_validator(&schema_value)?;

    if let Err(err) = validator.validate(instance) {
        let instance_path = json_pointer_to_dotted(&err.instance_path.to_string());
        let schema_path = json_pointer_to_dotted(&err.schema_path.to_string());
        return Err(NebulaError::SchemaValidation {
            path: instance_path,
            reason: format!("{err}{}", schema_path_suffix(&schema_path)),
        });
    }
    Ok(())
}

/// A record describing whether `instance` validated, without raising.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub error: Option<String>,
}

/// Non-throwing variant of [`validate`].
pub fn validate_safe(instance: &Value, schema: &JsonSchema) -> ValidationOutcome {
    match validate(instance, schema) {
        Ok(()) => ValidationOutcome {
            ok: true,
            error: None,
        },
        Err(e) => ValidationOutcome {
            ok: false,
            error: Some(e.to_string()),
        },
    }
}

fn json_pointer_to_dotted(pointer: &str) -> String {
    pointer
        .trim_start_matches('/')
        .replace('/', ".")
}

fn schema_path_suffix(schema_path: &str) -> String {
    if schema_path.is_empty() {
        String::new()
    } else {
        format!(" (schema_path: {schema_path})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn valid_instance_passes() {
        let schema = JsonSchema::Schema(json!({"type": "object", "properties": {"x": {"type": "integer"}}, "required": ["x"]}));
        assert!(validate(&json!({"x": 1}), &schema).is_ok());
    }

    #[test]
    fn invalid_instance_fails_with_path() {
        let schema = JsonSchema::Schema(json!({
            "type": "object",
            "properties": {"x": {"type": "integer"}},
            "required": ["x"]
        }));
        let err = validate(&json!({"x": "not a number"}), &schema).unwrap_err();
        match err {
            NebulaError::SchemaValidation { path, .. } => assert_eq!(path, "x"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shorthand_schema_expands_to_type() {
        let schema = JsonSchema::Shorthand("string".to_string());
        assert!(validate(&json!("hello"), &schema).is_ok());
        assert!(validate(&json!(1), &schema).is_err());
    }

    #[test]
    fn invalid_schema_definition_rejected() {
        let schema = JsonSchema::Schema(json!({"type": "not-a-real-type"}));
        assert!(check_schema(&schema).is_err());
    }

    #[test]
    fn validate_safe_does_not_raise() {
        let schema = JsonSchema::object();
        let outcome = validate_safe(&json!(42), &schema);
        assert!(outcome.ok);
    }

    proptest! {
        #[test]
        fn integer_bound_schema_never_panics_on_arbitrary_input(n: i64) {
            let schema = JsonSchema::Schema(json!({"type": "integer", "minimum": 0, "maximum": 1000}));
            let outcome = validate_safe(&json!(n), &schema);
            prop_assert_eq!(outcome.ok, (0..=1000).contains(&n));
        }
    }
}
