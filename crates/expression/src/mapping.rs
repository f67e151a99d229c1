//! `resolve_expr` / `resolve_inputs` / `apply_output_mapping`: the mapping
//! engine's three operations (spec §4.3), ported from
//! `wf_runtime.engine.mappings`.

use indexmap::IndexMap;
use serde_json::Value;

use nebula_error::{NebulaError, Result};

fn mapping_error(expr: impl Into<String>, reason: impl Into<String>) -> NebulaError {
    NebulaError::MappingError {
        expr: expr.into(),
        reason: reason.into(),
    }
}

fn get_path(root: &Value, path: &[&str], expr: &str, strict: bool) -> Result<Value> {
    let mut cur = root;
    for segment in path {
        match cur.get(segment) {
            Some(v) => cur = v,
            None => {
                if strict {
                    return Err(mapping_error(
                        expr,
                        format!("missing key '{segment}' while resolving path {}", path.join(".")),
                    ));
                }
                return Ok(Value::Null);
            }
        }
    }
    Ok(cur.clone())
}

/// Resolves a single expression value against `state`.
///
/// Non-string values, and strings that don't start with `$`, pass through
/// unchanged. `strict` controls what happens when a referenced key is
/// missing: an error in strict mode, `null` in lenient mode.
pub fn resolve_expr(state: &Value, expr: &Value, strict: bool) -> Result<Value> {
    let Value::String(s) = expr else {
        return Ok(expr.clone());
    };
    if !s.starts_with('$') {
        return Ok(expr.clone());
    }

    if s == "$input" {
        return Ok(state.get("input").cloned().unwrap_or(Value::Null));
    }

    if let Some(rest) = s.strip_prefix("$input.") {
        let path: Vec<&str> = rest.split('.').collect();
        let input = state.get("input").cloned().unwrap_or(Value::Null);
        return get_path(&input, &path, s, strict);
    }

    if let Some(rest) = s.strip_prefix("$nodes.") {
        let parts: Vec<&str> = rest.split('.').collect();
        let data = state.get("data");
        if parts.len() == 1 {
            return Ok(data.and_then(|d| d.get(parts[0])).cloned().unwrap_or(Value::Null));
        }
        let node_id = parts[0];
        let path = &parts[1..];
        let node_out = data.and_then(|d| d.get(node_id)).cloned().unwrap_or(Value::Null);
        return get_path(&node_out, path, s, strict);
    }

    if let Some(key) = s.strip_prefix("$state.") {
        return match state.get(key) {
            Some(v) => Ok(v.clone()),
            None if strict => Err(mapping_error(s.clone(), format!("missing state key: {key}"))),
            None => Ok(Value::Null),
        };
    }

    Err(mapping_error(s.clone(), format!("unsupported expression: {s}")))
}

/// Resolves every value in `input_mapping` against `state`, in declared
/// order.
pub fn resolve_inputs(
    state: &Value,
    input_mapping: &IndexMap<String, Value>,
    strict: bool,
) -> Result<IndexMap<String, Value>> {
    let mut resolved = IndexMap::with_capacity(input_mapping.len());
    for (k, v) in input_mapping {
        resolved.insert(k.clone(), resolve_expr(state, v, strict)?);
    }
    Ok(resolved)
}

/// Projects a raw node result into its output object following
/// `output_mapping`'s projection grammar (spec §3):
///   - empty mapping ⇒ the raw result, verbatim (need not be an object)
///   - `$result` / legacy `$tool_result` / `$jq_result` / `$code_result` ⇒
///     the raw result
///   - `$.a.b` ⇒ a dotted path into the raw result
///   - anything else ⇒ a literal, written through unchanged
pub fn apply_output_mapping(result: &Value, output_mapping: &IndexMap<String, Value>) -> Value {
    if output_mapping.is_empty() {
        return result.clone();
    }

    let mut out = serde_json::Map::with_capacity(output_mapping.len());
    for (out_key, spec) in output_mapping {
        let projected = match spec {
            Value::String(s)
                if s == "$result" || s == "$tool_result" || s == "$jq_result" || s == "$code_result" =>
            {
                result.clone()
            }
            Value::String(s) if s.starts_with("$.") => {
                let path: Vec<&str> = s[2..].split('.').collect();
                get_from_result(result, &path)
            }
            other => other.clone(),
        };
        out.insert(out_key.clone(), projected);
    }
    Value::Object(out)
}

fn get_from_result(result: &Value, path: &[&str]) -> Value {
    let mut cur = result;
    for segment in path {
        match cur.get(segment) {
            Some(v) => cur = v,
            None => return Value::Null,
        }
    }
    cur.clone()
}
