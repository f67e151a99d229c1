//! Parsing a workflow description (JSON or YAML) into a validated
//! [`Workflow`].

use serde_json::{Map, Value};

use nebula_error::{NebulaError, Result};

use crate::model::Workflow;
use crate::validate;

fn invalid(reason: impl Into<String>) -> NebulaError {
    NebulaError::InvalidWorkflow {
        reason: reason.into(),
    }
}

/// Parse and structurally validate a workflow already decoded as
/// [`serde_json::Value`] (e.g. by a YAML front end).
pub fn parse(mut raw: Value) -> Result<Workflow> {
    require_top_level_fields(&raw)?;
    normalize_llm_prompts(&mut raw);

    let workflow: Workflow =
        serde_json::from_value(raw).map_err(|e| invalid(format!("malformed workflow: {e}")))?;

    validate::validate(&workflow)?;
    Ok(workflow)
}

/// Parse a workflow from a JSON document.
pub fn from_json(src: &str) -> Result<Workflow> {
    let raw: Value = serde_json::from_str(src).map_err(|e| invalid(e.to_string()))?;
    parse(raw)
}

/// Parse a workflow from a YAML document.
pub fn from_yaml(src: &str) -> Result<Workflow> {
    let raw: Value = serde_yaml::from_str(src).map_err(|e| invalid(e.to_string()))?;
    parse(raw)
}

fn require_top_level_fields(raw: &Value) -> Result<()> {
    let obj = raw
        .as_object()
        .ok_or_else(|| invalid("workflow must be a JSON/YAML object"))?;

    for field in ["id", "version", "input", "output"] {
        if !obj.contains_key(field) {
            return Err(invalid(format!("workflow must have an '{field}' section")));
        }
    }
    Ok(())
}

/// Rewrites every `llm` node's `prompt` field into the canonical
/// `{type, content}` part list, accepting:
///   - legacy 2-tuples/2-lists: `["text", "..."]`
///   - OpenAI-shaped objects: `{"type":"text","text":"..."}`,
///     `{"type":"image_url","image_url":{"url":"..."}}` or `{"url":"..."}`
/// A plain string prompt, or a list already in canonical form, passes
/// through unchanged.
fn normalize_llm_prompts(raw: &mut Value) {
    let Some(nodes) = raw.get_mut("nodes").and_then(Value::as_array_mut) else {
        return;
    };

    for node in nodes {
        let Some(obj) = node.as_object_mut() else {
            continue;
        };
        if obj.get("kind").and_then(Value::as_str) != Some("llm") {
            continue;
        }
        let Some(Value::Array(parts)) = obj.get_mut("prompt") else {
            continue;
        };

        for part in parts.iter_mut() {
            if let Some(normalized) = normalize_prompt_part(part) {
                *part = normalized;
            }
        }
    }
}

fn normalize_prompt_part(part: &Value) -> Option<Value> {
    if let Value::Array(pair) = part {
        if pair.len() == 2 {
            let kind = pair[0].as_str()?;
            let content = pair[1].clone();
            return Some(canonical_part(kind, content));
        }
        return None;
    }

    let obj = part.as_object()?;
    if obj.contains_key("type") && obj.contains_key("content") {
        return None; // already canonical
    }

    let kind = obj.get("type").and_then(Value::as_str)?;
    match kind {
        "text" => {
            let text = obj.get("text")?.clone();
            Some(canonical_part("text", text))
        }
        "image_url" => {
            if let Some(url) = obj.get("url") {
                return Some(canonical_part("image_url", url.clone()));
            }
            let url = obj.get("image_url").and_then(Value::as_object)?.get("url")?;
            Some(canonical_part("image_url", url.clone()))
        }
        _ => None,
    }
}

fn canonical_part(kind: &str, content: Value) -> Value {
    let mut map = Map::with_capacity(2);
    map.insert("type".to_string(), Value::String(kind.to_string()));
    map.insert("content".to_string(), content);
    Value::Object(map)
}
