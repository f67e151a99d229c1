use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use nebula_core::NodeId;
use nebula_execution::{ErrorRecord, PartialStateUpdate};
use nebula_expression::{apply_output_mapping, resolve_inputs};
use nebula_workflow::{HttpRequestNode, IoConfig};
use serde_json::{json, Map, Value};

use crate::http_client::{HttpClient, HttpRequestSpec};
use crate::{Action, ActionContext};

const RESERVED_KEYS: [&str; 3] = ["url", "method", "headers"];

pub struct HttpRequestAction {
    id: NodeId,
    io: IoConfig,
    timeout_s: f64,
}

impl HttpRequestAction {
    pub fn new(node: &HttpRequestNode) -> Self {
        Self {
            id: node.base.id.clone(),
            io: node.io.clone(),
            timeout_s: node.timeout_s,
        }
    }
}

fn template_var_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("static regex is valid"))
}

fn display_var(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// A small subset of Python's `str.format(**vars)`: replaces `{name}` with
/// the stringified value of `vars["name"]`.
fn format_template(template: &str, vars: &IndexMap<String, Value>) -> Result<String, String> {
    let mut err = None;
    let formatted = template_var_pattern().replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match vars.get(name) {
            Some(v) => display_var(v),
            None => {
                err = Some(format!("missing key '{name}' in template"));
                String::new()
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(formatted.into_owned()),
    }
}

fn deep_format(value: &Value, vars: &IndexMap<String, Value>) -> Result<Value, String> {
    match value {
        Value::String(s) => Ok(Value::String(format_template(s, vars)?)),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), deep_format(v, vars)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(deep_format(item, vars)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn parse_response_body(body: &[u8], content_type: &str) -> Value {
    let mut out = Map::new();
    out.insert("body_bytes_len".to_string(), json!(body.len()));

    let ct = content_type.to_lowercase();
    let looks_json = ct.contains("application/json") || ct.ends_with("+json");

    if looks_json {
        if let Ok(text) = std::str::from_utf8(body) {
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                out.insert("body_json".to_string(), parsed);
                return Value::Object(out);
            }
        }
    }

    match std::str::from_utf8(body) {
        Ok(text) => {
            out.insert("body_text".to_string(), json!(text));
        }
        Err(_) => {
            out.insert("body_b64".to_string(), json!(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, body)));
        }
    }
    Value::Object(out)
}

#[async_trait]
impl Action for HttpRequestAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        let error = |error_type: &str, reason: String| {
            PartialStateUpdate::node_error(ErrorRecord::new(self.id.as_str(), error_type, reason))
        };

        let Some(client) = ctx.http_client.as_ref().map(Arc::clone) else {
            return error("missing_dependency", "HTTP client is not configured".to_string());
        };

        let inputs = match resolve_inputs(snapshot, &self.io.input_mapping, true) {
            Ok(inputs) => inputs,
            Err(e) => return error("http_request_error", e.to_string()),
        };

        let url_template = match inputs.get("url") {
            Some(Value::String(s)) => s.clone(),
            other => {
                return error(
                    "http_request_error",
                    format!("url must resolve to a string, got: {other:?}"),
                )
            }
        };
        let url = match format_template(&url_template, &inputs) {
            Ok(u) => u,
            Err(e) => return error("http_request_error", e),
        };

        let method = inputs
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("GET")
            .to_uppercase();

        let headers: IndexMap<String, String> = match inputs.get("headers") {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), display_var(v))).collect(),
            _ => IndexMap::new(),
        };

        let mut body = Map::new();
        for (k, v) in &inputs {
            if !RESERVED_KEYS.contains(&k.as_str()) {
                match deep_format(v, &inputs) {
                    Ok(formatted) => {
                        body.insert(k.clone(), formatted);
                    }
                    Err(e) => return error("http_request_error", e),
                }
            }
        }
        let body_value = if body.is_empty() { None } else { Some(Value::Object(body)) };

        let (query, json_body) = if method == "GET" || method == "DELETE" {
            (body_value, None)
        } else {
            (None, body_value)
        };

        let spec = HttpRequestSpec {
            method,
            url: url.clone(),
            headers,
            query,
            json_body,
            timeout_s: self.timeout_s,
        };

        let response = match client.execute(spec).await {
            Ok(r) => r,
            Err(e) => return error("http_request_error", e.to_string()),
        };

        let ok = (200..300).contains(&response.status);
        let mut result = Map::new();
        result.insert("ok".to_string(), json!(ok));
        result.insert("status".to_string(), json!(response.status));
        result.insert("headers".to_string(), json!(response.headers));
        if let Value::Object(parsed) = parse_response_body(&response.body, &response.content_type) {
            result.extend(parsed);
        }
        let result = Value::Object(result);

        if !ok {
            return PartialStateUpdate::node_error(
                ErrorRecord::new(self.id.as_str(), "http_request_error", format!("HTTP {} for {url}", response.status))
                    .with_details(result),
            );
        }

        let outputs = apply_output_mapping(&result, &self.io.output_mapping);
        ctx.emit(&self.id, "http_request", None);
        PartialStateUpdate::node_output(self.id.as_str(), outputs)
    }
}
