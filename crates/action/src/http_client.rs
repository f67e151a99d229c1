//! `HttpClient`: the interface the `http_request` node issues requests
//! through, plus a `reqwest`-backed default implementation gated behind the
//! `http-llm` feature.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use nebula_error::{NebulaError, Result};

fn http_error(reason: impl Into<String>) -> NebulaError {
    NebulaError::HttpRequestError {
        node_id: String::new(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub method: String,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub query: Option<Value>,
    pub json_body: Option<Value>,
    pub timeout_s: f64,
}

#[derive(Debug, Clone)]
pub struct HttpResponseSpec {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, spec: HttpRequestSpec) -> Result<HttpResponseSpec>;
}

#[cfg(feature = "http-llm")]
#[derive(Debug, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

#[cfg(feature = "http-llm")]
impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "http-llm")]
#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, spec: HttpRequestSpec) -> Result<HttpResponseSpec> {
        let method = reqwest::Method::from_bytes(spec.method.as_bytes())
            .map_err(|e| http_error(format!("invalid HTTP method '{}': {e}", spec.method)))?;

        let mut builder = self
            .client
            .request(method, &spec.url)
            .timeout(std::time::Duration::from_secs_f64(spec.timeout_s.max(0.0)));

        for (k, v) in &spec.headers {
            builder = builder.header(k, v);
        }
        if let Some(query) = &spec.query {
            builder = builder.query(&flatten_query(query));
        }
        if let Some(json_body) = &spec.json_body {
            builder = builder.json(json_body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| http_error(format!("request to {} failed: {e}", spec.url)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| http_error(format!("failed reading response body: {e}")))?
            .to_vec();

        Ok(HttpResponseSpec { status, headers, content_type, body })
    }
}

#[cfg(feature = "http-llm")]
fn flatten_query(query: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = query else {
        return Vec::new();
    };
    map.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}
