//! `ChatModel`: the interface the `llm` node invokes, plus an
//! OpenAI-chat-completions-compatible default implementation gated behind
//! the `http-llm` feature.

use async_trait::async_trait;
use serde_json::Value;

use nebula_error::{NebulaError, Result};

fn llm_error(reason: impl Into<String>) -> NebulaError {
    NebulaError::LlmError {
        node_id: String::new(),
        reason: reason.into(),
    }
}

/// A single formatted chat message, built from a node's `prompt` field.
#[derive(Debug, Clone)]
pub enum ChatMessage {
    Text(String),
    Parts(Vec<ChatMessagePart>),
}

#[derive(Debug, Clone)]
pub struct ChatMessagePart {
    pub kind: ChatMessagePartKind,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessagePartKind {
    Text,
    ImageUrl,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Invokes the model with a single user message, returning its result
    /// as JSON: a string when no `output_schema` was declared, or a
    /// structured object when one was.
    async fn invoke(
        &self,
        model: &str,
        model_params: &Value,
        message: ChatMessage,
        output_schema: Option<&Value>,
    ) -> Result<Value>;
}

#[cfg(feature = "http-llm")]
#[derive(Debug)]
pub struct ReqwestChatModel {
    client: reqwest::Client,
    base_url: String,
    api_key_env: String,
}

#[cfg(feature = "http-llm")]
impl Default for ReqwestChatModel {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[cfg(feature = "http-llm")]
impl ReqwestChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(feature = "http-llm")]
fn message_to_content(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::Text(text) => Value::String(text.clone()),
        ChatMessage::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part.kind {
                    ChatMessagePartKind::Text => serde_json::json!({
                        "type": "text",
                        "text": part.content,
                    }),
                    ChatMessagePartKind::ImageUrl => serde_json::json!({
                        "type": "image_url",
                        "image_url": { "url": part.content },
                    }),
                })
                .collect(),
        ),
    }
}

#[cfg(feature = "http-llm")]
#[async_trait]
impl ChatModel for ReqwestChatModel {
    async fn invoke(
        &self,
        model: &str,
        model_params: &Value,
        message: ChatMessage,
        output_schema: Option<&Value>,
    ) -> Result<Value> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| NebulaError::MissingDependency {
                node_id: String::new(),
                reason: format!("{} is not set", self.api_key_env),
            })?;

        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), Value::String(model.to_string()));
        body.insert(
            "messages".to_string(),
            serde_json::json!([{ "role": "user", "content": message_to_content(&message) }]),
        );
        if let Some(schema) = output_schema {
            body.insert(
                "response_format".to_string(),
                serde_json::json!({
                    "type": "json_schema",
                    "json_schema": { "name": "node_output", "schema": schema },
                }),
            );
        }
        if let Value::Object(params) = model_params {
            for (k, v) in params {
                body.insert(k.clone(), v.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&Value::Object(body))
            .send()
            .await
            .map_err(|e| llm_error(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_error(format!("model API returned {status}: {text}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| llm_error(format!("failed to parse model response: {e}")))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .cloned()
            .ok_or_else(|| llm_error("model response missing choices[0].message.content"))?;

        match (output_schema, &content) {
            (Some(_), Value::String(text)) => serde_json::from_str(text)
                .map_err(|e| llm_error(format!("structured output was not valid JSON: {e}"))),
            _ => Ok(content),
        }
    }
}

#[cfg(all(test, feature = "http-llm"))]
mod tests {
    use super::*;

    #[test]
    fn text_message_becomes_plain_string_content() {
        let content = message_to_content(&ChatMessage::Text("hello".to_string()));
        assert_eq!(content, Value::String("hello".to_string()));
    }

    #[test]
    fn multimodal_message_becomes_part_array() {
        let content = message_to_content(&ChatMessage::Parts(vec![
            ChatMessagePart { kind: ChatMessagePartKind::Text, content: "hi".to_string() },
            ChatMessagePart { kind: ChatMessagePartKind::ImageUrl, content: "http://x/y.png".to_string() },
        ]));
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["image_url"]["url"], "http://x/y.png");
    }
}
