use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use nebula_core::NodeId;
use nebula_execution::{ErrorRecord, PartialStateUpdate};
use nebula_expression::{apply_output_mapping, resolve_inputs};
use nebula_workflow::{IoConfig, LlmNode, LlmPrompt, LlmPromptPartKind};
use serde_json::Value;

use crate::chat::{ChatMessage, ChatMessagePart, ChatMessagePartKind};
use crate::{Action, ActionContext};

pub struct LlmAction {
    id: NodeId,
    io: IoConfig,
    model: String,
    model_params: Value,
    prompt: LlmPrompt,
    output_schema: Option<Value>,
}

impl LlmAction {
    pub fn new(node: &LlmNode) -> Self {
        let model_params = Value::Object(node.model_params.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        let output_schema = node.output_schema.as_ref().map(|schema| {
            serde_json::to_value(schema).expect("LlmSchema always serializes")
        });
        Self {
            id: node.base.id.clone(),
            io: node.io.clone(),
            model: node.model.clone(),
            model_params,
            prompt: node.prompt.clone(),
            output_schema,
        }
    }
}

fn format_template(template: &str, vars: &IndexMap<String, Value>) -> Result<String, String> {
    let mut err = None;
    let re = regex::Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("static regex is valid");
    let formatted = re.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match vars.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                err = Some(format!("missing key for prompt template: '{name}'"));
                String::new()
            }
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(formatted.into_owned()),
    }
}

fn format_message(prompt: &LlmPrompt, inputs: &IndexMap<String, Value>) -> Result<ChatMessage, String> {
    match prompt {
        LlmPrompt::Text(template) => Ok(ChatMessage::Text(format_template(template, inputs)?)),
        LlmPrompt::Parts(parts) => {
            let mut formatted = Vec::with_capacity(parts.len());
            for part in parts {
                let kind = match part.kind {
                    LlmPromptPartKind::Text => ChatMessagePartKind::Text,
                    LlmPromptPartKind::ImageUrl => ChatMessagePartKind::ImageUrl,
                };
                formatted.push(ChatMessagePart {
                    kind,
                    content: format_template(&part.content, inputs)?,
                });
            }
            Ok(ChatMessage::Parts(formatted))
        }
    }
}

#[async_trait]
impl Action for LlmAction {
    fn node_id(&self) -> &NodeId {
        &self.id
    }

    async fn execute(&self, snapshot: &Value, ctx: &ActionContext) -> PartialStateUpdate {
        let error = |error_type: &str, reason: String| {
            PartialStateUpdate::node_error(ErrorRecord::new(self.id.as_str(), error_type, reason))
        };

        let Some(model) = ctx.chat_model.as_ref().map(Arc::clone) else {
            return error("missing_dependency", "chat model is not configured".to_string());
        };

        let inputs = match resolve_inputs(snapshot, &self.io.input_mapping, true) {
            Ok(inputs) => inputs,
            Err(e) => return error("llm_error", e.to_string()),
        };

        let message = match format_message(&self.prompt, &inputs) {
            Ok(m) => m,
            Err(e) => return error("prompt_format_error", e),
        };

        match model
            .invoke(&self.model, &self.model_params, message, self.output_schema.as_ref())
            .await
        {
            Ok(result) => {
                let outputs = apply_output_mapping(&result, &self.io.output_mapping);
                ctx.emit(&self.id, "llm", None);
                PartialStateUpdate::node_output(self.id.as_str(), outputs)
            }
            Err(e) => error("llm_error", e.to_string()),
        }
    }
}
