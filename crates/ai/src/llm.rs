//! Language model client.
//!
//! `OpenAiClient` speaks the Chat Completions wire format, which OpenAI,
//! LM Studio and Ollama all serve under `<base_url>/chat/completions`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use wotpilot_tools::ToolSpec;

use crate::message::{ChatMessage, MessageContent, Role, ToolCall};

/// Default Chat Completions endpoint prefix.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Errors talking to the model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("model endpoint returned {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The response could not be understood
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// One non-streaming model turn.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation and the available tools, get the next
    /// assistant message back.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, LlmError>;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// OpenAI-compatible Chat Completions client.
pub struct OpenAiClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    http: Client,
}

impl OpenAiClient {
    /// Create a client for `model` at the default endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            temperature: Some(0.0),
            http: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Set the API key. Local endpoints usually need none.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Set the endpoint prefix, e.g. `http://localhost:1234/v1`.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the sampling temperature (`None` leaves it to the server).
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn message_json(message: &ChatMessage) -> Value {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let content = match (&message.content, message.role) {
            (MessageContent::Text(text), Role::Assistant) if text.is_empty() => Value::Null,
            _ => Value::String(message.text()),
        };

        let mut msg = json!({ "role": role, "content": content });

        if !message.tool_calls.is_empty() {
            let tool_calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string()
                        }
                    })
                })
                .collect();
            msg["tool_calls"] = Value::Array(tool_calls);
        }

        if let Some(id) = &message.tool_call_id {
            msg["tool_call_id"] = json!(id);
        }

        msg
    }

    fn build_request_body(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(Self::message_json).collect::<Vec<_>>(),
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        body
    }

    fn parse_reply(response: CompletionResponse) -> Result<ChatMessage, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        let mut tool_calls = Vec::new();
        for call in choice.message.tool_calls.unwrap_or_default() {
            let arguments = if call.function.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    LlmError::InvalidResponse(format!(
                        "arguments of {} are not JSON: {}",
                        call.function.name, e
                    ))
                })?
            };
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            });
        }

        Ok(ChatMessage::assistant_tool_calls(
            choice.message.content.unwrap_or_default(),
            tool_calls,
        ))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, LlmError> {
        let body = self.build_request_body(messages, tools);
        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "chat completion"
        );

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Self::parse_reply(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<CompletionToolCall>>,
}

#[derive(Debug, Deserialize)]
struct CompletionToolCall {
    id: String,
    function: CompletionFunction,
}

#[derive(Debug, Deserialize)]
struct CompletionFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
