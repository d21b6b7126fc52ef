use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use squidbot_types::Role;

use crate::error::ProviderError;
use crate::provider::LlmProvider;
use crate::types::{ChatRequest, StreamEvent};

use super::sse::collect_sse_events;

/// Adapter for any OpenAI-compatible chat-completions endpoint (OpenAI
/// itself, or compatible gateways). One instance is one named model.
pub struct OpenAiCompatibleProvider {
    name: String,
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(name: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool | Role::ToolCall | Role::ToolResult => "tool",
        }
    }

    fn build_body(&self, req: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = req
            .messages
            .iter()
            .filter(|m| !m.role.is_internal_event())
            .map(|m| {
                let mut obj = json!({
                    "role": Self::role_str(m.role),
                    "content": m.content,
                });
                if let Some(id) = &m.tool_call_id {
                    obj["tool_call_id"] = json!(id);
                }
                obj
            })
            .collect();

        let tools: Vec<serde_json::Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": messages,
            "tools": tools,
            "stream": true,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_stream(&self, req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
        let body = self.build_body(req);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthFailed {
                model: self.model.clone(),
                message: "invalid or expired API key".to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited { retry_after_ms: 1000 });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status: status.as_u16(), message });
        }

        let byte_stream = response.bytes_stream();
        collect_sse_events(byte_stream, |data| {
            let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else {
                return;
            };
            let Some(choice) = event.get("choices").and_then(|c| c.get(0)) else {
                return;
            };

            if let Some(delta) = choice.get("delta") {
                if let Some(content) = delta.get("content").and_then(|v| v.as_str()) {
                    if !content.is_empty() {
                        let _ = tx.try_send(StreamEvent::TextDelta(content.to_string()));
                    }
                }
                if let Some(tool_calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
                    for call in tool_calls {
                        let id = call.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                        let function = call.get("function");
                        let name = function.and_then(|f| f.get("name")).and_then(|v| v.as_str()).map(str::to_string);
                        let arguments_fragment = function
                            .and_then(|f| f.get("arguments"))
                            .and_then(|v| v.as_str())
                            .map(str::to_string);
                        let _ = tx.try_send(StreamEvent::ToolCallDelta { id, name, arguments_fragment });
                    }
                }
            }

            if let Some(stop_reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
                let _ = tx.try_send(StreamEvent::Done { stop_reason: stop_reason.to_string() });
            }
        })
        .await
    }
}
