//! OpenAI chat-completions provider.

use async_trait::async_trait;
use chat_core::context::ContextTurn;
use chat_core::message::ContentBlock;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::common::sse::sse_delta_stream;
use super::wire_role;
use crate::provider::{ChatError, ChatModel, ChatStream, Result, StreamDelta};

pub struct OpenAIChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIChatModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sampling temperature on the provider's 0.0-1.0 scale.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Convert context turns to chat-completions `messages` JSON.
///
/// Text-only turns send a plain string; mixed turns use the content
/// parts array form.
pub fn turns_to_openai_json(context: &[ContextTurn]) -> Vec<Value> {
    context
        .iter()
        .map(|turn| {
            let role = wire_role(turn.role);
            let all_text = turn.content.iter().all(|b| b.as_text().is_some());

            if all_text {
                let text = turn
                    .content
                    .iter()
                    .filter_map(|b| b.as_text())
                    .collect::<Vec<_>>()
                    .join(" ");
                json!({ "role": role, "content": text })
            } else {
                let parts: Vec<Value> = turn
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => {
                            Some(json!({ "type": "text", "text": text }))
                        }
                        ContentBlock::ImageUrl { url } => {
                            Some(json!({ "type": "image_url", "image_url": { "url": url } }))
                        }
                        ContentBlock::Unknown => None,
                    })
                    .collect();
                json!({ "role": role, "content": parts })
            }
        })
        .collect()
}

fn build_request_body(model: &OpenAIChatModel, context: &[ContextTurn]) -> Value {
    let mut body = json!({
        "model": model.model,
        "messages": turns_to_openai_json(context),
        "stream": true,
    });
    if let Some(temperature) = model.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = model.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: DeltaContent,
}

#[derive(Debug, Deserialize, Default)]
struct DeltaContent {
    content: Option<String>,
}

/// Parse one chat-completions SSE data payload into a delta.
fn parse_stream_data(data: &str) -> Result<Option<StreamDelta>> {
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(trimmed)?;
    let content = chunk
        .choices
        .first()
        .and_then(|c| c.delta.content.as_deref())
        .unwrap_or_default();

    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(StreamDelta::new(content)))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn stream(&self, context: &[ContextTurn]) -> Result<ChatStream> {
        let body = build_request_body(self, context);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            if status == 401 || status == 403 {
                return Err(ChatError::Auth(format!("HTTP {}: {}", status, text)));
            }
            return Err(ChatError::Api(format!("HTTP {}: {}", status, text)));
        }

        Ok(sse_delta_stream(response, |frame| {
            parse_stream_data(frame.data)
        }))
    }
}
