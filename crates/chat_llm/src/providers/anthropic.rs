//! Anthropic Messages API provider.

use async_trait::async_trait;
use chat_core::context::ContextTurn;
use chat_core::message::{ContentBlock, Role};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::common::sse::sse_delta_stream;
use crate::provider::{ChatError, ChatModel, ChatStream, Result, StreamDelta};

/// Anthropic requires max_tokens on every request.
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: u32,
}

impl AnthropicChatModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-sonnet-20240229".to_string(),
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
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
        self.max_tokens = max_tokens;
        self
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        use reqwest::header::{HeaderValue, CONTENT_TYPE};

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| ChatError::Auth(format!("Invalid API key: {}", e)))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }
}

fn blocks_to_anthropic_json(blocks: &[ContentBlock]) -> Vec<Value> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(json!({ "type": "text", "text": text })),
            ContentBlock::ImageUrl { url } => Some(json!({
                "type": "image",
                "source": { "type": "url", "url": url },
            })),
            ContentBlock::Unknown => None,
        })
        .collect()
}

/// Build a Messages API request body. System turns are lifted into the
/// top-level `system` field; everything else keeps conversation order.
pub fn build_anthropic_request(
    context: &[ContextTurn],
    model: &str,
    max_tokens: u32,
    temperature: Option<f32>,
) -> Value {
    let mut system = String::new();
    let mut messages = Vec::new();

    for turn in context {
        match turn.role {
            Role::System => {
                for block in &turn.content {
                    if let Some(text) = block.as_text() {
                        if !system.is_empty() {
                            system.push('\n');
                        }
                        system.push_str(text);
                    }
                }
            }
            Role::Assistant => messages.push(json!({
                "role": "assistant",
                "content": blocks_to_anthropic_json(&turn.content),
            })),
            Role::User | Role::Error => messages.push(json!({
                "role": "user",
                "content": blocks_to_anthropic_json(&turn.content),
            })),
        }
    }

    let mut body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "stream": true,
        "messages": messages,
    });
    if !system.is_empty() {
        body["system"] = json!(system);
    }
    if let Some(temperature) = temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    delta: TextDelta,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    text: Option<String>,
}

/// Parse one Messages API SSE event into a delta. Only
/// `content_block_delta` events carry text; everything else
/// (message_start, ping, message_stop, ...) is skipped.
fn parse_anthropic_sse_event(event: &str, data: &str) -> Result<Option<StreamDelta>> {
    match event {
        "content_block_delta" => {
            let parsed: ContentBlockDelta = serde_json::from_str(data)?;
            match parsed.delta.text {
                Some(text) if !text.is_empty() => Ok(Some(StreamDelta::new(text))),
                _ => Ok(None),
            }
        }
        "error" => Err(ChatError::Api(format!("Anthropic stream error: {}", data))),
        _ => Ok(None),
    }
}

#[async_trait]
impl ChatModel for AnthropicChatModel {
    async fn stream(&self, context: &[ContextTurn]) -> Result<ChatStream> {
        let body = build_anthropic_request(context, &self.model, self.max_tokens, self.temperature);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;

            if status == 401 || status == 403 {
                return Err(ChatError::Auth(format!(
                    "Anthropic authentication failed: {}. Please check your API key.",
                    text
                )));
            }

            return Err(ChatError::Api(format!(
                "Anthropic API error: HTTP {}: {}",
                status, text
            )));
        }

        Ok(sse_delta_stream(response, |frame| {
            parse_anthropic_sse_event(frame.event, frame.data)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_turns_lift_into_system_field() {
        let context = vec![
            ContextTurn::system("be helpful"),
            ContextTurn {
                role: Role::User,
                content: vec![ContentBlock::text("hi")],
            },
        ];

        let body = build_anthropic_request(&context, "claude-3-sonnet-20240229", 1024, None);
        assert_eq!(body["system"], "be helpful");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn temperature_is_optional() {
        let context = vec![ContextTurn {
            role: Role::User,
            content: vec![ContentBlock::text("hi")],
        }];

        let body = build_anthropic_request(&context, "m", 100, None);
        assert!(body.get("temperature").is_none());

        let body = build_anthropic_request(&context, "m", 100, Some(0.7));
        assert_eq!(body["temperature"], 0.7);
    }

    #[test]
    fn parse_extracts_text_deltas_only() {
        let delta = parse_anthropic_sse_event(
            "content_block_delta",
            r#"{"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(delta.content, "Hi");

        assert!(parse_anthropic_sse_event("ping", "{}").unwrap().is_none());
        assert!(parse_anthropic_sse_event("message_stop", "{}")
            .unwrap()
            .is_none());
    }

    #[test]
    fn parse_surfaces_error_events() {
        let err =
            parse_anthropic_sse_event("error", r#"{"error":{"message":"overloaded"}}"#).unwrap_err();
        assert!(matches!(err, ChatError::Api(_)));
    }
}
