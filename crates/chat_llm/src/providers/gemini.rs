//! Google Gemini provider.
//!
//! Uses `streamGenerateContent` with `alt=sse`, where each SSE data
//! payload is a JSON generation chunk:
//!
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}]}
//! ```

use async_trait::async_trait;
use chat_core::context::ContextTurn;
use chat_core::message::Role;
use reqwest::Client;
use serde_json::{json, Value};

use super::common::sse::sse_delta_stream;
use crate::provider::{ChatError, ChatModel, ChatStream, Result, StreamDelta};

pub struct GeminiChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl GeminiChatModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-pro".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
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

/// Build a `generateContent` request body. Gemini has no image-by-URL
/// part in this API surface, and the factory only routes text-capable
/// context here, so only text blocks are sent.
pub fn build_gemini_request(
    context: &[ContextTurn],
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Value {
    let mut system_parts: Vec<Value> = Vec::new();
    let mut contents: Vec<Value> = Vec::new();

    for turn in context {
        let parts: Vec<Value> = turn
            .content
            .iter()
            .filter_map(|b| b.as_text())
            .map(|text| json!({ "text": text }))
            .collect();
        if parts.is_empty() {
            continue;
        }

        match turn.role {
            Role::System => system_parts.extend(parts),
            Role::Assistant => contents.push(json!({ "role": "model", "parts": parts })),
            Role::User | Role::Error => contents.push(json!({ "role": "user", "parts": parts })),
        }
    }

    let mut body = json!({ "contents": contents });

    if !system_parts.is_empty() {
        body["systemInstruction"] = json!({ "parts": system_parts });
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(temperature) = temperature {
        generation_config.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    body
}

/// Parse one Gemini SSE data payload into a delta, concatenating the
/// text of every part in the first candidate.
fn parse_gemini_sse_data(data: &str) -> Result<Option<StreamDelta>> {
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    let text: String = value["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(StreamDelta::new(text)))
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn stream(&self, context: &[ContextTurn]) -> Result<ChatStream> {
        let body = build_gemini_request(context, self.temperature, self.max_tokens);

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            if status == 401 || status == 403 {
                return Err(ChatError::Auth(format!("HTTP {}: {}", status, text)));
            }
            return Err(ChatError::Api(format!(
                "Gemini API error: HTTP {}: {}",
                status, text
            )));
        }

        Ok(sse_delta_stream(response, |frame| {
            parse_gemini_sse_data(frame.data)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::message::ContentBlock;

    #[test]
    fn assistant_turns_map_to_model_role() {
        let context = vec![
            ContextTurn {
                role: Role::User,
                content: vec![ContentBlock::text("hi")],
            },
            ContextTurn {
                role: Role::Assistant,
                content: vec![ContentBlock::text("hello")],
            },
        ];

        let body = build_gemini_request(&context, None, None);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn system_turns_become_system_instruction() {
        let context = vec![
            ContextTurn::system("be brief"),
            ContextTurn {
                role: Role::User,
                content: vec![ContentBlock::text("hi")],
            },
        ];

        let body = build_gemini_request(&context, Some(0.5), Some(256));
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parse_concatenates_candidate_parts() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#;
        let delta = parse_gemini_sse_data(data).unwrap().unwrap();
        assert_eq!(delta.content, "Hello");
    }

    #[test]
    fn parse_skips_metadata_chunks() {
        let data = r#"{"usageMetadata":{"totalTokenCount":5}}"#;
        assert!(parse_gemini_sse_data(data).unwrap().is_none());
        assert!(parse_gemini_sse_data("[DONE]").unwrap().is_none());
    }
}
