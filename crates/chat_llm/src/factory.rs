//! Chat model factory.
//!
//! The single mapping point from logical model names to concrete
//! provider clients. Unknown names fail fast with
//! [`ChatError::UnknownModel`]; nothing is resolved silently.

use std::sync::Arc;
use std::time::Duration;

use chat_core::budget::TokenizerFamily;
use chat_core::config::Config;
use chat_core::message::LlmSettings;

use crate::provider::{ChatError, ChatModel, Result};
use crate::providers::{AnthropicChatModel, GeminiChatModel, OpenAIChatModel};

/// Logical model names accepted on the wire.
pub const AVAILABLE_MODELS: &[&str] = &[
    "GPT-4",
    "Claude Opus",
    "Claude Sonnet",
    "Claude Haiku",
    "Gemini Pro",
];

/// Default provider connect timeout. Applies to connection
/// establishment only, never to overall stream duration.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
}

struct ModelSpec {
    provider: Provider,
    model_id: &'static str,
    vision: bool,
    family: TokenizerFamily,
}

fn catalog(logical_name: &str) -> Option<ModelSpec> {
    match logical_name {
        "GPT-4" => Some(ModelSpec {
            provider: Provider::OpenAI,
            model_id: "gpt-4-turbo",
            vision: true,
            family: TokenizerFamily::Gpt,
        }),
        "Claude Opus" => Some(ModelSpec {
            provider: Provider::Anthropic,
            model_id: "claude-3-opus-20240229",
            vision: true,
            family: TokenizerFamily::Claude,
        }),
        "Claude Sonnet" => Some(ModelSpec {
            provider: Provider::Anthropic,
            model_id: "claude-3-sonnet-20240229",
            vision: true,
            family: TokenizerFamily::Claude,
        }),
        "Claude Haiku" => Some(ModelSpec {
            provider: Provider::Anthropic,
            model_id: "claude-3-haiku-20240307",
            vision: true,
            family: TokenizerFamily::Claude,
        }),
        "Gemini Pro" => Some(ModelSpec {
            provider: Provider::Gemini,
            model_id: "gemini-pro",
            vision: false,
            family: TokenizerFamily::Gemini,
        }),
        _ => None,
    }
}

/// Resolution seam between the turn pipeline and concrete providers.
pub trait ModelResolver: Send + Sync {
    /// Resolve a logical model name plus per-call settings to a
    /// streaming client.
    fn resolve(&self, settings: &LlmSettings) -> Result<Arc<dyn ChatModel>>;

    /// Whether image blocks may be sent to this logical model.
    /// Unknown names are treated as non-vision; resolution will reject
    /// them anyway.
    fn vision_capable(&self, logical_name: &str) -> bool;

    /// Tokenizer family for budget estimation.
    fn tokenizer_family(&self, logical_name: &str) -> TokenizerFamily;
}

/// Maps logical model names to provider + model id + credential.
pub struct ChatModelFactory {
    config: Config,
    connect_timeout: Duration,
}

impl ChatModelFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn is_known(logical_name: &str) -> bool {
        catalog(logical_name).is_some()
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(ChatError::Http)
    }

    fn require_key(key: &Option<String>, provider: &str) -> Result<String> {
        key.as_deref()
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ChatError::Auth(format!("{} API key is required", provider)))
    }
}

/// Wire temperature is a 0-100 percent scale; providers take 0.0-1.0.
fn provider_temperature(settings: &LlmSettings) -> Option<f32> {
    settings
        .temperature
        .map(|t| (t / 100.0).clamp(0.0, 1.0))
}

impl ModelResolver for ChatModelFactory {
    fn resolve(&self, settings: &LlmSettings) -> Result<Arc<dyn ChatModel>> {
        let spec = catalog(&settings.model)
            .ok_or_else(|| ChatError::UnknownModel(settings.model.clone()))?;

        let client = self.http_client()?;
        let temperature = provider_temperature(settings);

        match spec.provider {
            Provider::OpenAI => {
                let key = Self::require_key(&self.config.api_keys.openai, "OpenAI")?;
                let mut model = OpenAIChatModel::new(key)
                    .with_client(client)
                    .with_model(spec.model_id);
                if let Some(temperature) = temperature {
                    model = model.with_temperature(temperature);
                }
                Ok(Arc::new(model))
            }
            Provider::Anthropic => {
                let key = Self::require_key(&self.config.api_keys.anthropic, "Anthropic")?;
                let mut model = AnthropicChatModel::new(key)
                    .with_client(client)
                    .with_model(spec.model_id);
                if let Some(temperature) = temperature {
                    model = model.with_temperature(temperature);
                }
                Ok(Arc::new(model))
            }
            Provider::Gemini => {
                let key = Self::require_key(&self.config.api_keys.google, "Gemini")?;
                let mut model = GeminiChatModel::new(key)
                    .with_client(client)
                    .with_model(spec.model_id);
                if let Some(temperature) = temperature {
                    model = model.with_temperature(temperature);
                }
                Ok(Arc::new(model))
            }
        }
    }

    fn vision_capable(&self, logical_name: &str) -> bool {
        catalog(logical_name).map(|s| s.vision).unwrap_or(false)
    }

    fn tokenizer_family(&self, logical_name: &str) -> TokenizerFamily {
        catalog(logical_name)
            .map(|s| s.family)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::config::ProviderKeys;

    fn config_with_all_keys() -> Config {
        Config::with_keys(ProviderKeys {
            openai: Some("sk-test".to_string()),
            anthropic: Some("sk-ant-test".to_string()),
            google: Some("AIza-test".to_string()),
        })
    }

    fn settings(model: &str) -> LlmSettings {
        LlmSettings::new(model)
    }

    #[test]
    fn resolves_every_catalog_entry() {
        let factory = ChatModelFactory::new(config_with_all_keys());
        for name in AVAILABLE_MODELS {
            assert!(
                factory.resolve(&settings(name)).is_ok(),
                "failed to resolve {name}"
            );
        }
    }

    #[test]
    fn unknown_model_fails_loudly() {
        let factory = ChatModelFactory::new(config_with_all_keys());
        let Err(err) = factory.resolve(&settings("GPT-9000")) else {
            panic!("expected resolution to fail");
        };
        match err {
            ChatError::UnknownModel(name) => assert_eq!(name, "GPT-9000"),
            other => panic!("expected UnknownModel, got {other:?}"),
        }
    }

    #[test]
    fn missing_key_is_an_auth_error() {
        let factory = ChatModelFactory::new(Config::default());
        let Err(err) = factory.resolve(&settings("GPT-4")) else {
            panic!("expected resolution to fail");
        };
        match err {
            ChatError::Auth(msg) => assert!(msg.contains("OpenAI")),
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn empty_key_is_an_auth_error() {
        let factory = ChatModelFactory::new(Config::with_keys(ProviderKeys {
            anthropic: Some(String::new()),
            ..ProviderKeys::default()
        }));
        assert!(matches!(
            factory.resolve(&settings("Claude Haiku")),
            Err(ChatError::Auth(_))
        ));
    }

    #[test]
    fn vision_capability_follows_catalog() {
        let factory = ChatModelFactory::new(Config::default());
        assert!(factory.vision_capable("GPT-4"));
        assert!(factory.vision_capable("Claude Opus"));
        assert!(!factory.vision_capable("Gemini Pro"));
        assert!(!factory.vision_capable("made-up"));
    }

    #[test]
    fn temperature_converts_from_percent_scale() {
        let mut s = settings("GPT-4");
        s.temperature = Some(70.0);
        assert_eq!(provider_temperature(&s), Some(0.7));

        s.temperature = Some(250.0);
        assert_eq!(provider_temperature(&s), Some(1.0));

        s.temperature = None;
        assert_eq!(provider_temperature(&s), None);
    }
}
