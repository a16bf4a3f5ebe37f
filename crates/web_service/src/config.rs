//! Service configuration, loaded from environment variables with
//! fallback to defaults.

use std::time::Duration;

/// Runtime settings for the turn pipeline.
///
/// Environment variables:
/// - `TITLE_MODEL`: logical model name used for title generation (default: "GPT-4")
/// - `LLM_CONNECT_TIMEOUT_SECS`: provider connect timeout in seconds (default: 10)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub title_model: String,
    pub llm_connect_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            title_model: "GPT-4".to_string(),
            llm_connect_timeout: Duration::from_secs(10),
        }
    }
}

pub fn load_service_config() -> ServiceConfig {
    ServiceConfig {
        title_model: std::env::var("TITLE_MODEL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "GPT-4".to_string()),
        llm_connect_timeout: Duration::from_secs(
            std::env::var("LLM_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_has_sensible_defaults() {
        let config = ServiceConfig::default();
        assert!(!config.title_model.is_empty());
        assert!(config.llm_connect_timeout.as_secs() > 0);
    }
}
