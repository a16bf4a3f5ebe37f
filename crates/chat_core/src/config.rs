//! Provider credential configuration.
//!
//! Loaded from `~/.parley/config.json`, then `config.toml` in the
//! working directory, then overridden by environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_FILE_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderKeys {
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
    #[serde(default)]
    pub google: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_keys: ProviderKeys,
}

fn parley_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".parley")
}

fn parley_config_json_path() -> PathBuf {
    parley_dir().join("config.json")
}

impl Config {
    pub fn new() -> Self {
        let mut config = Config::default();

        let mut loaded = false;
        let json_path = parley_config_json_path();
        if json_path.exists() {
            if let Ok(content) = std::fs::read_to_string(&json_path) {
                if let Ok(file_config) = serde_json::from_str::<Config>(&content) {
                    config = file_config;
                    loaded = true;
                }
            }
        }

        if !loaded && std::path::Path::new(CONFIG_FILE_PATH).exists() {
            if let Ok(content) = std::fs::read_to_string(CONFIG_FILE_PATH) {
                if let Ok(file_config) = toml::from_str::<Config>(&content) {
                    config = file_config;
                }
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.api_keys.openai = Some(key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.api_keys.anthropic = Some(key);
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            config.api_keys.google = Some(key);
        }

        config
    }

    /// Config with explicit keys, bypassing files and environment.
    pub fn with_keys(keys: ProviderKeys) -> Self {
        Self { api_keys: keys }
    }
}
