use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}

fn default_system_prompt() -> String {
    "You are squidbot, a personal AI assistant.".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

/// Top-level config (`config.toml` + `SQUIDBOT_*` env overrides), loaded
/// from the base directory resolved by `base_dir()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: default_system_prompt(),
            providers: ProvidersConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
    #[serde(default)]
    pub openai_compat: Vec<OpenAiCompatConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    pub name: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { enabled: false, interval_secs: default_heartbeat_interval() }
    }
}

fn default_heartbeat_interval() -> u64 {
    300
}

impl Config {
    /// Loads from `<base_dir>/config.toml` (or `SQUIDBOT_CONFIG` if set)
    /// layered under `SQUIDBOT_`-prefixed env vars, falling back to
    /// `Config::default()` entirely if no config file is present.
    pub fn load(base_dir: &std::path::Path) -> anyhow::Result<Self> {
        let path = std::env::var("SQUIDBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("config.toml"));

        let config: Config = Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SQUIDBOT_").split("_"))
            .extract()?;
        Ok(config)
    }
}

/// Resolves the base directory: `SQUIDBOT_HOME` if set, else `$HOME/.squidbot`.
pub fn base_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var("SQUIDBOT_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set and SQUIDBOT_HOME is not set"))?;
    Ok(PathBuf::from(home).join(".squidbot"))
}
