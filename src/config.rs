use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Instruction prefix used until a client replaces it via the API.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "Congress shall make no law respecting an establishment of religion, or prohibiting the free exercise thereof; or abridging the freedom of speech, or of the press; or the right of the people peaceably to assemble, and to petition the Government for a redress of grievances.";

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Sampling temperature applied when a request omits one
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,

    /// Default system message loaded at startup; mutable via the API,
    /// never persisted back
    #[serde(default = "default_system_message")]
    pub default_system_message: String,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_temperature() -> f64 {
    0.1
}

fn default_system_message() -> String {
    DEFAULT_SYSTEM_MESSAGE.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            default_temperature: default_temperature(),
            default_system_message: default_system_message(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Gateway port (default: 8080)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

// ── Session store ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend: "redis" (default) or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Redis connection URL
    #[serde(default = "default_store_url")]
    pub url: String,
}

fn default_store_backend() -> String {
    "redis".into()
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379/0".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
        }
    }
}

// ── Generation backend ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend: "ollama" (default) or "openai"
    #[serde(default = "default_llm_backend")]
    pub backend: String,
    /// Base URL override (defaults per backend)
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key for hosted backends; env overrides take precedence
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name sent to the backend
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Hard deadline for one generation call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Admission limit on in-flight generation calls
    #[serde(default = "default_max_concurrent_generations")]
    pub max_concurrent_generations: usize,
}

fn default_llm_backend() -> String {
    "ollama".into()
}

fn default_llm_model() -> String {
    "llama3.2".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_concurrent_generations() -> usize {
    8
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            base_url: None,
            api_key: None,
            model: default_llm_model(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_generations: default_max_concurrent_generations(),
        }
    }
}

// ── Loading / persistence ────────────────────────────────────────

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let promptgate_dir = home.join(".promptgate");
        let config_path = promptgate_dir.join("config.toml");

        if !promptgate_dir.exists() {
            fs::create_dir_all(&promptgate_dir)
                .context("Failed to create .promptgate directory")?;
        }

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self {
                config_path: config_path.clone(),
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Load from an explicit path (no init-on-missing).
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config =
            toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // API key: PROMPTGATE_API_KEY or API_KEY
        if let Ok(key) = std::env::var("PROMPTGATE_API_KEY").or_else(|_| std::env::var("API_KEY")) {
            if !key.is_empty() {
                self.llm.api_key = Some(key);
            }
        }

        // Redis URL: PROMPTGATE_REDIS_URL
        if let Ok(url) = std::env::var("PROMPTGATE_REDIS_URL") {
            if !url.is_empty() {
                self.store.url = url;
            }
        }

        // Model: PROMPTGATE_MODEL
        if let Ok(model) = std::env::var("PROMPTGATE_MODEL") {
            if !model.is_empty() {
                self.llm.model = model;
            }
        }

        // Gateway port: PROMPTGATE_GATEWAY_PORT or PORT
        if let Ok(port_str) =
            std::env::var("PROMPTGATE_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
        {
            if let Ok(port) = port_str.parse::<u16>() {
                self.gateway.port = port;
            }
        }
    }
}
