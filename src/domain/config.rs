//! # Configuration
//!
//! Loads the application configuration from an optional YAML file (`data/config.yaml`)
//! and layers environment variables on top. The two API tokens are required; everything
//! else has a default.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:1337/api/";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
}

/// Strapi connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    /// Per-request timeout. A timeout counts as a transient failure and is retried.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            token: String::new(),
            timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    100
}

/// Backoff settings for transient network failures.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    #[serde(default)]
    pub initial_delay_secs: f64,
    #[serde(default = "default_backoff")]
    pub backoff: f64,
    #[serde(default = "default_jitter")]
    pub jitter_secs: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,
    /// `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 0.0,
            backoff: default_backoff(),
            jitter_secs: default_jitter(),
            max_delay_secs: default_max_delay(),
            max_attempts: None,
        }
    }
}

fn default_backoff() -> f64 {
    2.0
}
fn default_jitter() -> f64 {
    1.0
}
fn default_max_delay() -> f64 {
    3600.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Chat that receives log records. Unset disables the Telegram sink.
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
    /// Bot used for the sink; falls back to the main bot token.
    #[serde(default)]
    pub telegram_token: Option<String>,
    #[serde(default = "default_log_level")]
    pub telegram_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            telegram_chat_id: None,
            telegram_token: None,
            telegram_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> String {
    "bot.log".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Session file name, relative to the data directory.
    #[serde(default = "default_state_file")]
    pub file: String,
    /// When present, sessions live in Redis instead of the file.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: default_state_file(),
            redis: None,
        }
    }
}

fn default_state_file() -> String {
    "state.json".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RedisConfig {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db: i64,
}

fn default_redis_port() -> u16 {
    6379
}

#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Stop the bot on the first unhandled error so a supervisor can restart it.
    #[serde(default = "default_true")]
    pub exit_on_error: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            exit_on_error: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Reads `path` if it exists, then applies the process environment and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overrides file values with environment variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(token) = get("STRAPI_TOKEN") {
            self.backend.token = token;
        }
        if let Some(url) = get("STRAPI_URL") {
            self.backend.base_url = url;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(chat) = get("LOG_TG_CHAT_ID") {
            let chat_id = chat
                .trim()
                .parse::<i64>()
                .with_context(|| format!("LOG_TG_CHAT_ID is not a chat id: {chat}"))?;
            self.logging.telegram_chat_id = Some(chat_id);
        }
        if let Some(token) = get("LOG_TG_BOT_TOKEN") {
            self.logging.telegram_token = Some(token);
        }

        if let Some(host) = get("REDIS_HOST") {
            let mut redis = self.storage.redis.clone().unwrap_or(RedisConfig {
                host: host.clone(),
                port: default_redis_port(),
                password: None,
                db: 0,
            });
            redis.host = host;
            if let Some(port) = get("REDIS_PORT") {
                redis.port = port
                    .trim()
                    .parse()
                    .with_context(|| format!("REDIS_PORT is not a port: {port}"))?;
            }
            if let Some(password) = get("REDIS_PASSWORD") {
                redis.password = Some(password);
            }
            self.storage.redis = Some(redis);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            bail!("Telegram bot token is missing (set TELEGRAM_BOT_TOKEN)");
        }
        if self.backend.token.trim().is_empty() {
            bail!("Strapi API token is missing (set STRAPI_TOKEN)");
        }
        if self.backend.page_size == 0 {
            bail!("backend.page_size must be positive");
        }
        if self.retry.backoff < 1.0 {
            bail!("retry.backoff must be at least 1");
        }
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.system.data_dir.join(&self.storage.file)
    }

    /// Token for the log sink bot.
    pub fn log_bot_token(&self) -> &str {
        self.logging
            .telegram_token
            .as_deref()
            .unwrap_or(&self.telegram.token)
    }
}
