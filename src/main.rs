//! # Main Entry Point
//!
//! Wires the bot together:
//! - Domain: configuration, shop models and traits
//! - Infrastructure: Telegram, Strapi, session stores, log sink
//! - Application: conversation table, router, retry, state
//! - Interface: handlers for each step of the purchase flow
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::application::retry::RetryPolicy;
use crate::application::router::ConversationRouter;
use crate::application::state::FileSessionStore;
use crate::domain::config::AppConfig;
use crate::domain::traits::SessionStore;
use crate::infrastructure::log_sink;
use crate::infrastructure::strapi::StrapiClient;
use crate::infrastructure::telegram;
use crate::strings::logs;

#[derive(Parser, Debug)]
#[command(name = "fish-shop", version, about = "Telegram storefront over a Strapi backend")]
struct Cli {
    /// YAML configuration file; environment variables override it.
    #[arg(long, env = "FISH_SHOP_CONFIG", default_value = "data/config.yaml")]
    config: PathBuf,

    /// Directory for the log file and the session file.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    dotenvy::dotenv().ok();
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.system.data_dir = data_dir;
    }

    // 2. Logging Setup
    let data_dir = &config.system.data_dir;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(data_dir, &config.logging.file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},teloxide=warn,reqwest=warn,hyper=warn",
            config.logging.level
        ))
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    let (sink_layer, sink) = match config.logging.telegram_chat_id {
        Some(chat_id) => {
            let (layer, handle) = log_sink::spawn(
                Bot::new(config.log_bot_token()),
                ChatId(chat_id),
                log_sink::parse_level(&config.logging.telegram_level),
            );
            (Some(layer), Some(handle))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .with(sink_layer)
        .init();

    tracing::info!("{}", logs::STARTING);
    tracing::info!(
        "{}",
        logs::config_loaded(&cli.config.display().to_string(), &config.backend.base_url)
    );
    if let Some(chat_id) = config.logging.telegram_chat_id {
        tracing::info!("{}", logs::log_sink_enabled(chat_id));
    }

    // 3. Initialize Infrastructure
    let backend = StrapiClient::new(&config.backend, RetryPolicy::from_config(&config.retry))
        .context("Failed to create Strapi client")?;
    let sessions = open_session_store(&config).await?;

    // 4. Initialize Application Components
    let router = Arc::new(ConversationRouter::new(Arc::new(backend), sessions));

    // 5. Event Loop
    let bot = Bot::new(&config.telegram.token);
    let result = telegram::run(bot, router, config.system.exit_on_error).await;

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "{}", logs::BOT_STOPPED);
    }
    if let Some(sink) = &sink {
        sink.flush().await;
    }
    result
}

async fn open_session_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>> {
    #[cfg(feature = "redis")]
    if let Some(redis) = &config.storage.redis {
        let store = crate::infrastructure::redis_store::RedisSessionStore::connect(redis).await?;
        tracing::info!("{}", logs::session_store("Redis"));
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "redis"))]
    if config.storage.redis.is_some() {
        tracing::warn!("{}", logs::REDIS_FEATURE_DISABLED);
    }

    let path = config.state_path();
    tracing::info!("{}", logs::session_store(&path.display().to_string()));
    Ok(Arc::new(FileSessionStore::open(path)))
}
