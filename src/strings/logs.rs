//! # Log Strings
//!
//! Operator-facing messages written to the log.

pub const STARTING: &str = "Starting fish-shop bot...";
pub const POLLING: &str = "Polling Telegram for updates";
pub const SHUTDOWN: &str = "Shutting down...";
pub const UPDATE_FAILED: &str = "Failed to handle update";
pub const BOT_STOPPED: &str = "Bot stopped after an unhandled error";

pub fn config_loaded(path: &str, backend: &str) -> String {
    format!("Loaded configuration from {path} (backend: {backend})")
}

pub fn session_store(kind: &str) -> String {
    format!("Chat sessions stored in {kind}")
}

pub fn log_sink_enabled(chat_id: i64) -> String {
    format!("Forwarding logs to Telegram chat {chat_id}")
}

pub const REDIS_FEATURE_DISABLED: &str =
    "Redis is configured but this build lacks the `redis` feature; using the session file";
