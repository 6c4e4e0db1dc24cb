//! # Redis Session Store
//!
//! Keeps each chat's session as a JSON string under `fish_shop:session:{chat_id}`.
//! Compiled with the `redis` feature and selected when `REDIS_HOST` is set.

use crate::domain::types::ChatSession;

const KEY_PREFIX: &str = "fish_shop:session";

#[cfg_attr(not(feature = "redis"), allow(dead_code))]
pub fn session_key(chat_id: i64) -> String {
    format!("{KEY_PREFIX}:{chat_id}")
}

#[cfg(feature = "redis")]
pub use store::RedisSessionStore;

#[cfg(feature = "redis")]
mod store {
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

    use super::session_key;
    use crate::domain::config::RedisConfig;
    use crate::domain::traits::SessionStore;
    use crate::domain::types::ChatSession;

    pub struct RedisSessionStore {
        connection: ConnectionManager,
    }

    /// Built field by field so passwords need no URL escaping.
    pub(super) fn connection_info(config: &RedisConfig) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
        }
    }

    impl RedisSessionStore {
        pub async fn connect(config: &RedisConfig) -> Result<Self> {
            let client = redis::Client::open(connection_info(config))
                .with_context(|| format!("Invalid Redis address {}:{}", config.host, config.port))?;
            let connection = ConnectionManager::new(client)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}:{}", config.host, config.port))?;
            tracing::info!(host = %config.host, port = config.port, db = config.db, "Connected to Redis");
            Ok(Self { connection })
        }
    }

    #[async_trait]
    impl SessionStore for RedisSessionStore {
        async fn load(&self, chat_id: i64) -> Result<ChatSession> {
            let mut connection = self.connection.clone();
            let raw: Option<String> = connection
                .get(session_key(chat_id))
                .await
                .with_context(|| format!("Failed to read session of {chat_id}"))?;
            super::decode(chat_id, raw.as_deref())
        }

        async fn save(&self, chat_id: i64, session: &ChatSession) -> Result<()> {
            let value = serde_json::to_string(session)?;
            let mut connection = self.connection.clone();
            connection
                .set::<_, _, ()>(session_key(chat_id), value)
                .await
                .with_context(|| format!("Failed to write session of {chat_id}"))?;
            Ok(())
        }
    }
}

/// Parses a stored session; unreadable values reset the chat to a fresh session.
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
fn decode(chat_id: i64, raw: Option<&str>) -> anyhow::Result<ChatSession> {
    let Some(raw) = raw else {
        return Ok(ChatSession::default());
    };
    match serde_json::from_str(raw) {
        Ok(session) => Ok(session),
        Err(e) => {
            tracing::warn!(chat_id, error = %e, "Discarding unreadable session");
            Ok(ChatSession::default())
        }
    }
}
