//! # Bot State
//!
//! Per-chat conversation sessions (`BotState`) and the file-backed `SessionStore`.
//! The whole map is serialized to `data/state.json` after every change so a restart
//! resumes each chat where it stopped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::traits::SessionStore;
use crate::domain::types::ChatSession;

/// Persistent state of the bot, mapping chat ids to their sessions.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct BotState {
    #[serde(default)]
    pub chats: HashMap<i64, ChatSession>,
}

impl BotState {
    /// Gets or creates the session of a specific chat.
    pub fn get_chat_state(&mut self, chat_id: i64) -> &mut ChatSession {
        self.chats.entry(chat_id).or_default()
    }

    /// Loads the state from `path`, or returns an empty state if the file is missing.
    /// An unreadable file is reported and replaced by an empty state.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable session file");
                Self::default()
            }
        }
    }

    /// Persists the state to `path` through a temporary file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Session store backed by a single JSON file.
pub struct FileSessionStore {
    path: PathBuf,
    state: Mutex<BotState>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = BotState::load(&path);
        tracing::info!(path = %path.display(), chats = state.chats.len(), "Loaded chat sessions");
        Self {
            path,
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, chat_id: i64) -> Result<ChatSession> {
        let guard = self.state.lock().await;
        Ok(guard.chats.get(&chat_id).cloned().unwrap_or_default())
    }

    async fn save(&self, chat_id: i64, session: &ChatSession) -> Result<()> {
        let mut guard = self.state.lock().await;
        *guard.get_chat_state(chat_id) = session.clone();
        guard.save(&self.path)
    }
}
