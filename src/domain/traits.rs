//! # Domain Traits
//!
//! Abstract interfaces for the chat transport, the shop backend and session storage.
//! Infrastructure provides the Telegram, Strapi and file/Redis implementations.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::models::{Cart, Product, ProductSummary};
use crate::domain::types::{ChatSession, Keyboard, MessageId, Photo, TextFormat};

/// Abstract interface for a chat, bound to a single conversation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// The chat this provider talks to.
    fn chat_id(&self) -> i64;

    /// Send a text message, returning its id.
    async fn send_message(
        &self,
        text: &str,
        format: TextFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId>;

    /// Send a photo with a caption, returning its id.
    async fn send_photo(
        &self,
        photo: Photo,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId>;

    async fn delete_message(&self, message_id: MessageId) -> Result<()>;

    /// Acknowledge a button press, optionally with a short toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Abstract interface for the shop backend (system of record).
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_products(&self) -> Result<Vec<ProductSummary>>;

    async fn get_product(&self, product_id: u64) -> Result<Product>;

    /// Download an asset by absolute URL.
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;

    /// Cart of a chat, created on first use.
    async fn cart(&self, chat_id: i64) -> Result<Cart>;

    async fn add_to_cart(&self, chat_id: i64, product_id: u64, quantity: Decimal) -> Result<()>;

    async fn remove_from_cart(&self, item_id: u64) -> Result<()>;

    async fn save_email(&self, chat_id: i64, email: &str) -> Result<()>;
}

/// Persistence for per-chat conversation state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Missing sessions load as `ChatSession::default()`.
    async fn load(&self, chat_id: i64) -> Result<ChatSession>;

    async fn save(&self, chat_id: i64, session: &ChatSession) -> Result<()>;
}
