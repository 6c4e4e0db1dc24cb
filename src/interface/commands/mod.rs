//! # Command Handlers
//!
//! One handler per step of the purchase flow. Each handler talks to the backend,
//! renders its reply, and returns the status the chat moves to.
//! Handlers are invoked by the `ConversationRouter`.

pub mod cart;
pub mod checkout;
pub mod menu;
pub mod product;

use crate::domain::traits::ChatProvider;
use crate::domain::types::MessageId;

/// Removes the message a button belonged to. Telegram refuses to delete messages
/// older than 48 hours, so a failure here is only logged.
pub(crate) async fn delete_origin(chat: &impl ChatProvider, origin: Option<MessageId>) {
    if let Some(message_id) = origin
        && let Err(e) = chat.delete_message(message_id).await
    {
        tracing::warn!(chat_id = chat.chat_id(), message_id, error = %e, "Could not delete message");
    }
}
