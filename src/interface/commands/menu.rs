//! # Menu
//!
//! Handles `/start` and the "back to menu" button: lists every product as a button.

use anyhow::{Context, Result};

use crate::application::conversation::CallbackAction;
use crate::domain::models::ProductSummary;
use crate::domain::traits::{Backend, ChatProvider};
use crate::domain::types::{Keyboard, MessageId, Status, TextFormat};
use crate::strings::messages;

pub fn menu_keyboard(products: &[ProductSummary]) -> Keyboard {
    products
        .iter()
        .fold(Keyboard::new(), |kb, p| {
            kb.button(p.title.as_str(), CallbackAction::ShowProduct(p.id).payload())
        })
        .button(messages::MY_CART_BUTTON, CallbackAction::ShowCart.payload())
}

pub async fn handle_start(
    backend: &dyn Backend,
    chat: &impl ChatProvider,
    origin: Option<MessageId>,
) -> Result<Status> {
    tracing::debug!(chat_id = chat.chat_id(), "Showing menu");

    let products = backend
        .list_products()
        .await
        .context("Failed to load product list")?;

    let text = if products.is_empty() {
        messages::MENU_EMPTY
    } else {
        messages::MENU_PROMPT
    };
    chat.send_message(text, TextFormat::Plain, Some(&menu_keyboard(&products)))
        .await?;
    super::delete_origin(chat, origin).await;

    Ok(Status::HandleMenu)
}
