//! # Cart Commands
//!
//! Adding products, removing cart lines, and rendering the cart.

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::application::conversation::CallbackAction;
use crate::domain::models::Cart;
use crate::domain::traits::{Backend, ChatProvider};
use crate::domain::types::{Keyboard, MessageId, Status, TextFormat};
use crate::strings::{messages, templates};

pub fn cart_keyboard(cart: &Cart) -> Keyboard {
    let keyboard = cart.items.iter().fold(Keyboard::new(), |kb, item| {
        kb.button(
            messages::remove_button(&item.product.title),
            CallbackAction::RemoveFromCart(item.id).payload(),
        )
    });
    let keyboard = if cart.is_empty() {
        keyboard
    } else {
        keyboard.button(messages::PAY_BUTTON, CallbackAction::Checkout.payload())
    };
    keyboard.button(messages::BACK_TO_MENU_BUTTON, CallbackAction::ShowMenu.payload())
}

pub async fn handle_add(
    backend: &dyn Backend,
    chat: &impl ChatProvider,
    product_id: u64,
    callback_id: Option<&str>,
) -> Result<Status> {
    let chat_id = chat.chat_id();
    tracing::debug!(chat_id, product_id, "Adding product to cart");

    backend
        .add_to_cart(chat_id, product_id, Decimal::ONE)
        .await
        .with_context(|| format!("Failed to add product {product_id} to cart of {chat_id}"))?;

    if let Some(id) = callback_id {
        chat.answer_callback(id, Some(messages::ADDED_TO_CART))
            .await?;
    }
    Ok(Status::HandleDescription)
}

pub async fn handle_remove(
    backend: &dyn Backend,
    chat: &impl ChatProvider,
    item_id: u64,
    origin: Option<MessageId>,
) -> Result<Status> {
    tracing::debug!(chat_id = chat.chat_id(), item_id, "Removing cart line");

    backend
        .remove_from_cart(item_id)
        .await
        .with_context(|| format!("Failed to remove cart line {item_id}"))?;
    super::delete_origin(chat, origin).await;

    handle_show_cart(backend, chat).await
}

pub async fn handle_show_cart(backend: &dyn Backend, chat: &impl ChatProvider) -> Result<Status> {
    let chat_id = chat.chat_id();
    tracing::debug!(chat_id, "Showing cart");

    let cart = backend
        .cart(chat_id)
        .await
        .with_context(|| format!("Failed to load cart of {chat_id}"))?;

    let keyboard = cart_keyboard(&cart);
    if cart.is_empty() {
        chat.send_message(messages::CART_EMPTY, TextFormat::Plain, Some(&keyboard))
            .await?;
    } else {
        chat.send_message(&templates::cart_view(&cart), TextFormat::Html, Some(&keyboard))
            .await?;
    }

    Ok(Status::HandleCart)
}
