//! # Checkout
//!
//! Asks for a contact email and stores it on the chat's cart.
//! Invalid input re-prompts and keeps the chat waiting for an email.
//! Buttons pressed while waiting are ignored by the conversation table.

use anyhow::{Context, Result};

use crate::application::conversation::CallbackAction;
use crate::application::parsing::extract_email;
use crate::domain::traits::{Backend, ChatProvider};
use crate::domain::types::{ChatSession, Keyboard, Status, TextFormat};
use crate::strings::messages;

pub async fn handle_ask_email(chat: &impl ChatProvider) -> Result<Status> {
    chat.send_message(messages::ASK_EMAIL, TextFormat::Plain, None)
        .await?;
    Ok(Status::WaitingEmail)
}

pub async fn handle_check_email(
    backend: &dyn Backend,
    chat: &impl ChatProvider,
    session: &mut ChatSession,
    text: &str,
) -> Result<Status> {
    let chat_id = chat.chat_id();

    let Some(email) = extract_email(text) else {
        tracing::debug!(chat_id, "Rejected email input");
        chat.send_message(messages::EMAIL_INVALID, TextFormat::Plain, None)
            .await?;
        return Ok(Status::WaitingEmail);
    };

    backend
        .save_email(chat_id, email)
        .await
        .with_context(|| format!("Failed to save email of {chat_id}"))?;
    session.email = Some(email.to_string());
    tracing::info!(chat_id, "Saved contact email");

    let keyboard = Keyboard::new()
        .button(messages::BACK_TO_MENU_BUTTON, CallbackAction::ShowMenu.payload());
    chat.send_message(messages::EMAIL_SAVED, TextFormat::Plain, Some(&keyboard))
        .await?;
    Ok(Status::HandleCart)
}
