//! # Telegram Service Adapter
//!
//! Implements the `ChatProvider` trait for Telegram using `teloxide`, and runs the
//! long-polling dispatcher that feeds every update into the `ConversationRouter`.
//! Updates of one chat are handled in order; different chats run concurrently.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::payloads::{AnswerCallbackQuerySetters, SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId as TelegramMessageId,
    ParseMode,
};
use tokio::sync::mpsc;

use crate::application::router::ConversationRouter;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{Inbound, Keyboard, MessageId, Photo, TextFormat};
use crate::strings::logs;

/// A `ChatProvider` bound to one Telegram chat.
#[derive(Clone)]
pub struct TelegramService {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramService {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.payload.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl ChatProvider for TelegramService {
    fn chat_id(&self) -> i64 {
        self.chat_id.0
    }

    async fn send_message(
        &self,
        text: &str,
        format: TextFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId> {
        let mut request = self.bot.send_message(self.chat_id, text);
        if format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        let message = request.await?;
        Ok(message.id.0)
    }

    async fn send_photo(
        &self,
        photo: Photo,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId> {
        let file = InputFile::memory(photo.bytes).file_name(photo.file_name);
        let mut request = self.bot.send_photo(self.chat_id, file).caption(caption);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        let message = request.await?;
        Ok(message.id.0)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<()> {
        self.bot
            .delete_message(self.chat_id, TelegramMessageId(message_id))
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }
}

/// Forwards handler failures to the log and, when the bot must stop on errors,
/// to the run loop.
#[derive(Clone)]
struct ErrorReporter {
    fatal: Option<mpsc::UnboundedSender<anyhow::Error>>,
}

impl ErrorReporter {
    fn report(&self, chat_id: i64, result: Result<()>) {
        let Err(error) = result else {
            return;
        };
        tracing::error!(chat_id, error = %format!("{error:#}"), "{}", logs::UPDATE_FAILED);
        if let Some(fatal) = &self.fatal {
            let _ = fatal.send(error);
        }
    }
}

async fn on_message(
    bot: Bot,
    msg: Message,
    router: Arc<ConversationRouter>,
    errors: ErrorReporter,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat = TelegramService::new(bot, msg.chat.id);
    let event = Inbound::from_text(text);
    tracing::debug!(chat_id = chat.chat_id(), kind = event.kind(), "Received message");

    errors.report(chat.chat_id(), router.route(&chat, event).await);
    Ok(())
}

async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    router: Arc<ConversationRouter>,
    errors: ErrorReporter,
) -> Result<()> {
    let (chat_id, message_id) = match &q.message {
        Some(message) => (message.chat().id, Some(message.id().0)),
        None => (ChatId::from(q.from.id), None),
    };
    let chat = TelegramService::new(bot, chat_id);
    let event = Inbound::Callback {
        id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        message_id,
    };
    tracing::debug!(chat_id = chat.chat_id(), data = ?q.data, "Received callback");

    errors.report(chat.chat_id(), router.route(&chat, event).await);
    Ok(())
}

/// Polls Telegram until Ctrl-C or, with `exit_on_error`, until the first failed update.
pub async fn run(bot: Bot, router: Arc<ConversationRouter>, exit_on_error: bool) -> Result<()> {
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
    let errors = ErrorReporter {
        fatal: exit_on_error.then_some(fatal_tx),
    };

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, errors])
        .default_handler(|_update| async {})
        .enable_ctrlc_handler()
        .build();

    tracing::info!("{}", logs::POLLING);
    tokio::select! {
        _ = dispatcher.dispatch() => {
            tracing::info!("{}", logs::SHUTDOWN);
            Ok(())
        }
        Some(error) = fatal_rx.recv() => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn test_keyboard_to_markup() {
        let keyboard = Keyboard::new()
            .button("Salmon", "product:1")
            .button("🛒 Моя корзина", "showcart");
        let markup = to_markup(&keyboard);

        assert_eq!(markup.inline_keyboard.len(), 2);
        let button = &markup.inline_keyboard[0][0];
        assert_eq!(button.text, "Salmon");
        assert_eq!(
            button.kind,
            InlineKeyboardButtonKind::CallbackData("product:1".to_string())
        );
    }

    #[tokio::test]
    async fn test_errors_stop_the_loop_only_when_fatal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ErrorReporter { fatal: Some(tx) };
        reporter.report(1, Ok(()));
        reporter.report(1, Err(anyhow::anyhow!("backend down")));
        let error = rx.recv().await.unwrap();
        assert_eq!(error.to_string(), "backend down");

        let quiet = ErrorReporter { fatal: None };
        quiet.report(1, Err(anyhow::anyhow!("ignored")));
    }
}
