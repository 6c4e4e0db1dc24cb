//! # Telegram Log Sink
//!
//! A `tracing` layer that forwards this crate's log records to an operator chat.
//! Records travel through an unbounded channel to a background task that posts them
//! with a dedicated `Bot`, so logging never waits on the network.

use std::fmt::Write as _;
use teloxide::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Telegram's limit for message text, in characters.
const MESSAGE_LIMIT: usize = 4096;

/// Target used by the sink task itself; never forwarded.
const SINK_TARGET: &str = "log_sink";

enum SinkCommand {
    Line(String),
    Flush(oneshot::Sender<()>),
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<SinkCommand>,
    min_level: Level,
    target_prefix: &'static str,
}

/// Lets `main` wait until queued records are posted before exiting.
#[derive(Clone)]
pub struct LogSinkHandle {
    tx: mpsc::UnboundedSender<SinkCommand>,
}

impl LogSinkHandle {
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SinkCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

/// Starts the posting task. Must be called inside a Tokio runtime.
pub fn spawn(bot: Bot, chat_id: ChatId, min_level: Level) -> (TelegramLogLayer, LogSinkHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(forward(bot, chat_id, rx));
    let layer = TelegramLogLayer {
        tx: tx.clone(),
        min_level,
        target_prefix: env!("CARGO_CRATE_NAME"),
    };
    (layer, LogSinkHandle { tx })
}

async fn forward(bot: Bot, chat_id: ChatId, mut rx: mpsc::UnboundedReceiver<SinkCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            SinkCommand::Line(text) => {
                if let Err(e) = bot.send_message(chat_id, text).await {
                    tracing::warn!(target: SINK_TARGET, error = %e, "Could not post log record");
                }
            }
            SinkCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Parses `telegram_level` from the config; unknown names fall back to INFO.
pub fn parse_level(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::INFO)
}

impl TelegramLogLayer {
    fn accepts(&self, level: &Level, target: &str) -> bool {
        *level <= self.min_level && target != SINK_TARGET && target.starts_with(self.target_prefix)
    }
}

impl<S> Layer<S> for TelegramLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.accepts(metadata.level(), metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::new();
        event.record(&mut visitor);

        let line = format!("{} {}: {}{}", metadata.level(), metadata.target(), visitor.message, visitor.fields);
        let _ = self.tx.send(SinkCommand::Line(truncate(&line)));
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MESSAGE_LIMIT - 1).collect();
    cut.push('…');
    cut
}

struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn new() -> Self {
        Self {
            message: String::new(),
            fields: String::new(),
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }
}
