//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes the conversation table, routing, retries and session state.

pub mod conversation;
pub mod parsing;
pub mod retry;
pub mod router;
pub mod state;
