//! # Interface Layer
//!
//! User-facing handlers for each step of the conversation.

pub mod commands;
