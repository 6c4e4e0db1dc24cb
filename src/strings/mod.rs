//! # Strings Module
//!
//! Centralizes user-facing strings, log messages and message templates.

pub mod logs;
pub mod messages;
pub mod templates;
