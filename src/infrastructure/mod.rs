//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (`ChatProvider`, `Backend`, `SessionStore`).

pub mod log_sink;
pub mod redis_store;
pub mod strapi;
pub mod telegram;
