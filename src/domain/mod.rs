//! # Domain Layer
//!
//! Core definitions, types, and traits that define the shop and the chat it runs in.
//! Independent of Telegram and Strapi, serving as the contract for the other layers.

pub mod config;
pub mod models;
pub mod traits;
pub mod types;
