//! # Strapi Backend
//!
//! REST client for the Strapi v4 API holding products and carts.
//! Implements the domain `Backend` trait; every call runs through the retry policy.

mod client;
mod error;
mod types;

pub use client::StrapiClient;
