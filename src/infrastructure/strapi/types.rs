//! Wire types of the Strapi v4 REST API.
//!
//! Responses are wrapped as `{"data": ..., "meta": {...}}`, every entity is
//! `{"id": n, "attributes": {...}}` and relations are `{"data": entity | [entity] | null}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u64,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page < self.page_count
    }
}

#[derive(Debug, Deserialize)]
pub struct Entity<A> {
    pub id: u64,
    pub attributes: A,
}

#[derive(Debug, Deserialize)]
pub struct Relation<T> {
    /// Absent and `null` both decode to `None`.
    pub data: Option<T>,
}

/// Media fields may be single or multiple depending on the content type.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(item) => Some(item),
            Self::Many(items) => items.first(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductAttributes {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub picture: Option<Relation<OneOrMany<Entity<MediaAttributes>>>>,
}

impl ProductAttributes {
    pub fn picture_url(&self) -> Option<&str> {
        self.picture
            .as_ref()?
            .data
            .as_ref()?
            .first()
            .map(|media| media.attributes.url.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaAttributes {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CartAttributes {
    #[serde(default, deserialize_with = "string_or_number")]
    pub tg_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cart_products: Option<Relation<Vec<Entity<CartProductAttributes>>>>,
}

#[derive(Debug, Deserialize)]
pub struct CartProductAttributes {
    #[serde(default = "one")]
    pub quantity: Decimal,
    #[serde(default)]
    pub product: Option<Relation<Entity<ProductAttributes>>>,
}

fn one() -> Decimal {
    Decimal::ONE
}

/// `tg_id` is stored as text but older records hold a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Request bodies are wrapped in `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct NewCart<'a> {
    pub tg_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewCartProduct {
    pub cart: u64,
    pub product: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartEmail<'a> {
    pub email: &'a str,
}
