//! # Shop Models
//!
//! Products and carts as the bot sees them. The backend owns these records;
//! the bot only keeps short-lived copies for rendering a single reply.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as listed in the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: u64,
    pub title: String,
}

/// A product with everything the detail view needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Price per kilogram.
    pub price: Decimal,
    /// Absolute URL of the product picture, already resolved against the backend origin.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One line of a cart. `id` is the id of the cart line itself, not of the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    pub quantity: Decimal,
    pub product: Product,
}

impl CartItem {
    pub fn subtotal(&self) -> Decimal {
        self.product.price * self.quantity
    }
}

/// The cart owned by a single chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: u64,
    pub owner: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::subtotal).sum()
    }
}
