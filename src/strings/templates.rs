//! # Templates
//!
//! Renders products and carts into message text.
//! Cart views are HTML; product captions are plain text.

use rust_decimal::Decimal;
use teloxide::utils::html;

use crate::domain::models::{Cart, CartItem, Product};
use crate::strings::messages;

/// Telegram's limit for photo captions, in characters.
pub const CAPTION_LIMIT: usize = 1024;

/// Telegram's limit for message text, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

/// `250.00` renders as `250`, `1.50` as `1.5`.
pub fn format_amount(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn product_caption(product: &Product) -> String {
    let caption = format!(
        "{} ({} руб. за кг)\n\n{}",
        product.title,
        format_amount(product.price),
        product.description
    );
    truncate_chars(caption.trim_end(), CAPTION_LIMIT)
}

fn cart_item_block(item: &CartItem) -> String {
    format!(
        "#{}.<b>{}</b>\n<i>{}</i>\nКоличество: {}\n<u>{}руб. за кг</u>\n\n",
        item.id,
        html::escape(&truncate_chars(&item.product.title, 256)),
        html::escape(&truncate_chars(&item.product.description, 512)),
        format_amount(item.quantity),
        format_amount(item.product.price),
    )
}

/// Lists the cart items and the total as HTML within [`MESSAGE_LIMIT`].
///
/// Items that do not fit are dropped whole and counted in a trailing line;
/// the total always covers the full cart.
pub fn cart_view(cart: &Cart) -> String {
    let total = format!("Итого: <b>{} руб.</b>", format_amount(cart.total()));
    let more_reserve = messages::CART_MORE_ITEMS.chars().count() + 24;
    let mut budget = MESSAGE_LIMIT - total.chars().count() - more_reserve;

    let mut text = String::new();
    let mut shown = 0;
    for item in &cart.items {
        let block = cart_item_block(item);
        let len = block.chars().count();
        if len > budget {
            break;
        }
        budget -= len;
        text.push_str(&block);
        shown += 1;
    }

    let hidden = cart.items.len() - shown;
    if hidden > 0 {
        text.push_str(&format!("{} {}\n\n", messages::CART_MORE_ITEMS, hidden));
    }
    text.push_str(&total);
    text
}

/// Cuts `text` to at most `limit` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
