//! # Product Details
//!
//! Shows a single product as a photo with caption, falling back to text
//! when the product has no picture or the picture cannot be downloaded.

use anyhow::{Context, Result};

use crate::application::conversation::CallbackAction;
use crate::domain::traits::{Backend, ChatProvider};
use crate::domain::types::{Keyboard, MessageId, Photo, Status, TextFormat};
use crate::strings::{messages, templates};

pub fn product_keyboard(product_id: u64) -> Keyboard {
    Keyboard::new()
        .button(
            messages::ADD_TO_CART_BUTTON,
            CallbackAction::AddToCart(product_id).payload(),
        )
        .button(messages::MY_CART_BUTTON, CallbackAction::ShowCart.payload())
        .button(messages::BACK_TO_MENU_BUTTON, CallbackAction::ShowMenu.payload())
}

/// Last path segment of an asset URL, used as the upload file name.
pub fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("picture.jpg")
        .to_string()
}

pub async fn handle_product(
    backend: &dyn Backend,
    chat: &impl ChatProvider,
    product_id: u64,
    origin: Option<MessageId>,
) -> Result<Status> {
    tracing::debug!(chat_id = chat.chat_id(), product_id, "Showing product");

    let product = backend
        .get_product(product_id)
        .await
        .with_context(|| format!("Failed to load product {product_id}"))?;

    let caption = templates::product_caption(&product);
    let keyboard = product_keyboard(product.id);

    let picture = match &product.image_url {
        Some(url) => match backend.fetch_asset(url).await {
            Ok(bytes) => Some(Photo {
                bytes,
                file_name: file_name_from_url(url),
            }),
            Err(e) => {
                tracing::warn!(
                    chat_id = chat.chat_id(),
                    product_id,
                    error = %format!("{e:#}"),
                    "Could not download product picture, sending text"
                );
                None
            }
        },
        None => None,
    };

    match picture {
        Some(photo) => {
            chat.send_photo(photo, &caption, Some(&keyboard)).await?;
        }
        None => {
            chat.send_message(&caption, TextFormat::Plain, Some(&keyboard))
                .await?;
        }
    }
    super::delete_origin(chat, origin).await;

    Ok(Status::HandleDescription)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("http://localhost:1337/uploads/salmon_4f2.jpg"),
            "salmon_4f2.jpg"
        );
        assert_eq!(
            file_name_from_url("https://cdn.example.com/a/b/trout.png?width=300"),
            "trout.png"
        );
        assert_eq!(file_name_from_url("http://localhost:1337/uploads/"), "picture.jpg");
    }

    #[test]
    fn test_product_keyboard_payloads() {
        let kb = product_keyboard(8);
        assert_eq!(
            kb.payloads().collect::<Vec<_>>(),
            vec!["cart:8", "showcart", "productlist"]
        );
    }
}
