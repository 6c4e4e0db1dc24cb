//! # Conversation Router
//!
//! Routes each inbound event of a chat to the handler picked by the conversation table
//! (in `application/conversation`), runs it, and persists the status the handler returns.

use anyhow::Result;
use std::sync::Arc;

use crate::application::conversation::{self, Route};
use crate::domain::traits::{Backend, ChatProvider, SessionStore};
use crate::domain::types::{Inbound, MessageId};
use crate::interface::commands;

pub struct ConversationRouter {
    backend: Arc<dyn Backend>,
    sessions: Arc<dyn SessionStore>,
}

impl ConversationRouter {
    pub fn new(backend: Arc<dyn Backend>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { backend, sessions }
    }

    pub async fn route<C>(&self, chat: &C, event: Inbound) -> Result<()>
    where
        C: ChatProvider,
    {
        let chat_id = chat.chat_id();
        let mut session = self.sessions.load(chat_id).await?;

        let (callback_id, origin): (Option<&str>, Option<MessageId>) = match &event {
            Inbound::Callback { id, message_id, .. } => (Some(id.as_str()), *message_id),
            _ => (None, None),
        };

        let route = conversation::resolve(session.status, &event);
        tracing::debug!(
            chat_id,
            status = ?session.status,
            kind = event.kind(),
            route = ?route,
            "Router dispatching event"
        );

        let Some(route) = route else {
            // Unhandled buttons still need an answer or the client keeps spinning.
            if let Some(id) = callback_id {
                answer_quietly(chat, id).await;
            }
            return Ok(());
        };

        // Adding to cart answers with its own toast once the backend confirms.
        if let Some(id) = callback_id
            && !matches!(route, Route::AddToCart(_))
        {
            answer_quietly(chat, id).await;
        }

        let backend = self.backend.as_ref();
        let next = match route {
            Route::Start => commands::menu::handle_start(backend, chat, origin).await?,
            Route::ShowProduct(product_id) => {
                commands::product::handle_product(backend, chat, product_id, origin).await?
            }
            Route::AddToCart(product_id) => {
                commands::cart::handle_add(backend, chat, product_id, callback_id).await?
            }
            Route::RemoveFromCart(item_id) => {
                commands::cart::handle_remove(backend, chat, item_id, origin).await?
            }
            Route::ShowCart => commands::cart::handle_show_cart(backend, chat).await?,
            Route::AskEmail => commands::checkout::handle_ask_email(chat).await?,
            Route::CheckEmail => {
                let text = match &event {
                    Inbound::Text(text) => text.as_str(),
                    _ => "",
                };
                commands::checkout::handle_check_email(backend, chat, &mut session, text).await?
            }
        };

        if session.status != Some(next) {
            tracing::info!(chat_id, from = ?session.status, to = ?next, "Conversation status changed");
        }
        session.advance(next);
        self.sessions.save(chat_id, &session).await?;
        Ok(())
    }
}

async fn answer_quietly(chat: &impl ChatProvider, callback_id: &str) {
    if let Err(e) = chat.answer_callback(callback_id, None).await {
        tracing::warn!(chat_id = chat.chat_id(), error = %e, "Could not answer callback query");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Cart, CartItem, Product, ProductSummary};
    use crate::domain::types::{ChatSession, Keyboard, Photo, Status, TextFormat};
    use anyhow::{anyhow, bail};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const CHAT: i64 = 42;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text {
            text: String,
            format: TextFormat,
            payloads: Vec<String>,
        },
        Photo {
            caption: String,
            file_name: String,
            payloads: Vec<String>,
        },
        Deleted(MessageId),
        Answered(String, Option<String>),
    }

    fn payloads(keyboard: Option<&Keyboard>) -> Vec<String> {
        keyboard
            .map(|kb| kb.payloads().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[derive(Default)]
    struct FakeChat {
        sent: Mutex<Vec<Sent>>,
    }

    impl FakeChat {
        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    #[async_trait]
    impl ChatProvider for FakeChat {
        fn chat_id(&self) -> i64 {
            CHAT
        }

        async fn send_message(
            &self,
            text: &str,
            format: TextFormat,
            keyboard: Option<&Keyboard>,
        ) -> Result<MessageId> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(Sent::Text {
                text: text.to_string(),
                format,
                payloads: payloads(keyboard),
            });
            Ok(sent.len() as MessageId)
        }

        async fn send_photo(
            &self,
            photo: Photo,
            caption: &str,
            keyboard: Option<&Keyboard>,
        ) -> Result<MessageId> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(Sent::Photo {
                caption: caption.to_string(),
                file_name: photo.file_name,
                payloads: payloads(keyboard),
            });
            Ok(sent.len() as MessageId)
        }

        async fn delete_message(&self, message_id: MessageId) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Deleted(message_id));
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Answered(
                callback_id.to_string(),
                text.map(str::to_string),
            ));
            Ok(())
        }
    }

    /// In-memory shop with two products and one cart per chat.
    struct FakeBackend {
        products: Vec<Product>,
        carts: Mutex<HashMap<i64, Cart>>,
        next_item: Mutex<u64>,
        fail_products: bool,
        fail_assets: bool,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                products: vec![
                    Product {
                        id: 1,
                        title: "Salmon".to_string(),
                        description: "Fresh".to_string(),
                        price: Decimal::new(1200, 0),
                        image_url: Some("http://cms/uploads/salmon.jpg".to_string()),
                    },
                    Product {
                        id: 2,
                        title: "Trout".to_string(),
                        description: "Smoked".to_string(),
                        price: Decimal::new(900, 0),
                        image_url: None,
                    },
                ],
                carts: Mutex::new(HashMap::new()),
                next_item: Mutex::new(100),
                fail_products: false,
                fail_assets: false,
            }
        }

        fn cart_items(&self) -> Vec<CartItem> {
            self.carts
                .lock()
                .unwrap()
                .get(&CHAT)
                .map(|c| c.items.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn list_products(&self) -> Result<Vec<ProductSummary>> {
            if self.fail_products {
                bail!("HTTP 500 from backend");
            }
            Ok(self
                .products
                .iter()
                .map(|p| ProductSummary {
                    id: p.id,
                    title: p.title.clone(),
                })
                .collect())
        }

        async fn get_product(&self, product_id: u64) -> Result<Product> {
            self.products
                .iter()
                .find(|p| p.id == product_id)
                .cloned()
                .ok_or_else(|| anyhow!("product {product_id} not found"))
        }

        async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
            if self.fail_assets {
                bail!("HTTP 404 for {url}");
            }
            Ok(vec![0xFF, 0xD8])
        }

        async fn cart(&self, chat_id: i64) -> Result<Cart> {
            let mut carts = self.carts.lock().unwrap();
            Ok(carts
                .entry(chat_id)
                .or_insert_with(|| Cart {
                    id: 1,
                    owner: chat_id.to_string(),
                    email: None,
                    items: Vec::new(),
                })
                .clone())
        }

        async fn add_to_cart(&self, chat_id: i64, product_id: u64, quantity: Decimal) -> Result<()> {
            let product = self.get_product(product_id).await?;
            self.cart(chat_id).await?;
            let id = {
                let mut next = self.next_item.lock().unwrap();
                *next += 1;
                *next
            };
            let mut carts = self.carts.lock().unwrap();
            if let Some(cart) = carts.get_mut(&chat_id) {
                cart.items.push(CartItem {
                    id,
                    quantity,
                    product,
                });
            }
            Ok(())
        }

        async fn remove_from_cart(&self, item_id: u64) -> Result<()> {
            for cart in self.carts.lock().unwrap().values_mut() {
                cart.items.retain(|item| item.id != item_id);
            }
            Ok(())
        }

        async fn save_email(&self, chat_id: i64, email: &str) -> Result<()> {
            self.cart(chat_id).await?;
            if let Some(cart) = self.carts.lock().unwrap().get_mut(&chat_id) {
                cart.email = Some(email.to_string());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySessions {
        sessions: Mutex<HashMap<i64, ChatSession>>,
    }

    #[async_trait]
    impl SessionStore for MemorySessions {
        async fn load(&self, chat_id: i64) -> Result<ChatSession> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .get(&chat_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn save(&self, chat_id: i64, session: &ChatSession) -> Result<()> {
            self.sessions
                .lock()
                .unwrap()
                .insert(chat_id, session.clone());
            Ok(())
        }
    }

    struct Harness {
        router: ConversationRouter,
        backend: Arc<FakeBackend>,
        sessions: Arc<MemorySessions>,
        chat: FakeChat,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_backend(FakeBackend::new())
        }

        fn with_backend(backend: FakeBackend) -> Self {
            let backend = Arc::new(backend);
            let sessions = Arc::new(MemorySessions::default());
            Self {
                router: ConversationRouter::new(backend.clone(), sessions.clone()),
                backend,
                sessions,
                chat: FakeChat::default(),
            }
        }

        async fn send(&self, event: Inbound) -> Vec<Sent> {
            self.router.route(&self.chat, event).await.unwrap();
            self.chat.take()
        }

        async fn press(&self, data: &str) -> Vec<Sent> {
            self.send(Inbound::Callback {
                id: format!("cb-{data}"),
                data: data.to_string(),
                message_id: Some(7),
            })
            .await
        }

        async fn status(&self) -> Option<Status> {
            self.sessions.load(CHAT).await.unwrap().status
        }
    }

    fn start() -> Inbound {
        Inbound::from_text("/start")
    }

    #[tokio::test]
    async fn test_start_shows_menu() {
        let h = Harness::new();
        let sent = h.send(start()).await;

        assert_eq!(
            sent,
            vec![Sent::Text {
                text: "Please choose:".to_string(),
                format: TextFormat::Plain,
                payloads: vec![
                    "product:1".to_string(),
                    "product:2".to_string(),
                    "showcart".to_string()
                ],
            }]
        );
        assert_eq!(h.status().await, Some(Status::HandleMenu));
    }

    #[tokio::test]
    async fn test_product_details_with_photo() {
        let h = Harness::new();
        h.send(start()).await;
        let sent = h.press("product:1").await;

        assert_eq!(
            sent,
            vec![
                Sent::Answered("cb-product:1".to_string(), None),
                Sent::Photo {
                    caption: "Salmon (1200 руб. за кг)\n\nFresh".to_string(),
                    file_name: "salmon.jpg".to_string(),
                    payloads: vec![
                        "cart:1".to_string(),
                        "showcart".to_string(),
                        "productlist".to_string()
                    ],
                },
                Sent::Deleted(7),
            ]
        );
        assert_eq!(h.status().await, Some(Status::HandleDescription));
    }

    #[tokio::test]
    async fn test_product_without_picture_is_sent_as_text() {
        let h = Harness::new();
        h.send(start()).await;
        let sent = h.press("product:2").await;

        assert!(matches!(
            &sent[1],
            Sent::Text { text, .. } if text.starts_with("Trout (900 руб. за кг)")
        ));
    }

    #[tokio::test]
    async fn test_failed_picture_download_falls_back_to_text() {
        let mut backend = FakeBackend::new();
        backend.fail_assets = true;
        let h = Harness::with_backend(backend);
        h.send(start()).await;
        let sent = h.press("product:1").await;

        assert_eq!(
            sent[1],
            Sent::Text {
                text: "Salmon (1200 руб. за кг)\n\nFresh".to_string(),
                format: TextFormat::Plain,
                payloads: vec![
                    "cart:1".to_string(),
                    "showcart".to_string(),
                    "productlist".to_string()
                ],
            }
        );
        assert_eq!(h.status().await, Some(Status::HandleDescription));
    }

    #[tokio::test]
    async fn test_add_to_cart_answers_with_toast_and_stays_on_product() {
        let h = Harness::new();
        h.send(start()).await;
        h.press("product:1").await;
        let sent = h.press("cart:1").await;

        assert_eq!(
            sent,
            vec![Sent::Answered(
                "cb-cart:1".to_string(),
                Some("Добавлено в корзину".to_string())
            )]
        );
        assert_eq!(h.backend.cart_items().len(), 1);
        assert_eq!(h.status().await, Some(Status::HandleDescription));

        // The product view's cart button keeps working after adding.
        h.press("showcart").await;
        assert_eq!(h.status().await, Some(Status::HandleCart));
    }

    #[tokio::test]
    async fn test_cart_remove_and_checkout_flow() {
        let h = Harness::new();
        h.send(start()).await;
        h.press("product:1").await;
        h.press("cart:1").await;
        h.press("cart:1").await;

        let sent = h.press("showcart").await;
        match &sent[1] {
            Sent::Text {
                text,
                format,
                payloads,
            } => {
                assert_eq!(*format, TextFormat::Html);
                assert!(text.contains("<b>Salmon</b>"));
                assert!(text.contains("Итого: <b>2400 руб.</b>"));
                assert_eq!(
                    payloads,
                    &vec![
                        "remove:101".to_string(),
                        "remove:102".to_string(),
                        "payment".to_string(),
                        "productlist".to_string()
                    ]
                );
            }
            other => panic!("unexpected reply {other:?}"),
        }

        let sent = h.press("remove:101").await;
        assert_eq!(sent[1], Sent::Deleted(7));
        assert_eq!(h.backend.cart_items().len(), 1);
        assert_eq!(h.status().await, Some(Status::HandleCart));

        let sent = h.press("payment").await;
        assert_eq!(
            sent,
            vec![
                Sent::Answered("cb-payment".to_string(), None),
                Sent::Text {
                    text: "Пришлите, пожалуйста, Ваш е-майл".to_string(),
                    format: TextFormat::Plain,
                    payloads: vec![],
                },
            ]
        );
        assert_eq!(h.status().await, Some(Status::WaitingEmail));
    }

    #[tokio::test]
    async fn test_email_validation_loop() {
        let h = Harness::new();
        h.send(start()).await;
        let sent = h.press("showcart").await;
        assert_eq!(
            sent[1],
            Sent::Text {
                text: "Ваша корзина пуста.".to_string(),
                format: TextFormat::Plain,
                payloads: vec!["productlist".to_string()],
            }
        );
        h.press("payment").await;

        let sent = h.send(Inbound::Text("not an email".to_string())).await;
        assert!(matches!(&sent[0], Sent::Text { text, .. } if text.starts_with("Такой email недопустим")));
        assert_eq!(h.status().await, Some(Status::WaitingEmail));

        let sent = h
            .send(Inbound::Text("пишите на buyer@fish.ru".to_string()))
            .await;
        match &sent[0] {
            Sent::Text { text, payloads, .. } => {
                assert!(text.starts_with("Email сохранен"));
                assert_eq!(payloads, &vec!["productlist".to_string()]);
            }
            other => panic!("unexpected reply {other:?}"),
        }
        assert_eq!(h.status().await, Some(Status::HandleCart));

        let cart = h.backend.cart(CHAT).await.unwrap();
        assert_eq!(cart.email.as_deref(), Some("buyer@fish.ru"));
        let session = h.sessions.load(CHAT).await.unwrap();
        assert_eq!(session.email.as_deref(), Some("buyer@fish.ru"));

        // The saved-email reply leads back to the menu.
        let sent = h.press("productlist").await;
        assert!(matches!(&sent[1], Sent::Text { text, .. } if text == "Please choose:"));
        assert_eq!(h.status().await, Some(Status::HandleMenu));
    }

    #[tokio::test]
    async fn test_unmatched_callback_is_answered_and_ignored() {
        let h = Harness::new();
        h.send(start()).await;

        let sent = h.press("payment").await;
        assert_eq!(sent, vec![Sent::Answered("cb-payment".to_string(), None)]);
        assert_eq!(h.status().await, Some(Status::HandleMenu));

        let sent = h.press("garbage").await;
        assert_eq!(sent, vec![Sent::Answered("cb-garbage".to_string(), None)]);
    }

    #[tokio::test]
    async fn test_events_before_start_are_ignored() {
        let h = Harness::new();
        let sent = h.send(Inbound::Text("hello".to_string())).await;
        assert!(sent.is_empty());
        assert_eq!(h.status().await, None);
    }

    #[tokio::test]
    async fn test_start_restarts_from_any_status() {
        let h = Harness::new();
        h.send(start()).await;
        h.press("showcart").await;
        h.press("payment").await;
        assert_eq!(h.status().await, Some(Status::WaitingEmail));

        h.send(start()).await;
        assert_eq!(h.status().await, Some(Status::HandleMenu));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates_and_keeps_status() {
        let mut backend = FakeBackend::new();
        backend.fail_products = true;
        let h = Harness::with_backend(backend);

        let result = h.router.route(&h.chat, start()).await;
        assert!(result.is_err());
        assert_eq!(h.status().await, None);
    }
}
