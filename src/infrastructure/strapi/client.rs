use anyhow::Result as AnyResult;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::error::BackendError;
use super::types::{
    CartAttributes, CartEmail, DataBody, Entity, Envelope, NewCart, NewCartProduct,
    ProductAttributes,
};
use crate::application::retry::RetryPolicy;
use crate::domain::config::BackendConfig;
use crate::domain::models::{Cart, CartItem, Product, ProductSummary};
use crate::domain::traits::Backend;

type Result<T> = std::result::Result<T, BackendError>;

/// Strapi REST client. Cheap to clone; every request is retried per the [`RetryPolicy`].
#[derive(Clone)]
pub struct StrapiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl StrapiClient {
    pub fn new(config: &BackendConfig, retry: RetryPolicy) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| BackendError::InvalidUrl(format!("{base}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                token: config.token.clone(),
                page_size: config.page_size.max(1),
                retry,
            }),
        })
    }

    /// Resolves an asset reference: `/uploads/x.jpg` against the API origin,
    /// absolute URLs unchanged.
    pub fn resolve_asset_url(&self, reference: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(reference)
            .map_err(|e| BackendError::InvalidUrl(format!("{reference}: {e}")))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let body = body.map(serde_json::to_value).transpose()?;
        tracing::debug!(%method, %url, ?query, "Backend request");

        let label = format!("{method} {path}");
        let bytes = self
            .inner
            .retry
            .execute(&label, || {
                let mut request = self
                    .inner
                    .http
                    .request(method.clone(), url.clone())
                    .bearer_auth(&self.inner.token);
                if !query.is_empty() {
                    request = request.query(query);
                }
                if let Some(body) = &body {
                    request = request.json(body);
                }
                async move { read_body(request.send().await?).await }
            })
            .await?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.call::<T, ()>(Method::GET, path, query, None).await
    }

    /// All products, following `meta.pagination` until the last page.
    pub async fn products(&self) -> Result<Vec<ProductSummary>> {
        let mut products = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("pagination[page]", page.to_string()),
                ("pagination[pageSize]", self.inner.page_size.to_string()),
            ];
            let envelope: Envelope<Vec<Entity<ProductAttributes>>> =
                self.get("products", &query).await?;

            let received = envelope.data.len();
            products.extend(envelope.data.into_iter().map(|entity| ProductSummary {
                id: entity.id,
                title: entity.attributes.title,
            }));

            match envelope.meta.pagination {
                Some(pagination) if pagination.has_more() && received > 0 => page += 1,
                _ => break,
            }
        }

        tracing::debug!(count = products.len(), "Loaded product list");
        Ok(products)
    }

    pub async fn product(&self, product_id: u64) -> Result<Product> {
        let query = [("populate", "*".to_string())];
        let envelope: Envelope<Option<Entity<ProductAttributes>>> =
            self.get(&format!("products/{product_id}"), &query).await?;
        let entity = envelope
            .data
            .ok_or_else(|| BackendError::NotFound(format!("product {product_id}")))?;
        self.to_product(entity)
    }

    fn to_product(&self, entity: Entity<ProductAttributes>) -> Result<Product> {
        let image_url = entity
            .attributes
            .picture_url()
            .map(|reference| self.resolve_asset_url(reference))
            .transpose()?
            .map(String::from);

        Ok(Product {
            id: entity.id,
            title: entity.attributes.title,
            description: entity.attributes.description.unwrap_or_default(),
            price: entity.attributes.price,
            image_url,
        })
    }

    pub async fn find_cart(&self, chat_id: i64) -> Result<Option<Cart>> {
        let query = [
            ("filters[tg_id][$eq]", chat_id.to_string()),
            ("populate[cart_products][populate][0]", "product".to_string()),
        ];
        let envelope: Envelope<Vec<Entity<CartAttributes>>> = self.get("carts", &query).await?;
        envelope
            .data
            .into_iter()
            .next()
            .map(|entity| self.to_cart(entity))
            .transpose()
    }

    pub async fn create_cart(&self, chat_id: i64) -> Result<Cart> {
        let owner = chat_id.to_string();
        let body = DataBody {
            data: NewCart { tg_id: &owner },
        };
        let envelope: Envelope<Entity<CartAttributes>> =
            self.call(Method::POST, "carts", &[], Some(&body)).await?;
        tracing::info!(chat_id, cart_id = envelope.data.id, "Created cart");
        self.to_cart(envelope.data)
    }

    pub async fn get_or_create_cart(&self, chat_id: i64) -> Result<Cart> {
        match self.find_cart(chat_id).await? {
            Some(cart) => Ok(cart),
            None => self.create_cart(chat_id).await,
        }
    }

    fn to_cart(&self, entity: Entity<CartAttributes>) -> Result<Cart> {
        let cart_id = entity.id;
        let lines = entity
            .attributes
            .cart_products
            .and_then(|relation| relation.data)
            .unwrap_or_default();

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let Some(product) = line.attributes.product.and_then(|relation| relation.data) else {
                tracing::warn!(cart_id, item_id = line.id, "Cart line without product skipped");
                continue;
            };
            items.push(CartItem {
                id: line.id,
                quantity: line.attributes.quantity,
                product: self.to_product(product)?,
            });
        }

        Ok(Cart {
            id: cart_id,
            owner: entity.attributes.tg_id,
            email: entity.attributes.email,
            items,
        })
    }

    /// Returns the id of the new cart line.
    pub async fn create_cart_product(
        &self,
        cart_id: u64,
        product_id: u64,
        quantity: Decimal,
    ) -> Result<u64> {
        let body = DataBody {
            data: NewCartProduct {
                cart: cart_id,
                product: product_id,
                quantity,
            },
        };
        let envelope: Envelope<Entity<serde_json::Value>> =
            self.call(Method::POST, "cart-products", &[], Some(&body)).await?;
        Ok(envelope.data.id)
    }

    pub async fn delete_cart_product(&self, item_id: u64) -> Result<()> {
        let _: serde_json::Value = self
            .call::<_, ()>(Method::DELETE, &format!("cart-products/{item_id}"), &[], None)
            .await?;
        Ok(())
    }

    pub async fn update_cart_email(&self, cart_id: u64, email: &str) -> Result<()> {
        let body = DataBody {
            data: CartEmail { email },
        };
        let _: serde_json::Value = self
            .call(Method::PUT, &format!("carts/{cart_id}"), &[], Some(&body))
            .await?;
        Ok(())
    }

    /// Plain GET of an absolute asset URL, without the API token.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = Url::parse(url).map_err(|e| BackendError::InvalidUrl(format!("{url}: {e}")))?;
        tracing::debug!(%url, "Downloading asset");

        self.inner
            .retry
            .execute(&format!("GET {url}"), || {
                let request = self.inner.http.get(url.clone());
                async move { read_body(request.send().await?).await }
            })
            .await
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>> {
    let status = response.status();
    let url = response.url().to_string();

    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(url));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Status { status, url, body });
    }
    Ok(response.bytes().await?.to_vec())
}

#[async_trait]
impl Backend for StrapiClient {
    async fn list_products(&self) -> AnyResult<Vec<ProductSummary>> {
        Ok(self.products().await?)
    }

    async fn get_product(&self, product_id: u64) -> AnyResult<Product> {
        Ok(self.product(product_id).await?)
    }

    async fn fetch_asset(&self, url: &str) -> AnyResult<Vec<u8>> {
        Ok(self.download(url).await?)
    }

    async fn cart(&self, chat_id: i64) -> AnyResult<Cart> {
        Ok(self.get_or_create_cart(chat_id).await?)
    }

    async fn add_to_cart(&self, chat_id: i64, product_id: u64, quantity: Decimal) -> AnyResult<()> {
        let cart = self.get_or_create_cart(chat_id).await?;
        let item_id = self.create_cart_product(cart.id, product_id, quantity).await?;
        tracing::info!(chat_id, cart_id = cart.id, product_id, item_id, "Added product to cart");
        Ok(())
    }

    async fn remove_from_cart(&self, item_id: u64) -> AnyResult<()> {
        self.delete_cart_product(item_id).await?;
        tracing::info!(item_id, "Removed cart line");
        Ok(())
    }

    async fn save_email(&self, chat_id: i64, email: &str) -> AnyResult<()> {
        let cart = self.get_or_create_cart(chat_id).await?;
        Ok(self.update_cart_email(cart.id, email).await?)
    }
}
