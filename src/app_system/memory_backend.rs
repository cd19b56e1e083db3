use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::actor_framework::ResourceActor;
use crate::api::StorefrontApi;
use crate::cart_actor::CartItem;
use crate::clients::{CartClient, OrderClient, ProductClient, UserClient};
use crate::domain::dates::parse_local_date;
use crate::domain::{
    CartEntry, CartProduct, NewOrder, Order, OrderItem, OrderStatus, Product, ProductInput, Role, UserPatch,
    UserProfile,
};
use crate::error::{ApiError, StoreError};
use crate::identity::{AuthAccount, MemoryAuthority};
use crate::store::DocumentStore;

/// Delivery slots offered for every event date.
pub const DELIVERY_SLOTS: [&str; 5] = ["10:00", "12:00", "14:00", "16:00", "18:00"];

fn id_generator(prefix: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    let counter = Arc::new(AtomicU64::new(1));
    move || format!("{prefix}_{:06}", counter.fetch_add(1, Ordering::SeqCst))
}

struct Caller {
    uid: String,
    role: Role,
}

impl Caller {
    fn require_admin(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::User => Err(ApiError::status(403, "Administrator access required")),
        }
    }
}

/// In-process stand-in for the storefront API and the document database.
///
/// Every collection lives in its own [`ResourceActor`]; bearer credentials
/// are checked against the shared [`MemoryAuthority`].
pub struct MemoryBackend {
    pub product_client: ProductClient,
    pub order_client: OrderClient,
    pub cart_client: CartClient,
    pub user_client: UserClient,
    authority: MemoryAuthority,
    storage_bucket: String,
    uploads: AtomicU64,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MemoryBackend {
    pub fn spawn(authority: MemoryAuthority, storage_bucket: impl Into<String>) -> Arc<Self> {
        let (product_actor, product_resource_client) = ResourceActor::<Product>::new(32, id_generator("product"));
        let product_client = ProductClient::new(product_resource_client);
        let product_handle = tokio::spawn(product_actor.run());

        let (order_actor, order_resource_client) = ResourceActor::<Order>::new(32, id_generator("order"));
        let order_client = OrderClient::new(order_resource_client, product_client.clone());
        let order_handle = tokio::spawn(order_actor.run());

        let (cart_actor, cart_resource_client) = ResourceActor::<CartItem>::new(32, id_generator("line"));
        let cart_client = CartClient::new(cart_resource_client);
        let cart_handle = tokio::spawn(cart_actor.run());

        let (user_actor, user_resource_client) = ResourceActor::<UserProfile>::new(32, id_generator("user"));
        let user_client = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        info!("Memory backend started");
        Arc::new(Self {
            product_client,
            order_client,
            cart_client,
            user_client,
            authority,
            storage_bucket: storage_bucket.into(),
            uploads: AtomicU64::new(0),
            handles: Mutex::new(vec![product_handle, order_handle, cart_handle, user_handle]),
        })
    }

    pub fn authority(&self) -> &MemoryAuthority {
        &self.authority
    }

    pub async fn seed_products(&self, products: Vec<Product>) -> Result<(), ApiError> {
        let count = products.len();
        for product in products {
            self.product_client.put_product(product).await?;
        }
        info!(count, "Products seeded");
        Ok(())
    }

    /// Registers an account with its profile.
    pub async fn seed_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<AuthAccount, ApiError> {
        let account = self
            .authority
            .register(email, password, None)
            .await
            .map_err(|e| ApiError::status(400, e.to_string()))?;
        self.user_client.put_profile(UserProfile::new(account.uid.clone(), email, name)).await?;
        if role == Role::Admin {
            let patch = UserPatch { role: Some(Role::Admin), ..UserPatch::default() };
            self.user_client.update_profile(account.uid.clone(), patch).await?;
        }
        Ok(account)
    }

    pub async fn seed_order(&self, order: Order) -> Result<(), ApiError> {
        self.order_client.put_order(order).await
    }

    /// Stops every actor, even while clients are still held elsewhere.
    pub async fn shutdown(&self) -> Result<(), String> {
        info!("Shutting down memory backend...");
        let _ = self.product_client.shutdown_actor().await;
        let _ = self.order_client.shutdown_actor().await;
        let _ = self.cart_client.shutdown_actor().await;
        let _ = self.user_client.shutdown_actor().await;

        let handles: Vec<JoinHandle<()>> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }
        info!("Memory backend shutdown complete.");
        Ok(())
    }

    async fn caller(&self, bearer: &str) -> Result<Caller, ApiError> {
        let uid = self
            .authority
            .verify(bearer)
            .await
            .ok_or_else(|| ApiError::status(401, "Invalid or expired token"))?;
        let role = self.user_client.get_profile(uid.clone()).await?.map(|p| p.role).unwrap_or_default();
        Ok(Caller { uid, role })
    }

    async fn owned_line(&self, caller: &Caller, line_id: &str) -> Result<CartItem, ApiError> {
        match self.cart_client.get_cart_item(line_id.to_string()).await? {
            Some(line) if line.user_id == caller.uid => Ok(line),
            _ => Err(ApiError::status(404, format!("Cart item not found: {line_id}"))),
        }
    }

    async fn booked_times(&self, date: NaiveDate) -> Result<Vec<String>, ApiError> {
        Ok(self
            .order_client
            .list_orders()
            .await?
            .into_iter()
            .filter(|order| order.event_date == Some(date))
            .map(|order| order.delivery_time)
            .collect())
    }

    fn stored_image_url(&self, mime: &str) -> Result<String, ApiError> {
        let extension = match mime {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            other => return Err(ApiError::status(400, format!("Unsupported image type: {other}"))),
        };
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "https://storage.googleapis.com/{}/products/{n}_upload.{extension}",
            self.storage_bucket
        ))
    }
}

/// Splits a base64 `data:` URL into its media type and decoded bytes.
pub fn decode_data_url(data_url: &str) -> Option<(&str, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime, bytes))
}

fn by_id<T, F: Fn(&T) -> &str>(mut items: Vec<T>, key: F) -> Vec<T> {
    items.sort_by(|a, b| key(a).cmp(key(b)));
    items
}

#[async_trait]
impl StorefrontApi for MemoryBackend {
    #[instrument(skip(self, bearer, product), fields(name = %product.name))]
    async fn create_product(&self, bearer: &str, product: &ProductInput) -> Result<(), ApiError> {
        self.caller(bearer).await?.require_admin()?;
        let id = self.product_client.create_product(product.clone()).await?;
        info!(product_id = %id, "Product created");
        Ok(())
    }

    #[instrument(skip(self, bearer, product))]
    async fn update_product(&self, bearer: &str, id: &str, product: &ProductInput) -> Result<(), ApiError> {
        self.caller(bearer).await?.require_admin()?;
        self.product_client.replace_product(id.to_string(), product.clone()).await?;
        Ok(())
    }

    #[instrument(skip(self, bearer))]
    async fn delete_product(&self, bearer: &str, id: &str) -> Result<(), ApiError> {
        self.caller(bearer).await?.require_admin()?;
        self.product_client.delete_product(id.to_string()).await
    }

    #[instrument(skip(self, bearer, data_url))]
    async fn upload_image(&self, bearer: &str, data_url: &str) -> Result<String, ApiError> {
        self.caller(bearer).await?.require_admin()?;
        let (mime, bytes) = decode_data_url(data_url).ok_or_else(|| ApiError::status(400, "Invalid image data"))?;
        if bytes.is_empty() {
            return Err(ApiError::status(400, "Invalid image data"));
        }
        let url = self.stored_image_url(mime)?;
        info!(bytes = bytes.len(), %url, "Image stored");
        Ok(url)
    }

    async fn get_cart(&self, bearer: &str) -> Result<Vec<CartEntry>, ApiError> {
        let caller = self.caller(bearer).await?;
        let mut entries = Vec::new();
        for line in self.cart_client.lines_for(&caller.uid).await? {
            let product = self.product_client.get_product(line.product_id.clone()).await?;
            entries.push(CartEntry {
                id: line.id,
                product_id: line.product_id,
                quantity: Some(line.quantity),
                product: product.as_ref().map(CartProduct::from),
            });
        }
        Ok(entries)
    }

    #[instrument(skip(self, bearer))]
    async fn add_to_cart(&self, bearer: &str, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        let caller = self.caller(bearer).await?;
        if quantity == 0 {
            return Err(ApiError::status(400, "Quantity must be at least 1"));
        }
        if self.product_client.get_product(product_id.to_string()).await?.is_none() {
            return Err(ApiError::status(404, format!("Product not found: {product_id}")));
        }
        self.cart_client.add(&caller.uid, product_id, quantity).await?;
        Ok(())
    }

    #[instrument(skip(self, bearer))]
    async fn set_cart_quantity(&self, bearer: &str, line_id: &str, quantity: u32) -> Result<(), ApiError> {
        let caller = self.caller(bearer).await?;
        let line = self.owned_line(&caller, line_id).await?;
        self.cart_client.set_quantity(line.id, quantity).await?;
        Ok(())
    }

    #[instrument(skip(self, bearer))]
    async fn remove_cart_line(&self, bearer: &str, line_id: &str) -> Result<(), ApiError> {
        let caller = self.caller(bearer).await?;
        let line = self.owned_line(&caller, line_id).await?;
        self.cart_client.delete_cart_item(line.id).await
    }

    async fn available_times(&self, bearer: &str, date: NaiveDate) -> Result<Vec<String>, ApiError> {
        self.caller(bearer).await?;
        let booked = self.booked_times(date).await?;
        Ok(DELIVERY_SLOTS
            .iter()
            .copied()
            .filter(|slot| !booked.iter().any(|b| b.as_str() == *slot))
            .map(|slot| slot.to_string())
            .collect())
    }

    #[instrument(skip(self, bearer, order), fields(user_id = %order.user_id))]
    async fn create_order(&self, bearer: &str, order: &NewOrder) -> Result<(), ApiError> {
        let caller = self.caller(bearer).await?;
        if caller.uid != order.user_id {
            return Err(ApiError::status(403, "Orders can only be placed for yourself"));
        }
        if let Some(date) = parse_local_date(&order.event_date) {
            if self.booked_times(date).await?.contains(&order.delivery_time) {
                return Err(ApiError::status(409, format!("{} is no longer available", order.delivery_time)));
            }
        }
        let id = self.order_client.create_order(order.clone()).await?;
        let cleared = self.cart_client.clear_for(&caller.uid).await?;
        info!(order_id = %id, cleared, "Order placed");
        Ok(())
    }

    async fn list_orders(&self, bearer: &str) -> Result<Vec<Order>, ApiError> {
        self.caller(bearer).await?.require_admin()?;
        self.order_client.list_orders().await
    }

    async fn list_user_orders(&self, bearer: &str, uid: &str) -> Result<Vec<Order>, ApiError> {
        let caller = self.caller(bearer).await?;
        if caller.uid != uid {
            caller.require_admin()?;
        }
        Ok(self.order_client.list_orders().await?.into_iter().filter(|o| o.user_id == uid).collect())
    }

    #[instrument(skip(self, bearer))]
    async fn update_order_status(&self, bearer: &str, id: &str, status: OrderStatus) -> Result<(), ApiError> {
        self.caller(bearer).await?.require_admin()?;
        self.order_client.set_status(id.to_string(), status).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn products(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.product_client.list_products().await.map_err(api_to_store)?;
        Ok(by_id(products, |p| p.id.as_str()))
    }

    async fn user_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.user_client.get_profile(uid.to_string()).await.map_err(api_to_store)
    }

    async fn put_user_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.user_client.put_profile(profile.clone()).await.map_err(api_to_store)
    }

    async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.order_client.list_orders().await.map_err(api_to_store)?;
        Ok(by_id(orders, |o| o.id.as_str()))
    }

    async fn update_product_image(&self, id: &str, image_url: &str) -> Result<(), StoreError> {
        let Some(product) = self.product_client.get_product(id.to_string()).await.map_err(api_to_store)? else {
            warn!(product_id = id, "Image update for missing product");
            return Err(StoreError::Status { status: 404, message: format!("products/{id}") });
        };
        self.product_client.put_product(product.with_image(image_url)).await.map_err(api_to_store)
    }

    async fn update_order_items(&self, id: &str, items: &[OrderItem]) -> Result<(), StoreError> {
        self.order_client
            .replace_items(id.to_string(), items.to_vec())
            .await
            .map(|_| ())
            .map_err(api_to_store)
    }
}

fn api_to_store(e: ApiError) -> StoreError {
    match e {
        ApiError::Status { status, message } => StoreError::Status { status, message },
        ApiError::Transport(m) => StoreError::Transport(m),
        ApiError::Decode(m) => StoreError::Decode(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_are_decoded() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:image/png;base64,@@@").is_none());
    }

    #[tokio::test]
    async fn rejects_unknown_tokens_and_non_admins() {
        let backend = MemoryBackend::spawn(MemoryAuthority::new(), "bucket");
        let account = backend.seed_account("ana@example.com", "secret1", "Ana", Role::User).await.unwrap();
        let token = backend.authority().issue_token(&account.uid).await;

        let err = backend.get_cart("forged").await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        let err = backend.list_orders(&token).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        backend.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn booked_slots_are_not_offered() {
        let backend = MemoryBackend::spawn(MemoryAuthority::new(), "bucket");
        let account = backend.seed_account("ana@example.com", "secret1", "Ana", Role::User).await.unwrap();
        let token = backend.authority().issue_token(&account.uid).await;
        backend.seed_products(vec![Product::new("p1", "Empanadas", 1500.0, 5)]).await.unwrap();

        let order = NewOrder {
            event_date: "2025-08-08".into(),
            delivery_time: "12:00".into(),
            address: "Av. Siempre Viva 742".into(),
            people_count: 4,
            items: vec![OrderItem {
                product_id: "p1".into(),
                name: "Empanadas".into(),
                price: 1500.0,
                quantity: 2,
                image_url: String::new(),
            }],
            total: 3000.0,
            user_id: account.uid.clone(),
            user_email: account.email.clone(),
            user_name: "Ana".into(),
            status: OrderStatus::Pending,
        };
        backend.create_order(&token, &order).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 8, 8).unwrap();
        let times = backend.available_times(&token, day).await.unwrap();
        assert!(!times.contains(&"12:00".to_string()));
        assert_eq!(times.len(), DELIVERY_SLOTS.len() - 1);
        let stock = backend.product_client.get_product("p1".into()).await.unwrap().map(|p| p.stock);
        assert_eq!(stock, Some(3));

        let again = backend.create_order(&token, &order).await.unwrap_err();
        assert_eq!(again.status_code(), Some(409));
        backend.shutdown().await.unwrap();
    }
}
