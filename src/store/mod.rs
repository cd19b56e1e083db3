//! Document database seam (`products`, `users`, `orders` collections).

pub mod codec;
pub mod firestore;

use async_trait::async_trait;

use crate::domain::{Order, OrderItem, Product, UserProfile};
use crate::error::StoreError;

pub use firestore::FirestoreStore;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn products(&self) -> Result<Vec<Product>, StoreError>;

    async fn user_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Creates or overwrites `users/{profile.id}`.
    async fn put_user_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn update_product_image(&self, id: &str, image_url: &str) -> Result<(), StoreError>;

    async fn update_order_items(&self, id: &str, items: &[OrderItem]) -> Result<(), StoreError>;
}
