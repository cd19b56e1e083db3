//! The storefront business API (bearer-authenticated JSON over HTTP).

pub mod http;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CartEntry, NewOrder, Order, OrderStatus, ProductInput};
use crate::error::ApiError;

pub use http::HttpApi;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityUpdate {
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// `POST /upload-image` body; `image` is a `data:` URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUpload {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTimes {
    #[serde(default)]
    pub available_times: Vec<String>,
}

/// Every call takes the caller's bearer credential; the API does the
/// authorisation.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn create_product(&self, bearer: &str, product: &ProductInput) -> Result<(), ApiError>;

    async fn update_product(&self, bearer: &str, id: &str, product: &ProductInput) -> Result<(), ApiError>;

    async fn delete_product(&self, bearer: &str, id: &str) -> Result<(), ApiError>;

    /// Uploads a `data:` URL and returns the stored image's public URL.
    async fn upload_image(&self, bearer: &str, data_url: &str) -> Result<String, ApiError>;

    async fn get_cart(&self, bearer: &str) -> Result<Vec<CartEntry>, ApiError>;

    async fn add_to_cart(&self, bearer: &str, product_id: &str, quantity: u32) -> Result<(), ApiError>;

    async fn set_cart_quantity(&self, bearer: &str, line_id: &str, quantity: u32) -> Result<(), ApiError>;

    async fn remove_cart_line(&self, bearer: &str, line_id: &str) -> Result<(), ApiError>;

    async fn available_times(&self, bearer: &str, date: NaiveDate) -> Result<Vec<String>, ApiError>;

    async fn create_order(&self, bearer: &str, order: &NewOrder) -> Result<(), ApiError>;

    async fn list_orders(&self, bearer: &str) -> Result<Vec<Order>, ApiError>;

    async fn list_user_orders(&self, bearer: &str, uid: &str) -> Result<Vec<Order>, ApiError>;

    async fn update_order_status(&self, bearer: &str, id: &str, status: OrderStatus) -> Result<(), ApiError>;
}
