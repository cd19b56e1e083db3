use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::dates;
use super::product::{lenient_f64, lenient_u32, null_as_default};

/// Order lifecycle states. There is no transition graph: an admin may set
/// any state from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProgress,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::InProgress,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::InProgress => "InProgress",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(text: &str) -> Option<OrderStatus> {
        OrderStatus::ALL.into_iter().find(|s| s.as_str() == text)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line data copied into the order at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default = "one", deserialize_with = "lenient_u32")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
}

fn one() -> u32 {
    1
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// A customer order.
///
/// Every date field is normalised on decode; see [`dates`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(default, deserialize_with = "dates::local_date")]
    pub event_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delivery_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub people_count: u32,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "dates::instant")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The checkout payload sent to `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Calendar day as `YYYY-MM-DD`.
    pub event_date: String,
    pub delivery_time: String,
    pub address: String,
    pub people_count: u32,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// Newest first; orders without a timestamp go last.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<OrderStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_str).and_then(OrderStatus::parse))
}
