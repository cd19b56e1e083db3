use serde::{Deserialize, Serialize};

use super::image;
use super::product::{lenient_f64, Product};

/// A cart line as returned by `GET /cart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub product: Option<CartProduct>,
}

/// The product embedded in a cart entry; looser than [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            name: Some(product.name.clone()),
            price: product.price,
            image_url: Some(product.image_url.clone()),
        }
    }
}

/// The local mirror of one cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub image_url: String,
    pub quantity: u32,
}

impl CartLine {
    /// Maps a wire entry; entries without an embedded product are dropped.
    pub fn from_entry(entry: CartEntry, placeholder: &str) -> Option<Self> {
        let product = entry.product?;
        Some(Self {
            id: entry.id,
            product_id: entry.product_id,
            name: product.name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Unnamed".to_string()),
            price: product.price,
            image_url: image::display_url(product.image_url.as_deref(), placeholder),
            quantity: entry.quantity.filter(|q| *q > 0).unwrap_or(1),
        })
    }

    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines.iter().map(CartLine::subtotal).sum()
}

pub fn cart_count(lines: &[CartLine]) -> u32 {
    lines.iter().map(|line| line.quantity).sum()
}
