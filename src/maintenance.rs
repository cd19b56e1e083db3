//! One-off repair of stored image references.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, instrument};

use crate::domain::OrderItem;
use crate::error::StoreError;
use crate::store::DocumentStore;

fn stored_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+_\w+\.(jpg|png|jpeg)$").expect("valid stored file pattern"))
}

fn dimension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(1920x1080|400x300|64x64)$").expect("valid dimension pattern"))
}

fn storage_url(bucket: &str, file: &str) -> String {
    format!("https://storage.googleapis.com/{bucket}/products/{file}")
}

/// The corrected product image, or `None` when it is already fine.
pub fn repair_product_image(current: &str, bucket: &str, placeholder: &str) -> Option<String> {
    let repaired = if stored_file_pattern().is_match(current) {
        storage_url(bucket, current)
    } else if current.is_empty() || !current.starts_with("http") || current.contains("via.placeholder.com") {
        placeholder.to_string()
    } else {
        return None;
    };
    (repaired != current).then_some(repaired)
}

/// The corrected order item image, or `None` when it is already fine.
pub fn repair_item_image(current: &str, bucket: &str, placeholder: &str) -> Option<String> {
    if current.is_empty() || dimension_pattern().is_match(current) {
        (current != placeholder).then(|| placeholder.to_string())
    } else if !current.starts_with("http") {
        Some(storage_url(bucket, current))
    } else {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub dry_run: bool,
    /// `(product id, new image url)`
    pub products: Vec<(String, String)>,
    pub orders: Vec<String>,
}

impl RepairReport {
    pub fn changed(&self) -> usize {
        self.products.len() + self.orders.len()
    }
}

pub struct ImageRepair {
    store: Arc<dyn DocumentStore>,
    bucket: String,
    placeholder: String,
}

impl ImageRepair {
    pub fn new(store: Arc<dyn DocumentStore>, bucket: &str, placeholder: &str) -> Self {
        Self { store, bucket: bucket.to_string(), placeholder: placeholder.to_string() }
    }

    /// Rewrites only the documents whose references change. With
    /// `dry_run` nothing is written.
    #[instrument(skip(self))]
    pub async fn run(&self, dry_run: bool) -> Result<RepairReport, StoreError> {
        let mut report = RepairReport { dry_run, ..RepairReport::default() };

        for product in self.store.products().await? {
            let Some(url) = repair_product_image(&product.image_url, &self.bucket, &self.placeholder) else {
                continue;
            };
            if !dry_run {
                self.store.update_product_image(&product.id, &url).await?;
            }
            info!(product_id = %product.id, %url, dry_run, "Product image repaired");
            report.products.push((product.id, url));
        }

        for order in self.store.orders().await? {
            let mut changed = false;
            let items: Vec<OrderItem> = order
                .items
                .into_iter()
                .map(|item| match repair_item_image(&item.image_url, &self.bucket, &self.placeholder) {
                    Some(image_url) => {
                        changed = true;
                        OrderItem { image_url, ..item }
                    }
                    None => item,
                })
                .collect();
            if !changed {
                continue;
            }
            if !dry_run {
                self.store.update_order_items(&order.id, &items).await?;
            }
            info!(order_id = %order.id, dry_run, "Order item images repaired");
            report.orders.push(order.id);
        }

        info!(changed = report.changed(), dry_run, "Image repair finished");
        Ok(report)
    }
}
