use tracing::{error, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::clients::ProductClient;
use crate::domain::{NewOrder, Order, OrderItem, OrderStatus};
use crate::error::ApiError;
use crate::order_actor::{OrderAction, OrderActionResult, OrderPatch};

/// Client for the order actor.
///
/// Order creation is orchestrated here: every line's product is checked and
/// its stock reserved before the order is stored. A failure part-way through
/// releases what was already reserved.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    product_client: ProductClient,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>, product_client: ProductClient) -> Self {
        Self { inner, product_client }
    }

    #[instrument(skip(self, order), fields(user_id = %order.user_id, items = order.items.len()))]
    pub async fn create_order(&self, order: NewOrder) -> Result<String, ApiError> {
        info!("Processing create_order request");

        let mut reserved: Vec<(String, u32)> = Vec::new();
        for item in &order.items {
            let outcome = match self.product_client.get_product(item.product_id.clone()).await {
                Ok(Some(_)) => self.product_client.reserve_stock(item.product_id.clone(), item.quantity).await,
                Ok(None) => Err(ApiError::status(400, format!("Invalid product: {}", item.product_id))),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(left) => {
                    info!(product_id = %item.product_id, left, "Stock reserved");
                    reserved.push((item.product_id.clone(), item.quantity));
                }
                Err(e) => {
                    error!(product_id = %item.product_id, error = %e, "Stock reservation failed");
                    self.release(reserved).await;
                    return Err(e);
                }
            }
        }

        match self.inner.create(order).await {
            Ok(id) => {
                info!(order_id = %id, "Order stored");
                Ok(id)
            }
            Err(e) => {
                error!(error = %e, "Order rejected");
                self.release(reserved).await;
                Err(e.into())
            }
        }
    }

    async fn release(&self, reserved: Vec<(String, u32)>) {
        for (product_id, quantity) in reserved {
            if let Err(e) = self.product_client.release_stock(product_id.clone(), quantity).await {
                warn!(product_id = %product_id, error = %e, "Could not release stock");
            }
        }
    }

    /// Returns the previous status.
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: String, status: OrderStatus) -> Result<Option<OrderStatus>, ApiError> {
        match self.inner.perform_action(id, OrderAction::SetStatus(status)).await? {
            OrderActionResult::SetStatus(previous) => {
                info!(from = ?previous, to = %status, "Order status changed");
                Ok(previous)
            }
        }
    }

    #[instrument(skip(self, items))]
    pub async fn replace_items(&self, id: String, items: Vec<OrderItem>) -> Result<Order, ApiError> {
        self.inner
            .update(id, OrderPatch { items: Some(items) })
            .await
            .map_err(ApiError::from)
    }
}

impl_client_methods!(OrderClient, Order, ApiError, order);
