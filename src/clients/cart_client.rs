use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::cart_actor::{CartAction, CartActionResult, CartItem, CartItemCreate};
use crate::error::ApiError;

/// Client for the cart actor.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<CartItem>,
}

impl_basic_client!(CartClient, CartItem, ApiError, cart_item);

impl CartClient {
    pub async fn lines_for(&self, user_id: &str) -> Result<Vec<CartItem>, ApiError> {
        let mut lines: Vec<CartItem> =
            self.inner.list().await?.into_iter().filter(|line| line.user_id == user_id).collect();
        lines.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(lines)
    }

    /// Adds `quantity` units, merging into the user's existing line for the
    /// product. Returns the line id.
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: &str, product_id: &str, quantity: u32) -> Result<String, ApiError> {
        debug!("Sending request");
        let existing = self.lines_for(user_id).await?.into_iter().find(|line| line.product_id == product_id);
        match existing {
            Some(line) => match self.inner.perform_action(line.id.clone(), CartAction::AddQuantity(quantity)).await? {
                CartActionResult::AddQuantity(total) => {
                    info!(line_id = %line.id, total, "Cart line merged");
                    Ok(line.id)
                }
            },
            None => {
                let params = CartItemCreate {
                    user_id: user_id.to_string(),
                    product_id: product_id.to_string(),
                    quantity,
                };
                self.inner.create(params).await.map_err(ApiError::from)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(&self, id: String, quantity: u32) -> Result<CartItem, ApiError> {
        debug!("Sending request");
        self.inner.update(id, quantity).await.map_err(ApiError::from)
    }

    #[instrument(skip(self))]
    pub async fn clear_for(&self, user_id: &str) -> Result<usize, ApiError> {
        debug!("Sending request");
        let lines = self.lines_for(user_id).await?;
        let count = lines.len();
        for line in lines {
            self.inner.delete(line.id).await?;
        }
        Ok(count)
    }
}
