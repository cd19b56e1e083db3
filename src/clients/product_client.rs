use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{Product, ProductInput};
use crate::error::ApiError;
use crate::product_actor::{ProductAction, ProductActionResult};

/// Client for the product actor.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl_basic_client!(ProductClient, Product, ApiError, product);

impl ProductClient {
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: ProductInput) -> Result<String, ApiError> {
        debug!("Sending request");
        self.inner.create(input).await.map_err(ApiError::from)
    }

    #[instrument(skip(self, input))]
    pub async fn replace_product(&self, id: String, input: ProductInput) -> Result<Product, ApiError> {
        debug!("Sending request");
        self.inner.update(id, input).await.map_err(ApiError::from)
    }

    /// Returns the stock left after the reservation.
    #[instrument(skip(self))]
    pub async fn reserve_stock(&self, id: String, quantity: u32) -> Result<u32, ApiError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::ReserveStock(quantity)).await? {
            ProductActionResult::ReserveStock(left) => Ok(left),
            other => Err(ApiError::Decode(format!("Unexpected result: {other:?}"))),
        }
    }

    #[instrument(skip(self))]
    pub async fn release_stock(&self, id: String, quantity: u32) -> Result<u32, ApiError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::ReleaseStock(quantity)).await? {
            ProductActionResult::ReleaseStock(level) => Ok(level),
            other => Err(ApiError::Decode(format!("Unexpected result: {other:?}"))),
        }
    }
}
