use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{UserPatch, UserProfile};
use crate::error::ApiError;

/// Client for the user profile actor.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<UserProfile>,
}

impl_basic_client!(UserClient, UserProfile, ApiError, profile);

impl UserClient {
    #[instrument(skip(self))]
    pub async fn update_profile(&self, id: String, patch: UserPatch) -> Result<UserProfile, ApiError> {
        debug!("Sending request");
        self.inner.update(id, patch).await.map_err(ApiError::from)
    }
}
