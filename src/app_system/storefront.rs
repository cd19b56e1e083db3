use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::memory_backend::MemoryBackend;
use crate::admin::ProductEditor;
use crate::api::{HttpApi, StorefrontApi};
use crate::cart::{CartBadge, CartBadgeService, CartEvents, CartWorkflow};
use crate::catalog::CatalogView;
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::feedback::{Feedback, UiEvent};
use crate::identity::{FirebaseIdentity, IdentityProvider, MemoryAuthority};
use crate::maintenance::ImageRepair;
use crate::orders::{AdminOrders, OrderHistory};
use crate::session::SessionContext;
use crate::store::{DocumentStore, FirestoreStore};

/// Everything a workflow needs, injected at construction.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn StorefrontApi>,
    pub store: Arc<dyn DocumentStore>,
    pub session: SessionContext,
    pub feedback: Feedback,
    pub cart_events: CartEvents,
    pub product_placeholder: String,
    pub thumbnail_placeholder: String,
}

/// Wires the remote seams, the session and the cart badge together and
/// owns their shutdown.
pub struct Storefront {
    services: Services,
    badge: CartBadge,
    badge_handle: JoinHandle<()>,
    backend: Option<Arc<MemoryBackend>>,
    storage_bucket: String,
}

impl Storefront {
    /// Runs against the in-process backend; no network access is needed.
    pub fn in_memory(config: &StorefrontConfig) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let authority = MemoryAuthority::new();
        let backend = MemoryBackend::spawn(authority.clone(), config.storage_bucket.clone());
        let identity: Arc<dyn IdentityProvider> = Arc::new(authority.identity());
        let api: Arc<dyn StorefrontApi> = backend.clone();
        let store: Arc<dyn DocumentStore> = backend.clone();
        info!("Starting storefront on the memory backend");
        Self::assemble(config, identity, api, store, Some(backend))
    }

    /// Runs against the hosted identity service, document database and API.
    pub fn remote(config: &StorefrontConfig) -> Result<(Self, mpsc::UnboundedReceiver<UiEvent>), StorefrontError> {
        let api_key = config.require_api_key()?;
        let identity: Arc<dyn IdentityProvider> = Arc::new(FirebaseIdentity::new(api_key, config.http_timeout)?);
        let store: Arc<dyn DocumentStore> = Arc::new(FirestoreStore::new(config, Some(identity.clone()))?);
        let api: Arc<dyn StorefrontApi> = Arc::new(HttpApi::new(config)?);
        info!(api = %config.api_base_url, project = %config.firebase_project_id, "Starting storefront");
        Ok(Self::assemble(config, identity, api, store, None))
    }

    fn assemble(
        config: &StorefrontConfig,
        identity: Arc<dyn IdentityProvider>,
        api: Arc<dyn StorefrontApi>,
        store: Arc<dyn DocumentStore>,
        backend: Option<Arc<MemoryBackend>>,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (feedback, notices) = Feedback::channel();
        let services = Services {
            api,
            session: SessionContext::new(identity, store.clone()),
            store,
            feedback,
            cart_events: CartEvents::default(),
            product_placeholder: config.product_placeholder.clone(),
            thumbnail_placeholder: config.thumbnail_placeholder.clone(),
        };

        let (badge_service, badge) = CartBadgeService::new(16, &services);
        let badge_handle = tokio::spawn(badge_service.run());

        let storefront = Self {
            services,
            badge,
            badge_handle,
            backend,
            storage_bucket: config.storage_bucket.clone(),
        };
        (storefront, notices)
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn session(&self) -> &SessionContext {
        &self.services.session
    }

    /// Present only when running on the memory backend.
    pub fn backend(&self) -> Option<&Arc<MemoryBackend>> {
        self.backend.as_ref()
    }

    pub fn badge(&self) -> &CartBadge {
        &self.badge
    }

    pub fn catalog(&self) -> CatalogView {
        CatalogView::new(self.services.clone())
    }

    pub async fn cart(&self) -> CartWorkflow {
        CartWorkflow::open(self.services.clone()).await
    }

    pub fn order_history(&self) -> OrderHistory {
        OrderHistory::new(self.services.clone())
    }

    pub fn admin_orders(&self) -> AdminOrders {
        AdminOrders::new(self.services.clone())
    }

    pub fn product_editor(&self) -> ProductEditor {
        ProductEditor::new(self.services.clone())
    }

    pub fn image_repair(&self) -> ImageRepair {
        ImageRepair::new(self.services.store.clone(), &self.storage_bucket, &self.services.product_placeholder)
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down storefront...");
        self.badge.shutdown().await;
        if let Err(e) = self.badge_handle.await {
            error!("Cart badge task failed: {:?}", e);
            return Err(format!("Cart badge task failed: {:?}", e));
        }
        if let Some(backend) = self.backend {
            backend.shutdown().await?;
        }
        info!("Storefront shutdown complete.");
        Ok(())
    }
}
