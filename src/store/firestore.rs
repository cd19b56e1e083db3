use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::codec::{decode_document, encode_fields, encode_value};
use super::DocumentStore;
use crate::config::StorefrontConfig;
use crate::domain::{Order, OrderItem, Product, UserProfile};
use crate::error::{AuthError, StoreError};
use crate::identity::IdentityProvider;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: &str = "300";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Firestore over its REST surface.
///
/// Requests carry the signed-in user's bearer token when an identity
/// provider is attached and has a session; otherwise they go out with the
/// API key only and rely on the database's public read rules.
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: String,
    api_key: Option<String>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl FirestoreStore {
    pub fn new(config: &StorefrontConfig, identity: Option<Arc<dyn IdentityProvider>>) -> Result<Self, StoreError> {
        Self::with_base_url(FIRESTORE_BASE, config, identity)
    }

    pub fn with_base_url(
        base_url: &str,
        config: &StorefrontConfig,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                config.firebase_project_id
            ),
            api_key: config.firebase_api_key.clone(),
            identity,
        })
    }

    async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, StoreError> {
        let mut request = request;
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        match &self.identity {
            Some(identity) => match identity.fresh_token().await {
                Ok(token) => Ok(request.bearer_auth(token)),
                Err(AuthError::NotSignedIn) => Ok(request),
                Err(e) => Err(StoreError::Transport(e.to_string())),
            },
            None => Ok(request),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();
        warn!(status = status.as_u16(), %message, "Document store request failed");
        Err(StoreError::Status { status: status.as_u16(), message })
    }

    async fn list_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/{collection}", self.documents_url);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListPage = self
                .send(request)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            for document in &page.documents {
                let plain = decode_document(document)?;
                items.push(serde_json::from_value(plain).map_err(|e| StoreError::Decode(e.to_string()))?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        debug!(collection, count = items.len(), "Collection listed");
        Ok(items)
    }

    /// Overwrites only `fields`, failing when the document does not exist.
    async fn patch_fields(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        let url = format!("{}/{path}", self.documents_url);
        let mask: Vec<(&str, &str)> = fields
            .as_object()
            .map(|map| map.keys().map(|k| ("updateMask.fieldPaths", k.as_str())).collect())
            .unwrap_or_default();
        let request = self
            .client
            .patch(&url)
            .query(&mask)
            .query(&[("currentDocument.exists", "true")])
            .json(&json!({ "fields": fields }));
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, StoreError> {
        debug!("Sending request");
        self.list_collection("products").await
    }

    #[instrument(skip(self))]
    async fn user_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        debug!("Sending request");
        let url = format!("{}/users/{uid}", self.documents_url);
        match self.send(self.client.get(&url)).await {
            Ok(response) => {
                let document: Value = response.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
                let plain = decode_document(&document)?;
                serde_json::from_value(plain).map(Some).map_err(|e| StoreError::Decode(e.to_string()))
            }
            Err(StoreError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, profile), fields(uid = %profile.id))]
    async fn put_user_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        debug!("Sending request");
        let url = format!("{}/users/{}", self.documents_url, profile.id);
        let plain = serde_json::to_value(profile).map_err(|e| StoreError::Decode(e.to_string()))?;
        let fields = encode_fields(&plain, &["createdAt"])?;
        self.send(self.client.patch(&url).json(&json!({ "fields": fields }))).await?;
        info!("User profile stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        debug!("Sending request");
        self.list_collection("orders").await
    }

    #[instrument(skip(self))]
    async fn update_product_image(&self, id: &str, image_url: &str) -> Result<(), StoreError> {
        debug!("Sending request");
        self.patch_fields(&format!("products/{id}"), json!({ "imageUrl": encode_value(&json!(image_url)) }))
            .await
    }

    #[instrument(skip(self, items))]
    async fn update_order_items(&self, id: &str, items: &[OrderItem]) -> Result<(), StoreError> {
        debug!("Sending request");
        let plain = serde_json::to_value(items).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.patch_fields(&format!("orders/{id}"), json!({ "items": encode_value(&plain) })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn product_doc(id: &str, name: &str) -> Value {
        json!({
            "name": format!("projects/demo/databases/(default)/documents/products/{id}"),
            "fields": {"name": {"stringValue": name}, "price": {"integerValue": "1000"}, "category": {"stringValue": "Lunch"}}
        })
    }

    #[tokio::test]
    async fn lists_every_page() {
        let router = Router::new().route(
            "/projects/demo/databases/(default)/documents/products",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("pageToken").map(String::as_str) {
                    None => Json(json!({"documents": [product_doc("a", "Pie")], "nextPageToken": "p2"})),
                    Some("p2") => Json(json!({"documents": [product_doc("b", "Tea")]})),
                    Some(_) => Json(json!({})),
                }
            }),
        );
        let base = serve(router).await;
        let config = StorefrontConfig { firebase_project_id: "demo".into(), ..StorefrontConfig::default() };
        let store = FirestoreStore::with_base_url(&base, &config, None).unwrap();

        let products = store.products().await.unwrap();
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(products[0].price, 1000.0);
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let router = Router::new().route(
            "/projects/demo/databases/(default)/documents/users/:uid",
            get(|Path(uid): Path<String>| async move {
                if uid == "u1" {
                    (StatusCode::OK, Json(json!({
                        "name": "projects/demo/databases/(default)/documents/users/u1",
                        "fields": {"email": {"stringValue": "a@b.cl"}, "role": {"stringValue": "admin"}}
                    })))
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({"error": {"code": 404, "message": "not found"}})))
                }
            }),
        );
        let base = serve(router).await;
        let config = StorefrontConfig { firebase_project_id: "demo".into(), ..StorefrontConfig::default() };
        let store = FirestoreStore::with_base_url(&base, &config, None).unwrap();

        let profile = store.user_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.id, "u1");
        assert!(matches!(profile.role, crate::domain::Role::Admin));
        assert_eq!(store.user_profile("nobody").await.unwrap(), None);
    }
}
