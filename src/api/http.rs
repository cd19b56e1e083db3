use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{AddToCart, AvailableTimes, ImageUpload, QuantityUpdate, StatusUpdate, StorefrontApi, UploadedImage};
use crate::config::StorefrontConfig;
use crate::domain::{CartEntry, NewOrder, Order, OrderStatus, ProductInput};
use crate::error::ApiError;

/// Some deployments answer `/available-times` with a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum TimesBody {
    List(Vec<String>),
    Wrapped(AvailableTimes),
}

/// reqwest client for the storefront API.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {e}")))?;
        let base_url = Url::parse(config.api_base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::Transport(format!("Invalid API base URL: {}", config.api_base_url)))?;
        Ok(Self { client, base_url })
    }

    /// Appends `segments` to the base path, percent-encoding each one so an
    /// id can never change the route.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("Invalid API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str], bearer: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.url(segments)?).bearer_auth(bearer))
    }

    /// Non-2xx responses become `ApiError::Status` with the body's
    /// `message`, or a generic one when the body has none.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ApiError::generic_message(status.as_u16()));
        warn!(status = status.as_u16(), %message, "API request failed");
        Err(ApiError::status(status.as_u16(), message))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    fn with_body<B: Serialize + ?Sized>(request: RequestBuilder, body: &B) -> RequestBuilder {
        request.json(body)
    }
}

#[async_trait]
impl StorefrontApi for HttpApi {
    #[instrument(skip(self, bearer, product), fields(name = %product.name))]
    async fn create_product(&self, bearer: &str, product: &ProductInput) -> Result<(), ApiError> {
        debug!("Sending request");
        self.execute(Self::with_body(self.request(Method::POST, &["products"], bearer)?, product)).await
    }

    #[instrument(skip(self, bearer, product))]
    async fn update_product(&self, bearer: &str, id: &str, product: &ProductInput) -> Result<(), ApiError> {
        debug!("Sending request");
        self.execute(Self::with_body(self.request(Method::PUT, &["products", id], bearer)?, product)).await
    }

    #[instrument(skip(self, bearer))]
    async fn delete_product(&self, bearer: &str, id: &str) -> Result<(), ApiError> {
        debug!("Sending request");
        self.execute(self.request(Method::DELETE, &["products", id], bearer)?).await
    }

    #[instrument(skip(self, bearer, data_url), fields(bytes = data_url.len()))]
    async fn upload_image(&self, bearer: &str, data_url: &str) -> Result<String, ApiError> {
        debug!("Sending request");
        let body = ImageUpload { image: data_url.to_string() };
        let uploaded: UploadedImage =
            self.fetch(Self::with_body(self.request(Method::POST, &["upload-image"], bearer)?, &body)).await?;
        Ok(uploaded.image_url)
    }

    #[instrument(skip(self, bearer))]
    async fn get_cart(&self, bearer: &str) -> Result<Vec<CartEntry>, ApiError> {
        debug!("Sending request");
        self.fetch(self.request(Method::GET, &["cart"], bearer)?).await
    }

    #[instrument(skip(self, bearer))]
    async fn add_to_cart(&self, bearer: &str, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        debug!("Sending request");
        let body = AddToCart { product_id: product_id.to_string(), quantity };
        self.execute(Self::with_body(self.request(Method::POST, &["cart"], bearer)?, &body)).await
    }

    #[instrument(skip(self, bearer))]
    async fn set_cart_quantity(&self, bearer: &str, line_id: &str, quantity: u32) -> Result<(), ApiError> {
        debug!("Sending request");
        let request = self.request(Method::PUT, &["cart", line_id], bearer)?;
        self.execute(Self::with_body(request, &QuantityUpdate { quantity })).await
    }

    #[instrument(skip(self, bearer))]
    async fn remove_cart_line(&self, bearer: &str, line_id: &str) -> Result<(), ApiError> {
        debug!("Sending request");
        self.execute(self.request(Method::DELETE, &["cart", line_id], bearer)?).await
    }

    #[instrument(skip(self, bearer))]
    async fn available_times(&self, bearer: &str, date: NaiveDate) -> Result<Vec<String>, ApiError> {
        debug!("Sending request");
        let day = date.format("%Y-%m-%d").to_string();
        let request = self.request(Method::GET, &["available-times"], bearer)?.query(&[("date", day.as_str())]);
        Ok(match self.fetch::<TimesBody>(request).await? {
            TimesBody::List(times) => times,
            TimesBody::Wrapped(wrapped) => wrapped.available_times,
        })
    }

    #[instrument(skip(self, bearer, order), fields(items = order.items.len(), total = order.total))]
    async fn create_order(&self, bearer: &str, order: &NewOrder) -> Result<(), ApiError> {
        debug!("Sending request");
        self.execute(Self::with_body(self.request(Method::POST, &["orders"], bearer)?, order)).await
    }

    #[instrument(skip(self, bearer))]
    async fn list_orders(&self, bearer: &str) -> Result<Vec<Order>, ApiError> {
        debug!("Sending request");
        self.fetch(self.request(Method::GET, &["orders"], bearer)?).await
    }

    #[instrument(skip(self, bearer))]
    async fn list_user_orders(&self, bearer: &str, uid: &str) -> Result<Vec<Order>, ApiError> {
        debug!("Sending request");
        self.fetch(self.request(Method::GET, &["users", uid, "orders"], bearer)?).await
    }

    #[instrument(skip(self, bearer))]
    async fn update_order_status(&self, bearer: &str, id: &str, status: OrderStatus) -> Result<(), ApiError> {
        debug!("Sending request");
        let request = self.request(Method::PUT, &["orders", id], bearer)?;
        self.execute(Self::with_body(request, &StatusUpdate { status })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::{delete, get, put},
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(router: Router) -> HttpApi {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config = StorefrontConfig { api_base_url: format!("http://{addr}"), ..StorefrontConfig::default() };
        HttpApi::new(&config).unwrap()
    }

    #[tokio::test]
    async fn error_bodies_surface_their_message() {
        let router = Router::new()
            .route("/cart", get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "Token expired"}))) }))
            .route("/orders", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));
        let api = serve(router).await;

        let err = api.get_cart("t").await.unwrap_err();
        assert_eq!(err, ApiError::status(401, "Token expired"));
        assert!(err.is_auth_failure());

        let err = api.list_orders("t").await.unwrap_err();
        assert_eq!(err, ApiError::status(500, "Error 500: request failed"));
    }

    #[tokio::test]
    async fn sends_bearer_and_decodes_cart() {
        let router = Router::new().route(
            "/cart",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer tok-1");
                Json(json!([
                    {"id": "c1", "productId": "p1", "quantity": 2, "product": {"name": "Pie", "price": "1500"}},
                    {"id": "c2", "productId": "gone"}
                ]))
            }),
        );
        let api = serve(router).await;
        let entries = api.get_cart("tok-1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].quantity, Some(2));
        assert!(entries[1].product.is_none());
    }

    #[tokio::test]
    async fn cart_quantity_goes_to_the_line() {
        let router = Router::new().route(
            "/cart/:id",
            put(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(id, "c7");
                assert_eq!(body, json!({"quantity": 3}));
                Json(json!({"ok": true}))
            }),
        );
        let api = serve(router).await;
        api.set_cart_quantity("t", "c7", 3).await.unwrap();
    }

    #[tokio::test]
    async fn ids_are_encoded_as_single_segments() {
        let router = Router::new()
            .route(
                "/products/:id",
                delete(|Path(id): Path<String>| async move {
                    assert_eq!(id, "a/b?c#d");
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/users/:uid/orders",
                get(|Path(uid): Path<String>| async move {
                    assert_eq!(uid, "u 1/x");
                    Json(json!([]))
                }),
            );
        let api = serve(router).await;
        api.delete_product("t", "a/b?c#d").await.unwrap();
        assert!(api.list_user_orders("t", "u 1/x").await.unwrap().is_empty());
    }

    #[test]
    fn base_path_prefixes_every_route() {
        let config = StorefrontConfig { api_base_url: "http://localhost:3001/api/".into(), ..StorefrontConfig::default() };
        let api = HttpApi::new(&config).unwrap();
        assert_eq!(api.url(&["orders", "o/1"]).unwrap().as_str(), "http://localhost:3001/api/orders/o%2F1");
    }

    #[tokio::test]
    async fn available_times_accepts_both_shapes() {
        let router = Router::new()
            .route(
                "/available-times",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    match q.get("date").map(String::as_str) {
                        Some("2025-08-08") => Json(json!(["12:00", "13:00"])),
                        _ => Json(json!({"availableTimes": ["18:00"]})),
                    }
                }),
            );
        let api = serve(router).await;
        let day = NaiveDate::from_ymd_opt(2025, 8, 8).unwrap();
        assert_eq!(api.available_times("t", day).await.unwrap(), ["12:00", "13:00"]);
        let other = NaiveDate::from_ymd_opt(2025, 8, 9).unwrap();
        assert_eq!(api.available_times("t", other).await.unwrap(), ["18:00"]);
    }
}
