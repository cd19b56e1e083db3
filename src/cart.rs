//! Cart workflow, checkout validation and the cart badge service.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::StorefrontApi;
use crate::app_system::Services;
use crate::domain::dates::parse_local_date;
use crate::domain::{cart_count, cart_total, CartLine, CurrentUser, NewOrder, OrderItem, OrderStatus};
use crate::error::{StorefrontError, ValidationError};
use crate::format::format_price;
use crate::routes::Route;
use crate::session::{SessionContext, SessionState};

// =============================================================================
// Cart events
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    Added { product_id: String },
    Updated { line_id: String, quantity: u32 },
    Removed { line_id: String },
    CheckedOut,
}

/// Broadcast of cart changes; every view showing cart data subscribes.
#[derive(Debug, Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartEvent>,
}

impl CartEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: CartEvent) {
        debug!(?event, "Cart event");
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.sender.subscribe()
    }
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

// =============================================================================
// Cart badge service
// =============================================================================

#[derive(Debug)]
pub enum BadgeRequest {
    Refresh { respond_to: oneshot::Sender<u32> },
    Shutdown,
}

/// Keeps the navigation bar's item count in sync with the server cart.
///
/// Refetches on every cart event and every session change.
pub struct CartBadgeService {
    receiver: mpsc::Receiver<BadgeRequest>,
    events: broadcast::Receiver<CartEvent>,
    session_changes: watch::Receiver<SessionState>,
    session: SessionContext,
    api: Arc<dyn StorefrontApi>,
    count: watch::Sender<u32>,
}

impl CartBadgeService {
    pub fn new(buffer_size: usize, services: &Services) -> (Self, CartBadge) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (count, count_rx) = watch::channel(0);
        let service = Self {
            receiver,
            events: services.cart_events.subscribe(),
            session_changes: services.session.subscribe(),
            session: services.session.clone(),
            api: services.api.clone(),
            count,
        };
        (service, CartBadge { sender, count: count_rx })
    }

    #[instrument(name = "cart_badge", skip(self))]
    pub async fn run(mut self) {
        info!("CartBadgeService starting");
        self.refresh().await;
        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(BadgeRequest::Refresh { respond_to }) => {
                        let count = self.refresh().await;
                        let _ = respond_to.send(count);
                    }
                    Some(BadgeRequest::Shutdown) | None => break,
                },
                event = self.events.recv() => match event {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        self.refresh().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = self.session_changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.refresh().await;
                }
            }
        }
        info!("CartBadgeService stopped");
    }

    /// Failed fetches keep the last known count.
    async fn refresh(&mut self) -> u32 {
        let session = self.session.current();
        let count = match session.user() {
            Some(user) if !user.is_admin() => match self.fetch_count().await {
                Ok(count) => count,
                Err(e) => {
                    warn!(error = %e, "Could not refresh cart count");
                    *self.count.borrow()
                }
            },
            _ => 0,
        };
        self.count.send_replace(count);
        count
    }

    async fn fetch_count(&self) -> Result<u32, StorefrontError> {
        let bearer = self.session.bearer().await?;
        let entries = self.api.get_cart(&bearer).await?;
        let lines: Vec<CartLine> = entries.into_iter().filter_map(|e| CartLine::from_entry(e, "")).collect();
        Ok(cart_count(&lines))
    }
}

#[derive(Clone)]
pub struct CartBadge {
    sender: mpsc::Sender<BadgeRequest>,
    count: watch::Receiver<u32>,
}

impl CartBadge {
    pub fn count(&self) -> u32 {
        *self.count.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.count.clone()
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<u32, String> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender.send(BadgeRequest::Refresh { respond_to }).await.map_err(|e| e.to_string())?;
        response.await.map_err(|e| e.to_string())
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(BadgeRequest::Shutdown).await;
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Raw scheduling fields as typed by the customer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutForm {
    pub event_date: String,
    pub delivery_time: String,
    pub address: String,
    pub people_count: String,
}

/// A checkout that passed every local check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCheckout {
    pub event_date: NaiveDate,
    pub delivery_time: String,
    pub address: String,
    pub people_count: u32,
}

/// Local checks, in the order their messages are shown. Nothing here
/// touches the network.
pub fn validate_checkout(
    user: Option<&CurrentUser>,
    form: &CheckoutForm,
    lines: &[CartLine],
    available_times: &[String],
) -> Result<ValidCheckout, ValidationError> {
    let user = user.ok_or(ValidationError::NotSignedIn)?;
    if user.is_admin() {
        return Err(ValidationError::AdminCart);
    }
    let event_date = form.event_date.trim();
    if event_date.is_empty() {
        return Err(ValidationError::MissingEventDate);
    }
    let delivery_time = form.delivery_time.trim();
    if delivery_time.is_empty() {
        return Err(ValidationError::MissingDeliveryTime);
    }
    let address = form.address.trim();
    if address.is_empty() {
        return Err(ValidationError::MissingAddress);
    }
    let people_count = form.people_count.trim();
    if people_count.is_empty() {
        return Err(ValidationError::MissingPeopleCount);
    }
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    let date = parse_local_date(event_date).ok_or_else(|| ValidationError::InvalidEventDate(event_date.to_string()))?;
    if !available_times.iter().any(|t| t == delivery_time) {
        return Err(ValidationError::UnavailableDeliveryTime(delivery_time.to_string()));
    }
    let people_count = match people_count.parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => return Err(ValidationError::InvalidPeopleCount),
    };
    Ok(ValidCheckout {
        event_date: date,
        delivery_time: delivery_time.to_string(),
        address: address.to_string(),
        people_count,
    })
}

// =============================================================================
// Cart workflow
// =============================================================================

pub struct CartWorkflow {
    services: Services,
    lines: Vec<CartLine>,
    pub form: CheckoutForm,
    available_times: Vec<String>,
}

impl CartWorkflow {
    pub fn new(services: Services) -> Self {
        Self { services, lines: Vec::new(), form: CheckoutForm::default(), available_times: Vec::new() }
    }

    /// Creates the workflow and loads the cart; a failed load leaves it empty.
    pub async fn open(services: Services) -> Self {
        let mut workflow = Self::new(services);
        let _ = workflow.load().await;
        workflow
    }

    /// Signed-out and admin sessions get an empty cart without a request.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), StorefrontError> {
        let session = self.services.session.current();
        match session.user() {
            Some(user) if !user.is_admin() => {}
            _ => {
                self.lines.clear();
                return Ok(());
            }
        }
        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.get_cart(&bearer).await?)
        }
        .await;
        match result {
            Ok(entries) => {
                let placeholder = &self.services.thumbnail_placeholder;
                self.lines = entries.into_iter().filter_map(|e| CartLine::from_entry(e, placeholder)).collect();
                info!(lines = self.lines.len(), "Cart loaded");
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not load the cart", &err);
                Err(err)
            }
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> f64 {
        cart_total(&self.lines)
    }

    pub fn formatted_total(&self) -> String {
        format_price(Some(self.total()))
    }

    pub fn item_count(&self) -> u32 {
        cart_count(&self.lines)
    }

    pub fn available_times(&self) -> &[String] {
        &self.available_times
    }

    /// A quantity below 1 removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(&mut self, line_id: &str, quantity: u32) -> Result<(), StorefrontError> {
        if quantity < 1 {
            return self.remove(line_id).await;
        }
        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.set_cart_quantity(&bearer, line_id, quantity).await?)
        }
        .await;
        match result {
            Ok(()) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.id == line_id) {
                    line.quantity = quantity;
                }
                self.services
                    .cart_events
                    .publish(CartEvent::Updated { line_id: line_id.to_string(), quantity });
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not update the quantity", &err);
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove(&mut self, line_id: &str) -> Result<(), StorefrontError> {
        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.remove_cart_line(&bearer, line_id).await?)
        }
        .await;
        match result {
            Ok(()) => {
                self.lines.retain(|l| l.id != line_id);
                self.services.feedback.success("Product removed from the cart");
                self.services.cart_events.publish(CartEvent::Removed { line_id: line_id.to_string() });
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not remove the product", &err);
                Err(err)
            }
        }
    }

    /// Sets the event date and fetches the delivery times offered for it,
    /// preselecting the first one.
    #[instrument(skip(self))]
    pub async fn set_event_date(&mut self, raw: &str) -> Result<(), StorefrontError> {
        self.form.event_date = raw.to_string();
        self.available_times.clear();
        self.form.delivery_time.clear();

        let raw = raw.trim();
        if raw.is_empty() || self.services.session.current().is_admin() {
            return Ok(());
        }
        let Some(date) = parse_local_date(raw) else {
            let err = StorefrontError::from(ValidationError::InvalidEventDate(raw.to_string()));
            self.services.feedback.error(format!("Could not load delivery times: {err}"));
            return Err(err);
        };

        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.available_times(&bearer, date).await?)
        }
        .await;
        match result {
            Ok(times) => {
                self.form.delivery_time = times.first().cloned().unwrap_or_default();
                self.available_times = times;
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not load delivery times", &err);
                Err(err)
            }
        }
    }

    /// Validates locally, then places the order. On success the cart and
    /// scheduling fields are cleared and the UI is sent to the order list.
    #[instrument(skip(self))]
    pub async fn checkout(&mut self) -> Result<(), StorefrontError> {
        let session = self.services.session.current();
        let user = session.user();
        let valid = match validate_checkout(user, &self.form, &self.lines, &self.available_times) {
            Ok(valid) => valid,
            Err(e) => {
                self.services.feedback.error(e.to_string());
                return Err(e.into());
            }
        };
        let Some(user) = user else {
            return Err(ValidationError::NotSignedIn.into());
        };

        let order = NewOrder {
            event_date: valid.event_date.format("%Y-%m-%d").to_string(),
            delivery_time: valid.delivery_time,
            address: valid.address,
            people_count: valid.people_count,
            items: self
                .lines
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    price: line.price,
                    quantity: line.quantity,
                    image_url: line.image_url.clone(),
                })
                .collect(),
            total: self.total(),
            user_id: user.uid.clone(),
            user_email: user.email.clone(),
            user_name: user.order_name().to_string(),
            status: OrderStatus::Pending,
        };

        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.create_order(&bearer, &order).await?)
        }
        .await;
        match result {
            Ok(()) => {
                info!(items = order.items.len(), total = order.total, "Order placed");
                self.lines.clear();
                self.form = CheckoutForm::default();
                self.available_times.clear();
                self.services.feedback.success("Order placed successfully");
                self.services.cart_events.publish(CartEvent::CheckedOut);
                self.services.feedback.navigate(Route::Orders);
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not place the order", &err);
                Err(err)
            }
        }
    }
}
