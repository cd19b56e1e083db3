//! Order history for customers and order management for administrators.

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::app_system::Services;
use crate::domain::dates::parse_local_date;
use crate::domain::{sort_newest_first, Order, OrderStatus};
use crate::error::{StorefrontError, ValidationError};
use crate::format::{format_date, format_price, status_label};
use crate::routes::Route;

/// True when the order's normalised event date is `day`.
pub fn matches_event_date(order: &Order, day: NaiveDate) -> bool {
    order.event_date == Some(day)
}

/// One order, formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub id: String,
    pub status: &'static str,
    pub event_date: String,
    pub delivery_time: String,
    pub address: String,
    pub people_count: String,
    pub total: String,
    pub lines: Vec<String>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        fn or_default(value: &str, fallback: &str) -> String {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            id: order.id.clone(),
            status: status_label(order.status),
            event_date: format_date(order.event_date),
            delivery_time: or_default(&order.delivery_time, "No time"),
            address: or_default(&order.address, "No address"),
            people_count: match order.people_count {
                0 => "N/A".to_string(),
                n => n.to_string(),
            },
            total: format_price(Some(order.total)),
            lines: order
                .items
                .iter()
                .map(|item| format!("{} x{} ({})", item.name, item.quantity, format_price(Some(item.subtotal()))))
                .collect(),
        }
    }
}

// =============================================================================
// Customer order history
// =============================================================================

pub struct OrderHistory {
    services: Services,
    orders: Vec<Order>,
}

impl OrderHistory {
    pub fn new(services: Services) -> Self {
        Self { services, orders: Vec::new() }
    }

    /// Loads the signed-in customer's orders, newest first. Administrators
    /// are sent to the dashboard instead.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), StorefrontError> {
        let session = self.services.session.current();
        let Some(user) = session.user() else {
            self.services.feedback.error("Please sign in to see your orders.");
            self.services.feedback.navigate(Route::Login);
            return Err(ValidationError::NotSignedIn.into());
        };
        if user.is_admin() {
            self.services.feedback.info("Administrators manage orders from the dashboard.");
            self.services.feedback.navigate(Route::Admin);
            return Ok(());
        }

        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.list_user_orders(&bearer, &user.uid).await?)
        }
        .await;
        match result {
            Ok(mut orders) => {
                sort_newest_first(&mut orders);
                info!(count = orders.len(), "Order history loaded");
                self.orders = orders;
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not load your orders", &err);
                Err(err)
            }
        }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn summaries(&self) -> Vec<OrderSummary> {
        self.orders.iter().map(OrderSummary::from).collect()
    }
}

// =============================================================================
// Admin order management
// =============================================================================

pub struct AdminOrders {
    services: Services,
    orders: Vec<Order>,
    date_filter: Option<NaiveDate>,
    last_error: Option<String>,
}

impl AdminOrders {
    pub fn new(services: Services) -> Self {
        Self { services, orders: Vec::new(), date_filter: None, last_error: None }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), StorefrontError> {
        if !self.services.session.current().is_admin() {
            let err = StorefrontError::from(ValidationError::AdminOnly);
            self.fail("Could not load orders", &err);
            return Err(err);
        }
        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.list_orders(&bearer).await?)
        }
        .await;
        match result {
            Ok(mut orders) => {
                sort_newest_first(&mut orders);
                info!(count = orders.len(), "Orders loaded");
                self.orders = orders;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.fail("Could not load orders", &err);
                Err(err)
            }
        }
    }

    /// Any status may follow any other.
    #[instrument(skip(self))]
    pub async fn set_status(&mut self, order_id: &str, status: OrderStatus) -> Result<(), StorefrontError> {
        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.update_order_status(&bearer, order_id, status).await?)
        }
        .await;
        match result {
            Ok(()) => {
                if let Some(order) = self.orders.iter_mut().find(|o| o.id == order_id) {
                    order.status = Some(status);
                }
                info!(%order_id, %status, "Order status updated");
                self.services.feedback.success(format!("Order status changed to {}", status_label(Some(status))));
                Ok(())
            }
            Err(err) => {
                self.fail("Could not update the order status", &err);
                Err(err)
            }
        }
    }

    /// Keeps only orders for the given day; an empty or unparseable value
    /// shows everything.
    pub fn filter_by_date(&mut self, raw: &str) {
        self.date_filter = parse_local_date(raw);
    }

    pub fn show_all(&mut self) {
        self.date_filter = None;
    }

    pub fn date_filter(&self) -> Option<NaiveDate> {
        self.date_filter
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn visible(&self) -> Vec<&Order> {
        match self.date_filter {
            Some(day) => self.orders.iter().filter(|o| matches_event_date(o, day)).collect(),
            None => self.orders.iter().collect(),
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn fail(&mut self, context: &str, err: &StorefrontError) {
        self.last_error = Some(format!("{context}: {err}"));
        self.services.feedback.report(context, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderItem;

    fn order(json: &str) -> Order {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn event_date_filter_uses_the_local_day() {
        let order = order(r#"{"id":"o1","eventDate":"2025-08-08T00:00:00"}"#);
        assert!(matches_event_date(&order, NaiveDate::from_ymd_opt(2025, 8, 8).unwrap()));
        assert!(!matches_event_date(&order, NaiveDate::from_ymd_opt(2025, 8, 9).unwrap()));
    }

    #[test]
    fn summary_fills_missing_fields() {
        let summary = OrderSummary::from(&order(r#"{"id":"o1"}"#));
        assert_eq!(summary.status, "Unknown");
        assert_eq!(summary.event_date, "No date");
        assert_eq!(summary.delivery_time, "No time");
        assert_eq!(summary.address, "No address");
        assert_eq!(summary.people_count, "N/A");
        assert_eq!(summary.total, "$0");
    }

    #[test]
    fn summary_formats_lines() {
        let mut order = order(r#"{"id":"o2","status":"Confirmed","peopleCount":20,"total":12500}"#);
        order.items.push(OrderItem {
            product_id: "p1".into(),
            name: "Empanadas".into(),
            price: 2500.0,
            quantity: 5,
            image_url: String::new(),
        });
        let summary = OrderSummary::from(&order);
        assert_eq!(summary.status, "Confirmed");
        assert_eq!(summary.people_count, "20");
        assert_eq!(summary.total, "$12.500");
        assert_eq!(summary.lines, ["Empanadas x5 ($12.500)"]);
    }
}
