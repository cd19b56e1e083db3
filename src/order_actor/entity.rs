use chrono::Utc;

use super::actions::{OrderAction, OrderActionResult};
use crate::actor_framework::Entity;
use crate::domain::dates::parse_local_date;
use crate::domain::{NewOrder, Order, OrderItem};

/// Largest accepted gap between the submitted total and the item sum.
pub const TOTAL_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub items: Option<Vec<OrderItem>>,
}

impl Entity for Order {
    type Id = String;
    type CreateParams = NewOrder;
    type Patch = OrderPatch;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;

    fn id(&self) -> &String {
        &self.id
    }

    /// # Notes
    /// The creation timestamp is taken here, not from the client.
    fn from_create_params(id: String, params: NewOrder) -> Result<Self, String> {
        let event_date = parse_local_date(&params.event_date)
            .ok_or_else(|| format!("Invalid event date: {}", params.event_date))?;
        Ok(Self {
            id,
            user_id: params.user_id,
            user_email: params.user_email,
            user_name: params.user_name,
            items: params.items,
            total: params.total,
            event_date: Some(event_date),
            delivery_time: params.delivery_time,
            address: params.address,
            people_count: params.people_count,
            status: Some(params.status),
            created_at: Some(Utc::now()),
        })
    }

    fn on_create(&mut self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("An order needs at least one item".to_string());
        }
        if self.people_count == 0 {
            return Err("The number of people must be greater than 0".to_string());
        }
        let expected: f64 = self.items.iter().map(OrderItem::subtotal).sum();
        if (expected - self.total).abs() > TOTAL_TOLERANCE {
            return Err(format!("Order total {} does not match items total {}", self.total, expected));
        }
        Ok(())
    }

    fn on_update(&mut self, patch: OrderPatch) -> Result<(), String> {
        if let Some(items) = patch.items {
            self.items = items;
        }
        Ok(())
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, String> {
        match action {
            OrderAction::SetStatus(status) => {
                let previous = self.status.replace(status);
                Ok(OrderActionResult::SetStatus(previous))
            }
        }
    }
}
