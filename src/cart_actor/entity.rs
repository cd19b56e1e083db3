use super::actions::{CartAction, CartActionResult};
use crate::actor_framework::Entity;

/// A stored cart line; the embedded product is joined in on read.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CartItemCreate {
    pub user_id: String,
    pub product_id: String,
    pub quantity: u32,
}

impl Entity for CartItem {
    type Id = String;
    type CreateParams = CartItemCreate;
    /// New quantity for the line.
    type Patch = u32;
    type Action = CartAction;
    type ActionResult = CartActionResult;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: CartItemCreate) -> Result<Self, String> {
        Ok(Self {
            id,
            user_id: params.user_id,
            product_id: params.product_id,
            quantity: params.quantity,
        })
    }

    fn on_create(&mut self) -> Result<(), String> {
        if self.quantity == 0 {
            return Err("Quantity must be at least 1".to_string());
        }
        Ok(())
    }

    fn on_update(&mut self, quantity: u32) -> Result<(), String> {
        if quantity == 0 {
            return Err("Quantity must be at least 1".to_string());
        }
        self.quantity = quantity;
        Ok(())
    }

    fn handle_action(&mut self, action: CartAction) -> Result<CartActionResult, String> {
        match action {
            CartAction::AddQuantity(n) => {
                self.quantity = self.quantity.saturating_add(n);
                Ok(CartActionResult::AddQuantity(self.quantity))
            }
        }
    }
}
