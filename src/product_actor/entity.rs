use super::actions::{ProductAction, ProductActionResult};
use crate::actor_framework::Entity;
use crate::domain::{Product, ProductInput};

impl Entity for Product {
    type Id = String;
    type CreateParams = ProductInput;
    /// Writes replace the whole record, as `PUT /products/:id` does.
    type Patch = ProductInput;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: ProductInput) -> Result<Self, String> {
        Ok(Product::from_input(id, params))
    }

    fn on_create(&mut self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
        Ok(())
    }

    fn on_update(&mut self, patch: ProductInput) -> Result<(), String> {
        if patch.name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
        *self = Product::from_input(self.id.clone(), patch);
        Ok(())
    }

    /// # Errors
    /// Returns an error if attempting to reserve more stock than available.
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, String> {
        match action {
            ProductAction::ReserveStock(amount) => {
                if self.stock >= amount {
                    self.stock -= amount;
                    Ok(ProductActionResult::ReserveStock(self.stock))
                } else {
                    Err(format!(
                        "Insufficient stock for {}: {} available, {} requested",
                        self.name, self.stock, amount
                    ))
                }
            }
            ProductAction::ReleaseStock(amount) => {
                self.stock = self.stock.saturating_add(amount);
                Ok(ProductActionResult::ReleaseStock(self.stock))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    #[test]
    fn reserve_stock_never_goes_negative() {
        let mut product = Product::new("p1", "Empanadas", 1500.0, 3);
        assert_eq!(product.handle_action(ProductAction::ReserveStock(2)), Ok(ProductActionResult::ReserveStock(1)));
        assert!(product.handle_action(ProductAction::ReserveStock(2)).is_err());
        assert_eq!(product.stock, 1);
    }

    #[test]
    fn update_replaces_every_field_but_id() {
        let mut product = Product::new("p1", "Empanadas", 1500.0, 3).vegetarian(true);
        let input = ProductInput {
            name: "Humitas".into(),
            price: 2000.0,
            description: "Corn".into(),
            stock: 8,
            image_url: String::new(),
            category: Category::Lunch,
            is_vegetarian: false,
            is_combo: true,
        };
        product.on_update(input).unwrap();
        assert_eq!(product.id, "p1");
        assert_eq!(product.name, "Humitas");
        assert!(!product.is_vegetarian);
        assert!(product.is_combo);
    }
}
