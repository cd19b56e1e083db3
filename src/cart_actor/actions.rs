#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Adds to the line's quantity when the product is added again.
    AddQuantity(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartActionResult {
    /// The line's quantity after the change.
    AddQuantity(u32),
}
