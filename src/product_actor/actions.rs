/// Stock operations on a catalog product, beyond plain CRUD.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductAction {
    /// Takes `u32` units out of stock.
    ///
    /// # Errors
    /// Fails when the requested amount exceeds the available stock.
    ReserveStock(u32),
    /// Puts units back, e.g. when an order could not be stored.
    ReleaseStock(u32),
}

/// Results from [`ProductAction`]s, one variant per action.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductActionResult {
    ReserveStock(u32),
    ReleaseStock(u32),
}
