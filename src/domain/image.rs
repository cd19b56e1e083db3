/// Placeholder for catalog and product images.
pub const PRODUCT_PLACEHOLDER: &str = "https://placehold.co/400x300?text=Producto";
/// Placeholder for cart thumbnails.
pub const THUMBNAIL_PLACEHOLDER: &str = "https://placehold.co/48x48?text=Producto";

/// True when the reference can be rendered as-is.
pub fn is_absolute(reference: &str) -> bool {
    reference.starts_with("http")
}

/// Returns the stored reference when it is absolute, the placeholder otherwise.
pub fn display_url(reference: Option<&str>, placeholder: &str) -> String {
    match reference {
        Some(url) if is_absolute(url) => url.to_string(),
        _ => placeholder.to_string(),
    }
}
