use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::image;

/// Product category. Names outside the fixed set are kept as stored so an
/// edit writes back what was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    Breakfast,
    Lunch,
    Dinner,
    Beverages,
    Desserts,
    Combos,
    Other(String),
}

/// Stored for products that carry no usable category.
pub const UNCATEGORIZED: &str = "Uncategorized";

impl Category {
    /// Categories offered by the admin product form.
    pub const ALL: [Category; 6] = [
        Category::Breakfast,
        Category::Lunch,
        Category::Dinner,
        Category::Beverages,
        Category::Desserts,
        Category::Combos,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Dinner => "Dinner",
            Category::Beverages => "Beverages",
            Category::Desserts => "Desserts",
            Category::Combos => "Combos",
            Category::Other(name) => name,
        }
    }

    /// Known names match case-insensitively; anything else is kept verbatim.
    pub fn parse(name: &str) -> Category {
        if name.trim().is_empty() {
            return Category::uncategorized();
        }
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or_else(|| Category::Other(name.to_string()))
    }

    pub fn uncategorized() -> Category {
        Category::Other(UNCATEGORIZED.to_string())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_category(deserializer)
    }
}

/// Represents a catalog product.
///
/// # Actor Framework
/// Implements [`Entity`](crate::actor_framework::Entity) so the in-memory
/// backend can keep products in a [`ResourceActor`](crate::actor_framework::ResourceActor).
/// See `product_actor` for the create params, patch and stock actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub stock: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default = "Category::uncategorized")]
    pub category: Category,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_vegetarian: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_combo: bool,
}

/// Payload for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub stock: u32,
    pub image_url: String,
    pub category: Category,
    pub is_vegetarian: bool,
    pub is_combo: bool,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            description: String::new(),
            stock,
            image_url: String::new(),
            category: Category::default(),
            is_vegetarian: false,
            is_combo: false,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn vegetarian(mut self, is_vegetarian: bool) -> Self {
        self.is_vegetarian = is_vegetarian;
        self
    }

    pub fn combo(mut self, is_combo: bool) -> Self {
        self.is_combo = is_combo;
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Replaces a non-absolute image reference with the placeholder.
    pub fn normalize_image(&mut self, placeholder: &str) {
        self.image_url = image::display_url(Some(&self.image_url), placeholder);
    }

    pub fn from_input(id: impl Into<String>, input: ProductInput) -> Self {
        Self {
            id: id.into(),
            name: input.name,
            price: input.price,
            description: input.description,
            stock: input.stock,
            image_url: input.image_url,
            category: input.category,
            is_vegetarian: input.is_vegetarian,
            is_combo: input.is_combo,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// Accepts numbers and numeric strings; anything else becomes 0.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(n)) if n.is_finite() => n,
        Some(NumberOrText::Text(text)) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Like [`lenient_f64`] but truncated into a non-negative count.
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_f64(deserializer)?;
    Ok(if n <= 0.0 { 0 } else { n.min(u32::MAX as f64) as u32 })
}

/// Stored documents write `null` for cleared fields; decode it like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Category, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(name)) => Category::parse(&name),
        _ => Category::uncategorized(),
    })
}
