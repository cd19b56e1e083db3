//! Product catalog: loading, local filtering and add-to-cart.

use std::fmt;

use tracing::{info, instrument};

use crate::app_system::Services;
use crate::cart::CartEvent;
use crate::domain::{Category, Product};
use crate::error::{StorefrontError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryOption {
    #[default]
    All,
    Only(Category),
}

impl fmt::Display for CategoryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryOption::All => f.write_str("All"),
            CategoryOption::Only(category) => write!(f, "{category}"),
        }
    }
}

/// Active predicates; an unset predicate matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogFilter {
    pub category: CategoryOption,
    pub vegetarian: bool,
    pub combo: bool,
}

impl CatalogFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let category = match &self.category {
            CategoryOption::All => true,
            CategoryOption::Only(category) => product.category == *category,
        };
        category && (!self.vegetarian || product.is_vegetarian) && (!self.combo || product.is_combo)
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    pub fn is_active(&self) -> bool {
        *self != CatalogFilter::default()
    }
}

/// `All` followed by the categories present, in first-seen order.
pub fn category_options(products: &[Product]) -> Vec<CategoryOption> {
    let mut options = vec![CategoryOption::All];
    for product in products {
        let option = CategoryOption::Only(product.category.clone());
        if !options.contains(&option) {
            options.push(option);
        }
    }
    options
}

pub struct CatalogView {
    services: Services,
    products: Vec<Product>,
    pub filter: CatalogFilter,
}

impl CatalogView {
    pub fn new(services: Services) -> Self {
        Self { services, products: Vec::new(), filter: CatalogFilter::default() }
    }

    /// Reads the catalog from the document database. `limit` keeps only the
    /// first products, as the home page teaser does.
    #[instrument(skip(self))]
    pub async fn load(&mut self, limit: Option<usize>) -> Result<usize, StorefrontError> {
        match self.services.store.products().await {
            Ok(mut products) => {
                if let Some(limit) = limit {
                    products.truncate(limit);
                }
                for product in &mut products {
                    product.normalize_image(&self.services.product_placeholder);
                }
                self.products = products;
                info!(count = self.products.len(), "Catalog loaded");
                Ok(self.products.len())
            }
            Err(e) => {
                let err = StorefrontError::from(e);
                self.services.feedback.report("Could not load products", &err);
                Err(err)
            }
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn visible(&self) -> Vec<&Product> {
        self.filter.apply(&self.products)
    }

    pub fn category_options(&self) -> Vec<CategoryOption> {
        category_options(&self.products)
    }

    pub fn reset_filters(&mut self) {
        self.filter = CatalogFilter::default();
    }

    /// Adds one unit to the signed-in customer's cart. Administrators have
    /// no cart, so this is a no-op for them.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, product_id: &str) -> Result<(), StorefrontError> {
        let session = self.services.session.current();
        let Some(user) = session.user() else {
            let err = StorefrontError::from(ValidationError::NotSignedIn);
            self.services.feedback.error(err.to_string());
            return Err(err);
        };
        if user.is_admin() {
            return Ok(());
        }
        if let Some(product) = self.products.iter().find(|p| p.id == product_id) {
            if !product.in_stock() {
                let err = StorefrontError::from(ValidationError::OutOfStock(product.name.clone()));
                self.services.feedback.error(err.to_string());
                return Err(err);
            }
        }

        let result = async {
            let bearer = self.services.session.bearer().await?;
            self.services.api.add_to_cart(&bearer, product_id, 1).await?;
            Ok::<(), StorefrontError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.services.feedback.success("Product added to the cart");
                self.services.cart_events.publish(CartEvent::Added { product_id: product_id.to_string() });
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not add to the cart", &err);
                Err(err)
            }
        }
    }
}
