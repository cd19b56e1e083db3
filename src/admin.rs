//! Admin dashboard product management.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, instrument, warn};

use crate::app_system::Services;
use crate::domain::{Category, Product, ProductInput};
use crate::error::{StorefrontError, ValidationError};

/// The product form as typed; numbers stay text until submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub description: String,
    pub stock: String,
    pub image_url: String,
    pub category: Category,
    pub is_vegetarian: bool,
    pub is_combo: bool,
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            stock: product.stock.to_string(),
            image_url: product.image_url.clone(),
            category: product.category.clone(),
            is_vegetarian: product.is_vegetarian,
            is_combo: product.is_combo,
        }
    }
}

fn parse_price(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite()).unwrap_or(0.0)
}

/// Fractions are truncated and negatives clamp to 0.
fn parse_stock(raw: &str) -> u32 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .map(|s| s.trunc().clamp(0.0, f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

impl ProductForm {
    /// Unparseable numbers become 0; an empty image uses `placeholder`.
    pub fn to_input(&self, placeholder: &str) -> Result<ProductInput, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingProductName);
        }
        let image_url = match self.image_url.trim() {
            "" => placeholder.to_string(),
            url => url.to_string(),
        };
        Ok(ProductInput {
            name: name.to_string(),
            price: parse_price(&self.price),
            description: self.description.trim().to_string(),
            stock: parse_stock(&self.stock),
            image_url,
            category: self.category.clone(),
            is_vegetarian: self.is_vegetarian,
            is_combo: self.is_combo,
        })
    }
}

/// A picked image file, uploaded before the product record is written.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime: mime.into(), bytes }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

pub struct ProductEditor {
    services: Services,
    products: Vec<Product>,
    pub form: ProductForm,
    pub image: Option<ImageFile>,
    editing: Option<String>,
    pending_delete: Option<String>,
}

impl ProductEditor {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            products: Vec::new(),
            form: ProductForm::default(),
            image: None,
            editing: None,
            pending_delete: None,
        }
    }

    /// Reloads the product list from the document database.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), StorefrontError> {
        match self.services.store.products().await {
            Ok(mut products) => {
                for product in &mut products {
                    product.normalize_image(&self.services.product_placeholder);
                }
                self.products = products;
                Ok(())
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

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Fills the form from a listed product. Returns false for unknown ids.
    pub fn edit(&mut self, product_id: &str) -> bool {
        match self.products.iter().find(|p| p.id == product_id) {
            Some(product) => {
                self.form = ProductForm::from(product);
                self.image = None;
                self.editing = Some(product.id.clone());
                true
            }
            None => false,
        }
    }

    pub fn reset_form(&mut self) {
        self.form = ProductForm::default();
        self.image = None;
        self.editing = None;
    }

    /// Uploads the picked image (if any), then creates or updates the
    /// product. A failed upload aborts the save.
    #[instrument(skip(self), fields(editing = ?self.editing))]
    pub async fn save(&mut self) -> Result<(), StorefrontError> {
        let mut input = match self.form.to_input(&self.services.product_placeholder) {
            Ok(input) => input,
            Err(e) => {
                self.services.feedback.error(e.to_string());
                return Err(e.into());
            }
        };
        let bearer = match self.services.session.bearer().await {
            Ok(bearer) => bearer,
            Err(e) => {
                let err = StorefrontError::from(e);
                self.services.feedback.report("Could not save the product", &err);
                return Err(err);
            }
        };

        if let Some(image) = &self.image {
            match self.services.api.upload_image(&bearer, &image.to_data_url()).await {
                Ok(url) => input.image_url = url,
                Err(e) => {
                    let err = StorefrontError::from(e);
                    warn!(error = %err, "Image upload failed, product not saved");
                    self.services.feedback.report("Could not upload the image", &err);
                    return Err(err);
                }
            }
        }

        let result = match &self.editing {
            Some(id) => self.services.api.update_product(&bearer, id, &input).await,
            None => self.services.api.create_product(&bearer, &input).await,
        };
        match result {
            Ok(()) => {
                let message = if self.editing.is_some() { "Product updated" } else { "Product created" };
                info!(name = %input.name, "{message}");
                self.services.feedback.success(message);
                self.reset_form();
                let _ = self.load().await;
                Ok(())
            }
            Err(e) => {
                let err = StorefrontError::from(e);
                self.services.feedback.report("Could not save the product", &err);
                Err(err)
            }
        }
    }

    /// First phase of a delete; nothing is sent until confirmed.
    pub fn request_delete(&mut self, product_id: &str) {
        self.pending_delete = Some(product_id.to_string());
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    #[instrument(skip(self))]
    pub async fn confirm_delete(&mut self) -> Result<(), StorefrontError> {
        let Some(product_id) = self.pending_delete.take() else {
            let err = StorefrontError::from(ValidationError::NothingToDelete);
            self.services.feedback.error(err.to_string());
            return Err(err);
        };
        let result = async {
            let bearer = self.services.session.bearer().await?;
            Ok::<_, StorefrontError>(self.services.api.delete_product(&bearer, &product_id).await?)
        }
        .await;
        match result {
            Ok(()) => {
                info!(%product_id, "Product deleted");
                self.services.feedback.success("Product deleted");
                if self.editing.as_deref() == Some(product_id.as_str()) {
                    self.reset_form();
                }
                let _ = self.load().await;
                Ok(())
            }
            Err(err) => {
                self.services.feedback.report("Could not delete the product", &err);
                Err(err)
            }
        }
    }
}
