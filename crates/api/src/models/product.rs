//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authentic_core::{Price, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    /// Open string in practice: Kameez, Saree, Fabric, Co-ord Set, ...
    pub category: String,
    pub price: Price,
    /// Image URL.
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub count_in_stock: u32,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product payload for creation (and seed catalogs).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: Option<Price>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub count_in_stock: u32,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductDraft {
    /// Validate and materialise the product with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message naming the first missing field.
    pub fn into_product(self, now: DateTime<Utc>) -> Result<Product, String> {
        let price = self.price.ok_or_else(|| "Price is required".to_string())?;
        let product = Product {
            id: ProductId::generate(),
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            price,
            image: self.image.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            count_in_stock: self.count_in_stock,
            is_featured: self.is_featured,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        Ok(product)
    }
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub count_in_stock: Option<u32>,
    pub is_featured: Option<bool>,
}

impl ProductPatch {
    /// Apply the patch and re-validate the result.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message if the patched product is invalid.
    pub fn apply(self, mut product: Product, now: DateTime<Utc>) -> Result<Product, String> {
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(category) = self.category {
            product.category = category.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image) = self.image {
            product.image = image.trim().to_string();
        }
        if let Some(description) = self.description {
            product.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(count) = self.count_in_stock {
            product.count_in_stock = count;
        }
        if let Some(featured) = self.is_featured {
            product.is_featured = featured;
        }
        product.updated_at = now;
        product.validate()?;
        Ok(product)
    }
}

impl Product {
    fn validate(&self) -> Result<(), String> {
        for (label, value) in [
            ("Name", &self.name),
            ("Category", &self.category),
            ("Image", &self.image),
        ] {
            if value.is_empty() {
                return Err(format!("{label} is required"));
            }
        }
        Ok(())
    }
}

/// Catalog listing filters (`?category=Saree&featured=true`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
}

impl ProductFilter {
    /// Whether `product` passes the filter. Category matching ignores case.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|c| product.category.eq_ignore_ascii_case(c.trim()));
        let featured_ok = self.featured.is_none_or(|f| product.is_featured == f);
        category_ok && featured_ok
    }
}
