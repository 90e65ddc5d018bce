//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, ProductId, UserId};

/// A seller listing row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    /// Inactive products stay listed but cannot be sold; a seller's
    /// products are deactivated when the seller is soft-deleted.
    pub active: bool,
    pub category_id: CategoryId,
    pub seller_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-facing projection of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub active: bool,
    pub category_id: CategoryId,
    pub seller_id: UserId,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock_quantity: product.stock_quantity,
            active: product.active,
            category_id: product.category_id,
            seller_id: product.seller_id,
        }
    }
}

/// Payload for listing a new product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: CategoryId,
}

impl AddProductRequest {
    /// Validate the listing constraints.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().len() < 5 {
            return Err("Name must be more than 4 characters".to_owned());
        }
        if self.description.trim().len() < 10 {
            return Err("Description must be more than 9 characters".to_owned());
        }
        if self.price <= Decimal::ZERO {
            return Err("Price must be positive".to_owned());
        }
        if self.stock_quantity <= 0 {
            return Err("Stock quantity must be positive".to_owned());
        }
        Ok(())
    }
}

/// Fields for inserting a new product row.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category_id: CategoryId,
    pub seller_id: UserId,
}

/// Typed partial update for a product, applied by its seller.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub active: Option<bool>,
    pub category_id: Option<CategoryId>,
}

impl ProductUpdate {
    /// Validate the populated fields against the listing constraints.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name
            && name.trim().len() < 5
        {
            return Err("Name must be more than 4 characters".to_owned());
        }
        if let Some(description) = &self.description
            && description.trim().len() < 10
        {
            return Err("Description must be more than 9 characters".to_owned());
        }
        if let Some(price) = self.price
            && price <= Decimal::ZERO
        {
            return Err("Price must be positive".to_owned());
        }
        if let Some(quantity) = self.stock_quantity
            && quantity <= 0
        {
            return Err("Stock quantity must be positive".to_owned());
        }
        Ok(())
    }
}

/// Typed search filters for the product search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearch {
    /// Substring match on the product name.
    pub name: Option<String>,
    /// Restrict to one category.
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductSearch {
    /// Validate the price window.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(min) = self.min_price
            && min < Decimal::ZERO
        {
            return Err("Minimum price cannot be negative".to_owned());
        }
        if let Some(max) = self.max_price
            && max < Decimal::ZERO
        {
            return Err("Maximum price cannot be negative".to_owned());
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err("Minimum price cannot be greater than maximum price".to_owned());
        }
        Ok(())
    }

    /// Stable string used as part of the `searched-products` cache key.
    #[must_use]
    pub fn cache_key_part(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name.as_deref().unwrap_or(""),
            self.category_id.map_or_else(String::new, |id| id.to_string()),
            self.min_price.map_or_else(String::new, |p| p.to_string()),
            self.max_price.map_or_else(String::new, |p| p.to_string()),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rejects_short_name() {
        let update = ProductUpdate {
            name: Some("abc".to_owned()),
            ..ProductUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_update_rejects_nonpositive_price() {
        let update = ProductUpdate {
            price: Some(Decimal::ZERO),
            ..ProductUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_search_rejects_inverted_price_window() {
        let search = ProductSearch {
            min_price: Some(Decimal::new(500, 2)),
            max_price: Some(Decimal::new(100, 2)),
            ..ProductSearch::default()
        };
        assert!(search.validate().is_err());
    }

    #[test]
    fn test_search_cache_key_distinguishes_filters() {
        let by_name = ProductSearch {
            name: Some("mug".to_owned()),
            ..ProductSearch::default()
        };
        let by_category = ProductSearch {
            category_id: Some(CategoryId::new(3)),
            ..ProductSearch::default()
        };
        assert_ne!(by_name.cache_key_part(), by_category.cache_key_part());
    }
}
