//! Product info, options and the composite product

use crate::enrichment::{Inventory, Review};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Model invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An option reached assembly without an inventory slot filled
    #[error("option {option_id} at position {position} has no inventory")]
    MissingInventory { option_id: u32, position: usize },
}

/// One purchasable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option identifier (not guaranteed unique)
    pub id: u32,
    /// Storage capacity label, e.g. `64GB`
    pub capacity: String,
    /// Color label
    pub color: String,
    /// Unit price, exact to the cent
    pub price: Decimal,
    /// Inventory slot, filled by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inventory: Option<Inventory>,
}

impl ProductOption {
    /// Create option with an empty inventory slot
    #[must_use]
    pub fn new(id: u32, capacity: impl Into<String>, color: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            capacity: capacity.into(),
            color: color.into(),
            price,
            inventory: None,
        }
    }

    /// Fill the inventory slot, replacing any previous value
    #[inline]
    pub fn attach_inventory(&mut self, inventory: Inventory) {
        self.inventory = Some(inventory);
    }

    /// Inventory, if attached
    #[inline]
    #[must_use]
    pub fn inventory(&self) -> Option<&Inventory> {
        self.inventory.as_ref()
    }
}

/// Product info as produced by the info lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    /// Product identifier
    pub product_id: String,
    /// Options in upstream order
    #[serde(rename = "productOptions")]
    options: Vec<ProductOption>,
}

impl ProductInfo {
    /// Create product info
    #[must_use]
    pub fn new(product_id: impl Into<String>, options: Vec<ProductOption>) -> Self {
        Self {
            product_id: product_id.into(),
            options,
        }
    }

    /// Options in upstream order
    #[inline]
    #[must_use]
    pub fn options(&self) -> &[ProductOption] {
        &self.options
    }

    /// Mutable access for filling inventory slots
    #[inline]
    pub fn options_mut(&mut self) -> &mut [ProductOption] {
        &mut self.options
    }

    /// Number of options
    #[inline]
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

/// Composite aggregation result
///
/// Only constructible through [`Product::assemble`], which rejects options
/// with an empty inventory slot. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    product_id: String,
    product_info: ProductInfo,
    review: Review,
}

impl Product {
    /// Assemble the composite for `product_id` from stocked info and a review
    ///
    /// # Errors
    /// - `ModelError::MissingInventory` if any option lacks inventory
    pub fn assemble(
        product_id: impl Into<String>,
        product_info: ProductInfo,
        review: Review,
    ) -> Result<Self, ModelError> {
        if let Some((position, option)) = product_info
            .options
            .iter()
            .enumerate()
            .find(|(_, o)| o.inventory.is_none())
        {
            return Err(ModelError::MissingInventory {
                option_id: option.id,
                position,
            });
        }

        Ok(Self {
            product_id: product_id.into(),
            product_info,
            review,
        })
    }

    /// Product identifier
    #[inline]
    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Product info with stocked options
    #[inline]
    #[must_use]
    pub fn product_info(&self) -> &ProductInfo {
        &self.product_info
    }

    /// Stocked options in upstream order
    #[inline]
    #[must_use]
    pub fn options(&self) -> &[ProductOption] {
        self.product_info.options()
    }

    /// Review summary (fetched or defaulted)
    #[inline]
    #[must_use]
    pub fn review(&self) -> &Review {
        &self.review
    }
}
