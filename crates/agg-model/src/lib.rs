//! Product aggregation data model
//!
//! Plain data carried between the upstream lookups and the aggregation
//! orchestrator.
//!
//! # Core Concepts
//!
//! - [`ProductInfo`]: the anchor entity, an ordered list of [`ProductOption`]s
//! - [`Inventory`] / [`Review`]: enrichments attached during aggregation
//! - [`Product`]: the composite result, only built once every option is stocked
//! - [`BranchId`] / [`BranchKind`]: identity of a concurrently executed lookup
//!
//! # Example
//!
//! ```rust
//! use agg_model::{Decimal, Inventory, Product, ProductInfo, ProductOption, Review};
//!
//! let option = ProductOption::new(1, "64GB", "Black", Decimal::new(69999, 2));
//! let mut info = ProductInfo::new("ABC123", vec![option]);
//! info.options_mut()[0].attach_inventory(Inventory::new(2));
//!
//! let product = Product::assemble("ABC123", info, Review::new(200, 4.5)).unwrap();
//! assert_eq!(product.product_id(), "ABC123");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod branch;
mod enrichment;
mod product;

pub use branch::{BranchId, BranchKind};
pub use enrichment::{Inventory, Review};
pub use product::{ModelError, Product, ProductInfo, ProductOption};
pub use rust_decimal::Decimal;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
