//! Pricing
//!
//! Tiered schedules, the catalog that fetches them, blended regional prices
//! and the per-bucket cost allocation.
//!
//! Billing is a regional blend: every bucket holding a class in a region
//! pays the same effective unit price, derived from the region's total
//! volume of that class.
//!
//! - **Tiered** (`tiered.rs`) - Price bands and schedule validation
//! - **Price list** (`price_list.rs`) - Decoding the provider's price list documents
//! - **Catalog** (`catalog.rs`) - Cached schedule lookup, pricing gaps
//! - **Calculator** (`calculator.rs`) - Effective price per (region, class)
//! - **Allocator** (`allocator.rs`) - Proportional cost per bucket

pub mod allocator;
pub mod calculator;
pub mod catalog;
pub mod price_list;
pub mod tiered;

#[cfg(test)]
mod proptest;

pub use allocator::CostAllocator;
pub use calculator::{ClassPrice, EffectivePrices, TieredPriceCalculator};
pub use catalog::{PriceCatalog, ScheduleBook, ScheduleCache};
pub use price_list::{select_storage_schedule, PriceListDocument};
pub use tiered::{PriceBand, PriceSchedule};
