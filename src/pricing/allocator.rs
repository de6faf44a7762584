//! Cost Allocator
//!
//! Splits each class's regional charge across the buckets holding that
//! class, proportionally to their byte share. Runs once, after the scan
//! barrier, on the final totals.

use tracing::debug;

use super::calculator::EffectivePrices;
use crate::domain::{bytes_to_gb, BucketRecord, Region, StorageClassId};
use crate::scan::StorageTotals;

/// `numerator / denominator`, or zero when the denominator is zero.
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CostAllocator;

impl CostAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Cost of `bytes` of `class` in `region`.
    ///
    /// `(bytes / total) * (effective_price * GB(total))`
    pub fn contribution(
        &self,
        region: &Region,
        class: StorageClassId,
        bytes: u64,
        totals: &StorageTotals,
        prices: &EffectivePrices,
    ) -> f64 {
        let total = totals.get(region, class);
        let share = guarded_ratio(bytes as f64, total as f64);
        let class_charge = prices.effective_price(region, class) * bytes_to_gb(total);
        share * class_charge
    }

    /// Write `cost` on every bucket.
    pub fn allocate(&self, buckets: &mut [BucketRecord], totals: &StorageTotals, prices: &EffectivePrices) {
        for bucket in buckets.iter_mut() {
            let cost = bucket
                .bytes_by_storage_class
                .iter()
                .map(|(class, bytes)| self.contribution(&bucket.region, *class, *bytes, totals, prices))
                .sum();
            bucket.cost = cost;
        }
        debug!(buckets = buckets.len(), "Costs allocated");
    }
}
