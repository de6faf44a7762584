//! Property-Based Tests for Pricing
//!
//! # Test Properties
//!
//! 1. **Conservation**: allocated bucket costs sum to the class's tiered charge
//! 2. **Bounded blend**: the effective price lies between the cheapest and
//!    dearest band price
//! 3. **Monotone charge**: more volume never costs less

#![cfg(test)]

use chrono::Utc;
use proptest::prelude::*;

use super::allocator::CostAllocator;
use super::calculator::TieredPriceCalculator;
use super::catalog::ScheduleBook;
use super::tiered::{PriceBand, PriceSchedule};
use crate::domain::{bytes_to_gb, BucketRecord, Region, StorageClassId};
use crate::scan::StorageTotals;

// =============================================================================
// Property Strategies
// =============================================================================

/// Contiguous schedule from a list of band widths and prices.
fn schedule_strategy() -> impl Strategy<Value = PriceSchedule> {
    prop::collection::vec((1.0f64..100_000.0, 0.0f64..1.0), 1..5).prop_map(|bands| {
        let mut begin = 0.0;
        let last = bands.len() - 1;
        let bands = bands
            .into_iter()
            .enumerate()
            .map(|(i, (width, price))| {
                let end = (i < last).then_some(begin + width);
                let band = PriceBand::new(begin, end, price);
                begin += width;
                band
            })
            .collect();
        PriceSchedule::new(bands).expect("generated schedule is contiguous")
    })
}

/// Byte counts for up to 20 buckets, some very large.
fn bucket_sizes_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..(1u64 << 44), 1..20)
}

// =============================================================================
// Allocation Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_allocation_conserves_charge(
        schedule in schedule_strategy(),
        sizes in bucket_sizes_strategy(),
    ) {
        let region = Region::from("ca-central-1");
        let class = StorageClassId::Standard;
        let total: u64 = sizes.iter().sum();

        let mut totals = StorageTotals::new();
        totals.insert(region.clone(), class, total);
        let mut book = ScheduleBook::new();
        book.insert(region.clone(), class, schedule.clone());
        let prices = TieredPriceCalculator::new().prices(&totals, &book);

        let mut buckets: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                let mut b = BucketRecord::discovered(format!("b{}", i), region.clone(), Utc::now());
                if *bytes > 0 {
                    b.record_object(class, *bytes, Utc::now());
                }
                b
            })
            .collect();
        CostAllocator::new().allocate(&mut buckets, &totals, &prices);

        let allocated: f64 = buckets.iter().map(|b| b.cost).sum();
        let expected = schedule.tiered_charge(bytes_to_gb(total));

        let tolerance = 1e-9 * expected.abs().max(1e-12);
        prop_assert!(
            (allocated - expected).abs() <= tolerance,
            "allocated {} vs charge {}", allocated, expected
        );
        prop_assert!(buckets.iter().all(|b| b.cost >= 0.0));
    }
}

// =============================================================================
// Schedule Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_effective_price_is_a_blend(
        schedule in schedule_strategy(),
        volume in 0.001f64..1_000_000.0,
    ) {
        let min = schedule.bands().iter().map(|b| b.unit_price).fold(f64::INFINITY, f64::min);
        let max = schedule.bands().iter().map(|b| b.unit_price).fold(0.0, f64::max);
        let price = schedule.effective_price(volume);

        prop_assert!(price >= min - 1e-12);
        prop_assert!(price <= max + 1e-12);
    }

    #[test]
    fn prop_charge_is_monotone(
        schedule in schedule_strategy(),
        a in 0.0f64..1_000_000.0,
        b in 0.0f64..1_000_000.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(schedule.tiered_charge(low) <= schedule.tiered_charge(high) + 1e-9);
    }
}
