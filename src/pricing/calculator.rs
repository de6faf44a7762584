//! Blended regional prices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::ScheduleBook;
use crate::domain::{bytes_to_gb, Region, StorageClassId};
use crate::scan::StorageTotals;

/// Price of one (region, class) at the run's final volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrice {
    pub region: Region,
    pub storage_class: StorageClassId,
    pub total_bytes: u64,
    pub volume_gb: f64,
    /// Blended USD per GB-month across the bands the volume spans
    pub effective_price: f64,
    /// Tiered charge for the whole volume
    pub charge: f64,
    /// False when no schedule was available and the class is priced at zero
    pub priced: bool,
}

/// Effective prices for every observed (region, class).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectivePrices {
    prices: BTreeMap<(Region, StorageClassId), ClassPrice>,
}

impl EffectivePrices {
    pub fn get(&self, region: &Region, class: StorageClassId) -> Option<&ClassPrice> {
        self.prices.get(&(region.clone(), class))
    }

    /// Effective price, zero for unpriced or unobserved pairs.
    pub fn effective_price(&self, region: &Region, class: StorageClassId) -> f64 {
        self.get(region, class).map_or(0.0, |p| p.effective_price)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassPrice> {
        self.prices.values()
    }

    pub fn total_charge(&self) -> f64 {
        self.prices.values().map(|p| p.charge).sum()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Turns final accumulator totals into effective prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct TieredPriceCalculator;

impl TieredPriceCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn prices(&self, totals: &StorageTotals, book: &ScheduleBook) -> EffectivePrices {
        let mut prices = BTreeMap::new();

        for (region, class, bytes) in totals.observed() {
            let volume_gb = bytes_to_gb(bytes);
            let price = match book.get(region, class) {
                Some(schedule) => ClassPrice {
                    region: region.clone(),
                    storage_class: class,
                    total_bytes: bytes,
                    volume_gb,
                    effective_price: schedule.effective_price(volume_gb),
                    charge: schedule.tiered_charge(volume_gb),
                    priced: true,
                },
                None => {
                    debug!(region = %region, storage_class = %class, "Unpriced class");
                    ClassPrice {
                        region: region.clone(),
                        storage_class: class,
                        total_bytes: bytes,
                        volume_gb,
                        effective_price: 0.0,
                        charge: 0.0,
                        priced: false,
                    }
                }
            };
            prices.insert((region.clone(), class), price);
        }

        EffectivePrices { prices }
    }
}
