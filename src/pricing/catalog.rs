//! Price Catalog
//!
//! Fetches the schedule of every (region, class) pair the scan observed.
//! Fetched schedules land in a [`ScheduleCache`] that outlives a single run,
//! so repeated audits from the same [`crate::AuditRun`] only ask the provider
//! for pairs they have not priced before. A pair that cannot be priced is
//! recorded as a gap and logged, never fatal. Gaps are not cached.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::tiered::PriceSchedule;
use crate::domain::ports::{EventPublisher, PricingCatalogClient};
use crate::domain::{Region, ScanEvent, StorageClassId};
use crate::error::{Error, Result};
use crate::scan::StorageTotals;

/// Schedules for one run, plus the pairs that could not be priced.
#[derive(Debug, Clone, Default)]
pub struct ScheduleBook {
    schedules: BTreeMap<(Region, StorageClassId), PriceSchedule>,
    gaps: BTreeSet<(Region, StorageClassId)>,
}

impl ScheduleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: Region, class: StorageClassId, schedule: PriceSchedule) {
        self.gaps.remove(&(region.clone(), class));
        self.schedules.insert((region, class), schedule);
    }

    pub fn mark_gap(&mut self, region: Region, class: StorageClassId) {
        self.gaps.insert((region, class));
    }

    pub fn get(&self, region: &Region, class: StorageClassId) -> Option<&PriceSchedule> {
        self.schedules.get(&(region.clone(), class))
    }

    pub fn gaps(&self) -> impl Iterator<Item = &(Region, StorageClassId)> {
        self.gaps.iter()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

/// Schedules shared by every catalog built over it.
pub type ScheduleCache = Arc<DashMap<(Region, StorageClassId), PriceSchedule>>;

pub struct PriceCatalog {
    client: Arc<dyn PricingCatalogClient>,
    events: Arc<dyn EventPublisher>,
    cache: ScheduleCache,
}

impl PriceCatalog {
    pub fn new(client: Arc<dyn PricingCatalogClient>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            client,
            events,
            cache: ScheduleCache::default(),
        }
    }

    /// Reuse schedules fetched by earlier catalogs.
    pub fn with_cache(mut self, cache: ScheduleCache) -> Self {
        self.cache = cache;
        self
    }

    /// Schedule for one pair, from cache or the provider.
    pub async fn schedule(&self, region: &Region, class: StorageClassId) -> Result<PriceSchedule> {
        let key = (region.clone(), class);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.value().clone());
        }

        if class.pricing_sku().is_none() {
            return Err(Error::PricingGap {
                region: region.to_string(),
                storage_class: class.to_string(),
            });
        }

        let schedule = self.client.price_schedule(region, class).await?;
        self.cache.insert(key, schedule.clone());
        Ok(schedule)
    }

    /// Fetch schedules for every pair with a non-zero total.
    pub async fn load(&self, totals: &StorageTotals) -> ScheduleBook {
        let mut book = ScheduleBook::new();

        for (region, class, bytes) in totals.observed() {
            match self.schedule(region, class).await {
                Ok(schedule) => {
                    debug!(region = %region, storage_class = %class, bands = schedule.bands().len(), "Price schedule loaded");
                    book.insert(region.clone(), class, schedule);
                }
                Err(e) => {
                    warn!(
                        region = %region,
                        storage_class = %class,
                        bytes,
                        error = %e,
                        "No usable price schedule, class priced at zero"
                    );
                    book.mark_gap(region.clone(), class);
                    if let Err(e) = self
                        .events
                        .publish(ScanEvent::pricing_gap(region, class, &e))
                        .await
                    {
                        warn!(error = %e, "Failed to publish scan event");
                    }
                }
            }
        }

        info!(
            schedules = book.len(),
            gaps = book.gaps().count(),
            "Price schedules loaded"
        );
        book
    }
}
