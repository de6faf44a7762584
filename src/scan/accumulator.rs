//! Global Storage Accumulator
//!
//! Cumulative bytes per region and storage class, shared by every scanner of
//! a run. Each region owns its own lock, so scanners in different regions
//! never contend; inside a region the critical section is a single map
//! increment.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::domain::{ClassBytes, Region, StorageClassId};

/// Region-sharded accumulator.
///
/// The set of regions is fixed at construction; contributions for a region
/// outside that set are dropped with a warning since no scanner should ever
/// produce one.
#[derive(Debug, Default)]
pub struct StorageAccumulator {
    shards: HashMap<Region, Mutex<ClassBytes>>,
}

impl StorageAccumulator {
    /// Create an accumulator with one empty shard per region.
    pub fn new<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Self {
        let shards = regions
            .into_iter()
            .map(|region| (region.clone(), Mutex::new(ClassBytes::new())))
            .collect();
        Self { shards }
    }

    /// Add `bytes` of `class` to `region`.
    pub fn add(&self, region: &Region, class: StorageClassId, bytes: u64) {
        match self.shards.get(region) {
            Some(shard) => {
                *shard.lock().entry(class).or_insert(0) += bytes;
            }
            None => {
                tracing::warn!(region = %region, "Contribution for untracked region dropped");
            }
        }
    }

    /// Remove a bucket's partial contribution again.
    pub fn retract(&self, region: &Region, contribution: &ClassBytes) {
        let Some(shard) = self.shards.get(region) else {
            return;
        };
        let mut classes = shard.lock();
        for (class, bytes) in contribution {
            if let Some(total) = classes.get_mut(class) {
                *total = total.saturating_sub(*bytes);
            }
        }
    }

    /// Current total for one region/class pair.
    pub fn total(&self, region: &Region, class: StorageClassId) -> u64 {
        self.shards
            .get(region)
            .and_then(|shard| shard.lock().get(&class).copied())
            .unwrap_or(0)
    }

    /// Copy the current state out of the shards.
    ///
    /// Meant to be called after every scanner has joined; pricing and
    /// allocation only ever read the snapshot.
    pub fn snapshot(&self) -> StorageTotals {
        let regions = self
            .shards
            .iter()
            .map(|(region, shard)| (region.clone(), shard.lock().clone()))
            .collect();
        StorageTotals { regions }
    }
}

/// Frozen accumulator state, ordered by region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageTotals {
    regions: BTreeMap<Region, ClassBytes>,
}

impl StorageTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of `class` in `region`, zero when never observed.
    pub fn get(&self, region: &Region, class: StorageClassId) -> u64 {
        self.regions
            .get(region)
            .and_then(|classes| classes.get(&class).copied())
            .unwrap_or(0)
    }

    pub fn insert(&mut self, region: Region, class: StorageClassId, bytes: u64) {
        self.regions.entry(region).or_default().insert(class, bytes);
    }

    pub fn region(&self, region: &Region) -> Option<&ClassBytes> {
        self.regions.get(region)
    }

    /// Iterate over every (region, class, bytes) triple.
    pub fn iter(&self) -> impl Iterator<Item = (&Region, StorageClassId, u64)> {
        self.regions
            .iter()
            .flat_map(|(region, classes)| classes.iter().map(move |(c, b)| (region, *c, *b)))
    }

    /// Pairs with a non-zero byte count, the ones that need a price.
    pub fn observed(&self) -> impl Iterator<Item = (&Region, StorageClassId, u64)> {
        self.iter().filter(|(_, _, bytes)| *bytes > 0)
    }

    pub fn total_bytes(&self) -> u64 {
        self.iter().map(|(_, _, bytes)| bytes).sum()
    }
}
