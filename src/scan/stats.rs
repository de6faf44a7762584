//! Run counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters updated by every scanner of a run.
#[derive(Debug, Default)]
pub struct ScanStats {
    pages_fetched: AtomicU64,
    objects_counted: AtomicU64,
    objects_filtered: AtomicU64,
    buckets_scanned: AtomicU64,
    buckets_skipped: AtomicU64,
    buckets_empty: AtomicU64,
    regions_unavailable: AtomicU64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_objects(&self, counted: u64, filtered: u64) {
        self.objects_counted.fetch_add(counted, Ordering::Relaxed);
        self.objects_filtered.fetch_add(filtered, Ordering::Relaxed);
    }

    pub fn record_bucket_scanned(&self) {
        self.buckets_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bucket_skipped(&self) {
        self.buckets_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bucket_empty(&self) {
        self.buckets_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_region_unavailable(&self) {
        self.regions_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            objects_counted: self.objects_counted.load(Ordering::Relaxed),
            objects_filtered: self.objects_filtered.load(Ordering::Relaxed),
            buckets_scanned: self.buckets_scanned.load(Ordering::Relaxed),
            buckets_skipped: self.buckets_skipped.load(Ordering::Relaxed),
            buckets_empty: self.buckets_empty.load(Ordering::Relaxed),
            regions_unavailable: self.regions_unavailable.load(Ordering::Relaxed),
            rate_limited_calls: 0,
            remote_calls: 0,
        }
    }
}

/// Serializable summary of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub pages_fetched: u64,
    pub objects_counted: u64,
    pub objects_filtered: u64,
    pub buckets_scanned: u64,
    pub buckets_skipped: u64,
    pub buckets_empty: u64,
    pub regions_unavailable: u64,
    /// Remote calls that waited on the rate limiter
    pub rate_limited_calls: u64,
    /// Remote calls issued through the rate limiter
    pub remote_calls: u64,
}

impl ScanSummary {
    /// Attach the rate limiter counters.
    pub fn with_limiter(mut self, remote_calls: u64, rate_limited_calls: u64) -> Self {
        self.remote_calls = remote_calls;
        self.rate_limited_calls = rate_limited_calls;
        self
    }
}
