//! Scan Events
//!
//! Immutable records of what happened to each bucket, region and price
//! lookup during a run. Every unit of work that is skipped produces an
//! event, so a reader of the event stream can tell exactly which parts of
//! the account the report does not cover.
//!
//! # Example
//!
//! ```ignore
//! let event = ScanEvent::bucket_skipped("logs", &region, "ListObjectsV2 failed: timeout");
//! event_publisher.publish(event).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Region, StorageClassId};

/// Event emitted by the audit pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    // =========================================================================
    // Discovery Events
    // =========================================================================
    /// The bucket's region could not be resolved; it was dropped.
    BucketLookupFailed {
        bucket: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The bucket did not match the region or name filters.
    BucketFilteredOut {
        bucket: String,
        region: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Scan Events
    // =========================================================================
    /// No client could be created for a region; its buckets were dropped.
    RegionUnavailable {
        region: String,
        bucket_count: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A bucket was fully listed.
    BucketScanned {
        bucket: String,
        region: String,
        file_count: u64,
        total_bytes: u64,
        pages: u64,
        timestamp: DateTime<Utc>,
    },

    /// A bucket listing failed; its partial counts were discarded.
    BucketSkipped {
        bucket: String,
        region: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An empty bucket was dropped because empty buckets are omitted.
    BucketDiscardedEmpty {
        bucket: String,
        region: String,
        timestamp: DateTime<Utc>,
    },

    // =========================================================================
    // Pricing Events
    // =========================================================================
    /// No usable price schedule; the class is priced at zero.
    PricingGap {
        region: String,
        storage_class: StorageClassId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    pub fn bucket_lookup_failed(bucket: &str, reason: impl ToString) -> Self {
        ScanEvent::BucketLookupFailed {
            bucket: bucket.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn bucket_filtered_out(bucket: &str, region: Option<&Region>) -> Self {
        ScanEvent::BucketFilteredOut {
            bucket: bucket.to_string(),
            region: region.map(Region::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn region_unavailable(region: &Region, bucket_count: usize, reason: impl ToString) -> Self {
        ScanEvent::RegionUnavailable {
            region: region.to_string(),
            bucket_count,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn bucket_scanned(
        bucket: &str,
        region: &Region,
        file_count: u64,
        total_bytes: u64,
        pages: u64,
    ) -> Self {
        ScanEvent::BucketScanned {
            bucket: bucket.to_string(),
            region: region.to_string(),
            file_count,
            total_bytes,
            pages,
            timestamp: Utc::now(),
        }
    }

    pub fn bucket_skipped(bucket: &str, region: &Region, reason: impl ToString) -> Self {
        ScanEvent::BucketSkipped {
            bucket: bucket.to_string(),
            region: region.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn bucket_discarded_empty(bucket: &str, region: &Region) -> Self {
        ScanEvent::BucketDiscardedEmpty {
            bucket: bucket.to_string(),
            region: region.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn pricing_gap(region: &Region, storage_class: StorageClassId, reason: impl ToString) -> Self {
        ScanEvent::PricingGap {
            region: region.to_string(),
            storage_class,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::BucketLookupFailed { .. } => "BucketLookupFailed",
            ScanEvent::BucketFilteredOut { .. } => "BucketFilteredOut",
            ScanEvent::RegionUnavailable { .. } => "RegionUnavailable",
            ScanEvent::BucketScanned { .. } => "BucketScanned",
            ScanEvent::BucketSkipped { .. } => "BucketSkipped",
            ScanEvent::BucketDiscardedEmpty { .. } => "BucketDiscardedEmpty",
            ScanEvent::PricingGap { .. } => "PricingGap",
        }
    }

    /// Bucket the event is about, if any.
    pub fn bucket(&self) -> Option<&str> {
        match self {
            ScanEvent::BucketLookupFailed { bucket, .. }
            | ScanEvent::BucketFilteredOut { bucket, .. }
            | ScanEvent::BucketScanned { bucket, .. }
            | ScanEvent::BucketSkipped { bucket, .. }
            | ScanEvent::BucketDiscardedEmpty { bucket, .. } => Some(bucket),
            ScanEvent::RegionUnavailable { .. } | ScanEvent::PricingGap { .. } => None,
        }
    }

    /// Whether the event marks work left out of the report.
    pub fn is_coverage_loss(&self) -> bool {
        matches!(
            self,
            ScanEvent::BucketLookupFailed { .. }
                | ScanEvent::RegionUnavailable { .. }
                | ScanEvent::BucketSkipped { .. }
                | ScanEvent::PricingGap { .. }
        )
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ScanEvent::BucketLookupFailed { timestamp, .. }
            | ScanEvent::BucketFilteredOut { timestamp, .. }
            | ScanEvent::RegionUnavailable { timestamp, .. }
            | ScanEvent::BucketScanned { timestamp, .. }
            | ScanEvent::BucketSkipped { timestamp, .. }
            | ScanEvent::BucketDiscardedEmpty { timestamp, .. }
            | ScanEvent::PricingGap { timestamp, .. } => *timestamp,
        }
    }
}
