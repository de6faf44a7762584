//! Bucket Scanner
//!
//! Walks the full object listing of one bucket, page by page, and records
//! every counted object both on the bucket and in the shared accumulator.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::accumulator::StorageAccumulator;
use super::stats::ScanStats;
use crate::domain::ports::{EventPublisher, ObjectStoreClient};
use crate::domain::{BucketRecord, ScanEvent, StorageClassId};
use crate::error::Error;

/// What gets counted and what gets kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Only objects of these classes are counted; `None` counts everything.
    pub class_filter: Option<BTreeSet<StorageClassId>>,
    /// Drop buckets that end up with no counted objects.
    pub omit_empty: bool,
}

impl ScanPolicy {
    /// Build a policy from a class allow-list; an empty list counts everything.
    pub fn new(classes: impl IntoIterator<Item = StorageClassId>, omit_empty: bool) -> Self {
        let classes: BTreeSet<_> = classes.into_iter().collect();
        Self {
            class_filter: (!classes.is_empty()).then_some(classes),
            omit_empty,
        }
    }

    pub fn counts(&self, class: StorageClassId) -> bool {
        self.class_filter
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&class))
    }
}

/// Result of scanning one bucket.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Fully listed and kept for pricing.
    Populated(BucketRecord),
    /// Listed, empty, and dropped because empty buckets are omitted.
    Empty(BucketRecord),
    /// A page fetch failed; partial counts were discarded.
    Failed { bucket: BucketRecord, error: Error },
    /// The bucket does not belong to the scanning region; it was not listed.
    RegionMismatch(BucketRecord),
}

impl ScanOutcome {
    pub fn bucket(&self) -> &BucketRecord {
        match self {
            ScanOutcome::Populated(bucket)
            | ScanOutcome::Empty(bucket)
            | ScanOutcome::Failed { bucket, .. }
            | ScanOutcome::RegionMismatch(bucket) => bucket,
        }
    }

    /// The record, if it goes on to pricing.
    pub fn into_populated(self) -> Option<BucketRecord> {
        match self {
            ScanOutcome::Populated(bucket) => Some(bucket),
            _ => None,
        }
    }
}

/// Scans buckets of the region its client is bound to.
#[derive(Clone)]
pub struct BucketScanner {
    client: Arc<dyn ObjectStoreClient>,
    accumulator: Arc<StorageAccumulator>,
    policy: Arc<ScanPolicy>,
    stats: Arc<ScanStats>,
    events: Arc<dyn EventPublisher>,
}

impl BucketScanner {
    pub fn new(
        client: Arc<dyn ObjectStoreClient>,
        accumulator: Arc<StorageAccumulator>,
        policy: Arc<ScanPolicy>,
        stats: Arc<ScanStats>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            client,
            accumulator,
            policy,
            stats,
            events,
        }
    }

    /// Scan one bucket to completion.
    #[instrument(skip(self, bucket), fields(bucket = %bucket.name, region = %bucket.region))]
    pub async fn scan(&self, mut bucket: BucketRecord) -> ScanOutcome {
        if &bucket.region != self.client.region() {
            warn!(client_region = %self.client.region(), "Bucket belongs to another region, not scanned");
            self.stats.record_bucket_skipped();
            let reason = format!("bucket handed to a scanner for {}", self.client.region());
            self.publish(ScanEvent::bucket_skipped(&bucket.name, &bucket.region, reason))
                .await;
            return ScanOutcome::RegionMismatch(bucket);
        }

        bucket.reset_measurements();
        let mut cursor: Option<String> = None;
        let mut pages = 0u64;

        loop {
            let page = match self
                .client
                .list_objects_page(&bucket.name, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    self.accumulator
                        .retract(&bucket.region, &bucket.bytes_by_storage_class);
                    bucket.reset_measurements();
                    self.stats.record_bucket_skipped();

                    warn!(
                        page = pages,
                        transient = error.is_transient(),
                        error = %error,
                        "Object listing failed, bucket excluded"
                    );
                    self.publish(ScanEvent::bucket_skipped(&bucket.name, &bucket.region, &error))
                        .await;
                    return ScanOutcome::Failed { bucket, error };
                }
            };

            pages += 1;
            self.stats.record_page();

            let mut counted = 0u64;
            let mut filtered = 0u64;
            for object in page.objects {
                if !self.policy.counts(object.storage_class) {
                    filtered += 1;
                    continue;
                }
                bucket.record_object(object.storage_class, object.size, object.last_modified);
                self.accumulator
                    .add(&bucket.region, object.storage_class, object.size);
                counted += 1;
            }
            self.stats.record_objects(counted, filtered);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if bucket.is_empty() && self.policy.omit_empty {
            debug!(pages, "Bucket is empty, omitted");
            self.stats.record_bucket_empty();
            self.publish(ScanEvent::bucket_discarded_empty(&bucket.name, &bucket.region))
                .await;
            return ScanOutcome::Empty(bucket);
        }

        debug!(
            pages,
            file_count = bucket.file_count,
            total_bytes = bucket.total_bytes,
            "Bucket scanned"
        );
        self.stats.record_bucket_scanned();
        self.publish(ScanEvent::bucket_scanned(
            &bucket.name,
            &bucket.region,
            bucket.file_count,
            bucket.total_bytes,
            pages,
        ))
        .await;

        ScanOutcome::Populated(bucket)
    }

    async fn publish(&self, event: ScanEvent) {
        if let Err(e) = self.events.publish(event).await {
            warn!(error = %e, "Failed to publish scan event");
        }
    }
}
