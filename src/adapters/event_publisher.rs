//! Scan event sinks.
//!
//! The logging publisher is what a real run uses: coverage loss is a
//! warning, routine progress is debug output. The collector keeps events in
//! memory so tests can assert on exactly which buckets were dropped.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::events::ScanEvent;
use crate::domain::ports::EventPublisher;
use crate::error::Result;

/// Publishes scan events as structured log records.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: ScanEvent) -> Result<()> {
        match &event {
            ScanEvent::BucketLookupFailed { bucket, reason, .. } => {
                warn!(bucket = %bucket, reason = %reason, "Bucket region lookup failed, bucket dropped");
            }
            ScanEvent::RegionUnavailable {
                region,
                bucket_count,
                reason,
                ..
            } => {
                warn!(region = %region, buckets = bucket_count, reason = %reason, "Region unavailable, buckets dropped");
            }
            ScanEvent::BucketSkipped {
                bucket,
                region,
                reason,
                ..
            } => {
                warn!(bucket = %bucket, region = %region, reason = %reason, "Bucket left out of report");
            }
            ScanEvent::PricingGap {
                region,
                storage_class,
                reason,
                ..
            } => {
                warn!(region = %region, storage_class = %storage_class, reason = %reason, "Storage class priced at zero");
            }
            ScanEvent::BucketFilteredOut { bucket, region, .. } => {
                debug!(bucket = %bucket, region = ?region, "Bucket filtered out");
            }
            ScanEvent::BucketScanned {
                bucket,
                region,
                file_count,
                total_bytes,
                pages,
                ..
            } => {
                debug!(bucket = %bucket, region = %region, file_count, total_bytes, pages, "Bucket scanned");
            }
            ScanEvent::BucketDiscardedEmpty { bucket, region, .. } => {
                debug!(bucket = %bucket, region = %region, "Empty bucket omitted");
            }
        }
        Ok(())
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: RwLock<Vec<ScanEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<ScanEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Bucket names carried by events of one type, in publish order.
    pub fn buckets_of_type(&self, event_type: &str) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .filter_map(|e| e.bucket().map(str::to_string))
            .collect()
    }

    /// Events that mark work missing from the report.
    pub fn coverage_losses(&self) -> usize {
        self.events.read().iter().filter(|e| e.is_coverage_loss()).count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: ScanEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Region, StorageClassId};

    #[tokio::test]
    async fn test_logging_publisher_accepts_every_event() {
        let publisher = LoggingEventPublisher::new();
        let region = Region::from("us-east-1");

        for event in [
            ScanEvent::bucket_lookup_failed("gone", "AccessDenied"),
            ScanEvent::bucket_filtered_out("other", Some(&region)),
            ScanEvent::region_unavailable(&region, 3, "no credentials"),
            ScanEvent::bucket_scanned("logs", &region, 2, 10, 1),
            ScanEvent::bucket_skipped("logs", &region, "timeout"),
            ScanEvent::bucket_discarded_empty("empty", &region),
            ScanEvent::pricing_gap(&region, StorageClassId::Snow, "no sku"),
        ] {
            publisher.publish(event).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_collector_filters_by_type() {
        let collector = InMemoryEventCollector::new();
        let region = Region::from("ca-central-1");
        assert!(collector.is_empty());

        collector
            .publish(ScanEvent::bucket_scanned("a", &region, 1, 10, 1))
            .await
            .unwrap();
        collector
            .publish(ScanEvent::bucket_discarded_empty("b", &region))
            .await
            .unwrap();
        collector
            .publish(ScanEvent::bucket_skipped("c", &region, "timeout"))
            .await
            .unwrap();

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.events().len(), 3);
        assert_eq!(collector.events_of_type("BucketScanned").len(), 1);
        assert_eq!(collector.buckets_of_type("BucketDiscardedEmpty"), vec!["b"]);
        assert_eq!(collector.coverage_losses(), 1);
    }
}
