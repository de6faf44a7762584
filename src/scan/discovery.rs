//! Bucket Discovery
//!
//! Lists the account's buckets, resolves where each one lives and keeps the
//! ones inside the requested regions (and name allow-list).

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::domain::ports::{EventPublisher, ObjectStoreClient};
use crate::domain::{BucketRecord, Region, ScanEvent};
use crate::error::Result;

/// Default number of region lookups in flight at once.
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 16;

pub struct BucketDiscovery {
    client: Arc<dyn ObjectStoreClient>,
    events: Arc<dyn EventPublisher>,
    lookup_concurrency: usize,
}

impl BucketDiscovery {
    pub fn new(client: Arc<dyn ObjectStoreClient>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            client,
            events,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }

    pub fn with_lookup_concurrency(mut self, concurrency: usize) -> Self {
        self.lookup_concurrency = concurrency.max(1);
        self
    }

    /// Discover the buckets to audit, stably sorted by region.
    ///
    /// Failing to list buckets at all is fatal. A failed region lookup only
    /// drops that bucket.
    #[instrument(skip(self, regions, name_allow_list), fields(regions = regions.len()))]
    pub async fn list_and_filter(
        &self,
        regions: &[Region],
        name_allow_list: &[String],
    ) -> Result<Vec<BucketRecord>> {
        let listings = self.client.list_buckets().await?;
        let listed = listings.len();

        let wanted_regions: HashSet<&Region> = regions.iter().collect();
        let wanted_names: HashSet<&str> = name_allow_list.iter().map(String::as_str).collect();

        let mut candidates = Vec::with_capacity(listings.len());
        for listing in listings {
            if wanted_names.is_empty() || wanted_names.contains(listing.name.as_str()) {
                candidates.push(listing);
            } else {
                self.publish(ScanEvent::bucket_filtered_out(&listing.name, None))
                    .await;
            }
        }

        let client = &self.client;
        let resolved: Vec<_> = stream::iter(candidates)
            .map(|listing| async move {
                let region = client.resolve_bucket_region(&listing.name).await;
                (listing, region)
            })
            .buffered(self.lookup_concurrency)
            .collect()
            .await;

        let mut buckets = Vec::with_capacity(resolved.len());
        for (listing, region) in resolved {
            match region {
                Ok(region) if wanted_regions.contains(&region) => {
                    buckets.push(BucketRecord::discovered(
                        listing.name,
                        region,
                        listing.creation_date,
                    ));
                }
                Ok(region) => {
                    debug!(bucket = %listing.name, region = %region, "Bucket outside requested regions");
                    self.publish(ScanEvent::bucket_filtered_out(&listing.name, Some(&region)))
                        .await;
                }
                Err(e) => {
                    warn!(bucket = %listing.name, error = %e, "Bucket region lookup failed, dropping bucket");
                    self.publish(ScanEvent::bucket_lookup_failed(&listing.name, &e))
                        .await;
                }
            }
        }

        buckets.sort_by(|a, b| a.region.cmp(&b.region));

        info!(listed, accepted = buckets.len(), "Bucket discovery complete");
        Ok(buckets)
    }

    async fn publish(&self, event: ScanEvent) {
        if let Err(e) = self.events.publish(event).await {
            warn!(error = %e, "Failed to publish scan event");
        }
    }
}
