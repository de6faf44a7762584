//! Region Scan Coordinator
//!
//! Fans out one task per region. Each region task connects its own client
//! and runs a bounded pool of bucket scanners over the buckets of that
//! region. Outcomes flow back over a channel large enough to hold every
//! bucket, so workers never block on sending and the coordinator can join
//! every task before it drains the results.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::accumulator::StorageAccumulator;
use super::scanner::{BucketScanner, ScanOutcome, ScanPolicy};
use super::stats::ScanStats;
use crate::domain::ports::{EventPublisher, ObjectStoreConnector};
use crate::domain::{BucketRecord, Region, ScanEvent};

/// Take the contiguous run of `region` out of a region-sorted bucket list.
pub fn claim_region(buckets: &mut Vec<BucketRecord>, region: &Region) -> Vec<BucketRecord> {
    let start = buckets.partition_point(|b| &b.region < region);
    let len = buckets[start..].partition_point(|b| &b.region == region);
    buckets.drain(start..start + len).collect()
}

/// Shared state handed to every region task.
#[derive(Clone)]
struct RegionContext {
    connector: Arc<dyn ObjectStoreConnector>,
    accumulator: Arc<StorageAccumulator>,
    policy: Arc<ScanPolicy>,
    stats: Arc<ScanStats>,
    events: Arc<dyn EventPublisher>,
    threading: usize,
}

pub struct RegionScanCoordinator {
    ctx: RegionContext,
}

impl RegionScanCoordinator {
    /// `threading` is the per-region worker bound (minimum 1).
    pub fn new(
        connector: Arc<dyn ObjectStoreConnector>,
        accumulator: Arc<StorageAccumulator>,
        policy: Arc<ScanPolicy>,
        stats: Arc<ScanStats>,
        events: Arc<dyn EventPublisher>,
        threading: usize,
    ) -> Self {
        Self {
            ctx: RegionContext {
                connector,
                accumulator,
                policy,
                stats,
                events,
                threading: threading.max(1),
            },
        }
    }

    /// Scan every bucket of every requested region.
    ///
    /// `buckets` must be sorted by region. Returns once every region task
    /// and every worker has finished; outcomes arrive in completion order.
    pub async fn scan_all(&self, regions: &[Region], buckets: Vec<BucketRecord>) -> Vec<ScanOutcome> {
        let total = buckets.len();
        let mut remaining = buckets;
        let (tx, mut rx) = mpsc::channel(total.max(1));

        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();

        for region in regions {
            if !seen.insert(region.clone()) {
                debug!(region = %region, "Duplicate region ignored");
                continue;
            }

            let subset = claim_region(&mut remaining, region);
            if subset.is_empty() {
                debug!(region = %region, "No buckets in region");
                continue;
            }

            let ctx = self.ctx.clone();
            let tx = tx.clone();
            let region = region.clone();
            tasks.spawn(async move { scan_region(ctx, region, subset, tx).await });
        }
        drop(tx);

        if !remaining.is_empty() {
            warn!(
                count = remaining.len(),
                "Buckets outside the requested regions were not scanned"
            );
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Region scan task failed");
            }
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        info!(
            buckets = total,
            outcomes = outcomes.len(),
            regions = seen.len(),
            "Scan phase complete"
        );
        outcomes
    }
}

#[instrument(skip(ctx, buckets, tx), fields(region = %region, buckets = buckets.len()))]
async fn scan_region(
    ctx: RegionContext,
    region: Region,
    buckets: Vec<BucketRecord>,
    tx: mpsc::Sender<ScanOutcome>,
) {
    let client = match ctx.connector.connect(&region).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Region unavailable, dropping its buckets");
            ctx.stats.record_region_unavailable();
            let event = ScanEvent::region_unavailable(&region, buckets.len(), &e);
            if let Err(e) = ctx.events.publish(event).await {
                warn!(error = %e, "Failed to publish scan event");
            }
            return;
        }
    };

    let scanner = BucketScanner::new(
        client,
        ctx.accumulator.clone(),
        ctx.policy.clone(),
        ctx.stats.clone(),
        ctx.events.clone(),
    );
    let permits = Arc::new(Semaphore::new(ctx.threading));
    let mut workers = JoinSet::new();

    for bucket in buckets {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Worker pool closed");
                break;
            }
        };
        let scanner = scanner.clone();
        let tx = tx.clone();

        workers.spawn(async move {
            let _permit = permit;
            let outcome = scanner.scan(bucket).await;
            if tx.send(outcome).await.is_err() {
                warn!("Result channel closed before outcome was delivered");
            }
        });
    }

    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Bucket worker failed");
        }
    }
    debug!("Region scan complete");
}
