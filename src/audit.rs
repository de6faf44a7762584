//! Audit Run
//!
//! Wires one complete audit: discovery, the region fan-out scan, the join
//! barrier, pricing and cost allocation. Every provider call goes through a
//! single rate limiter created for the run.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::adapters::{LoggingEventPublisher, RateLimitedCatalog, RateLimitedConnector};
use crate::domain::ports::{EventPublisher, ObjectStoreConnector, PricingCatalogClient};
use crate::domain::{BucketRecord, Region, StorageClassId};
use crate::error::{Error, Result};
use crate::pricing::{
    CostAllocator, EffectivePrices, PriceCatalog, ScheduleCache, TieredPriceCalculator,
};
use crate::report::{Report, ReportAssembler, ReportOptions};
use crate::scan::{
    BucketDiscovery, RateLimiter, RegionScanCoordinator, ScanOutcome, ScanPolicy, ScanStats,
    ScanSummary, StorageAccumulator, StorageTotals, DEFAULT_LOOKUP_CONCURRENCY,
};

/// Region scanned when none is given.
pub const DEFAULT_SCAN_REGION: &str = "ca-central-1";
/// Remote operations per second across the whole run.
pub const DEFAULT_RATE_LIMIT: u32 = 5400;
/// Concurrent bucket scans per region.
pub const DEFAULT_THREADING: usize = 400;

// =============================================================================
// Configuration
// =============================================================================

/// What to scan and how hard to push the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub regions: Vec<Region>,
    /// Bucket name allow-list; empty keeps every bucket
    pub name_filter: Vec<String>,
    /// Storage class allow-list; empty counts every class
    pub class_filter: Vec<StorageClassId>,
    pub omit_empty: bool,
    pub rate_limit: u32,
    pub threading: usize,
    pub lookup_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            regions: vec![Region::from(DEFAULT_SCAN_REGION)],
            name_filter: Vec::new(),
            class_filter: Vec::new(),
            omit_empty: false,
            rate_limit: DEFAULT_RATE_LIMIT,
            threading: DEFAULT_THREADING,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(Error::Config("at least one region is required".to_string()));
        }
        if let Some(region) = self.regions.iter().find(|r| r.as_str().trim().is_empty()) {
            return Err(Error::Config(format!("invalid region code '{}'", region)));
        }
        if self.rate_limit == 0 {
            return Err(Error::Config("rate limit must be at least 1 op/s".to_string()));
        }
        if self.threading == 0 {
            return Err(Error::Config("threading must be at least 1".to_string()));
        }
        if self.lookup_concurrency == 0 {
            return Err(Error::Config("lookup concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn policy(&self) -> ScanPolicy {
        ScanPolicy::new(self.class_filter.iter().copied(), self.omit_empty)
    }
}

/// Full configuration of one audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditConfig {
    pub scan: ScanConfig,
    pub report: ReportOptions,
}

impl AuditConfig {
    pub fn validate(&self) -> Result<()> {
        self.scan.validate()
    }
}

// =============================================================================
// Run
// =============================================================================

/// Everything a run produced, before reporting.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    /// Priced buckets in discovery order
    pub buckets: Vec<BucketRecord>,
    pub totals: StorageTotals,
    pub prices: EffectivePrices,
    pub summary: ScanSummary,
}

impl AuditOutcome {
    pub fn total_cost(&self) -> f64 {
        self.buckets.iter().map(|b| b.cost).sum()
    }
}

pub struct AuditRun {
    connector: Arc<dyn ObjectStoreConnector>,
    pricing: Arc<dyn PricingCatalogClient>,
    events: Arc<dyn EventPublisher>,
    /// Price schedules survive between runs; usage never does
    schedules: ScheduleCache,
}

impl AuditRun {
    /// Raw provider clients; the run adds rate limiting itself.
    pub fn new(
        connector: Arc<dyn ObjectStoreConnector>,
        pricing: Arc<dyn PricingCatalogClient>,
    ) -> Self {
        Self {
            connector,
            pricing,
            events: Arc::new(LoggingEventPublisher::new()),
            schedules: ScheduleCache::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    /// Run the audit to completion.
    ///
    /// Only configuration errors and a failed bucket listing abort the run;
    /// every other failure drops its unit of work and is published as a
    /// scan event.
    #[instrument(skip(self, config), fields(regions = config.scan.regions.len()))]
    pub async fn run(&self, config: &AuditConfig) -> Result<AuditOutcome> {
        config.validate()?;
        let scan = &config.scan;

        let limiter = Arc::new(RateLimiter::new(scan.rate_limit)?);
        let connector: Arc<dyn ObjectStoreConnector> = Arc::new(RateLimitedConnector::new(
            self.connector.clone(),
            limiter.clone(),
        ));
        let pricing: Arc<dyn PricingCatalogClient> =
            Arc::new(RateLimitedCatalog::new(self.pricing.clone(), limiter.clone()));

        // Discovery
        let discovery_client = connector.connect(&scan.regions[0]).await?;
        let buckets = BucketDiscovery::new(discovery_client, self.events.clone())
            .with_lookup_concurrency(scan.lookup_concurrency)
            .list_and_filter(&scan.regions, &scan.name_filter)
            .await?;
        let discovery_order: HashMap<String, usize> = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();

        // Scan
        let accumulator = Arc::new(StorageAccumulator::new(&scan.regions));
        let stats = Arc::new(ScanStats::new());
        let coordinator = RegionScanCoordinator::new(
            connector,
            accumulator.clone(),
            Arc::new(scan.policy()),
            stats.clone(),
            self.events.clone(),
            scan.threading,
        );
        let outcomes = coordinator.scan_all(&scan.regions, buckets).await;

        let mut priced: Vec<BucketRecord> = outcomes
            .into_iter()
            .filter_map(ScanOutcome::into_populated)
            .collect();
        priced.sort_by_key(|b| discovery_order.get(&b.name).copied().unwrap_or(usize::MAX));

        // Pricing, strictly after every scanner has joined
        let totals = accumulator.snapshot();
        let book = PriceCatalog::new(pricing, self.events.clone())
            .with_cache(self.schedules.clone())
            .load(&totals)
            .await;
        let prices = TieredPriceCalculator::new().prices(&totals, &book);
        CostAllocator::new().allocate(&mut priced, &totals, &prices);

        let summary = stats
            .summary()
            .with_limiter(limiter.taken(), limiter.throttled());

        let outcome = AuditOutcome {
            buckets: priced,
            totals,
            prices,
            summary,
        };
        info!(
            buckets = outcome.buckets.len(),
            skipped = summary.buckets_skipped,
            empty = summary.buckets_empty,
            objects = summary.objects_counted,
            remote_calls = summary.remote_calls,
            total_cost = outcome.total_cost(),
            "Audit complete"
        );
        Ok(outcome)
    }

    /// Assemble the report for a finished run.
    pub fn report(outcome: &AuditOutcome, options: &ReportOptions) -> Report {
        ReportAssembler::new(options.clone())
            .assemble(&outcome.buckets)
            .with_prices(outcome.prices.iter().cloned())
            .with_scan_summary(outcome.summary)
    }
}
