//! Audit Integration Tests
//!
//! Full runs against the in-memory provider:
//! - Scan: partitioning, failures, omitted buckets
//! - Pricing: end-to-end costs, conservation, pricing gaps
//! - Reporting: grouping and ordering of a finished run

use std::sync::Arc;

use bucket_ledger::adapters::memory::fixture_object;
use bucket_ledger::adapters::{InMemoryEventCollector, InMemoryObjectStore, InMemoryPriceCatalog};
use bucket_ledger::domain::{ClassBytes, ObjectSummary};
use bucket_ledger::pricing::{PriceBand, PriceSchedule};
use bucket_ledger::{
    AuditConfig, AuditOutcome, AuditRun, BucketRecord, Error, Region, ScanConfig, StorageClassId,
};

const CA: &str = "ca-central-1";
const US: &str = "us-east-1";

fn objects(sizes: &[(StorageClassId, u64)]) -> Vec<ObjectSummary> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, (class, size))| fixture_object(&format!("obj-{}", i), *size, *class))
        .collect()
}

fn config(regions: &[&str]) -> AuditConfig {
    AuditConfig {
        scan: ScanConfig {
            regions: regions.iter().map(|r| Region::from(*r)).collect(),
            rate_limit: 100_000,
            threading: 4,
            ..ScanConfig::default()
        },
        ..AuditConfig::default()
    }
}

fn flat_catalog(regions: &[&str], price: f64) -> InMemoryPriceCatalog {
    let mut catalog = InMemoryPriceCatalog::new();
    for region in regions {
        for class in [
            StorageClassId::Standard,
            StorageClassId::Glacier,
            StorageClassId::StandardIa,
        ] {
            catalog = catalog.with_schedule(region, class, PriceSchedule::flat(price).unwrap());
        }
    }
    catalog
}

async fn run(
    store: &InMemoryObjectStore,
    catalog: InMemoryPriceCatalog,
    config: &AuditConfig,
) -> (bucket_ledger::Result<AuditOutcome>, Arc<InMemoryEventCollector>) {
    let events = Arc::new(InMemoryEventCollector::new());
    let outcome = AuditRun::new(Arc::new(store.clone()), Arc::new(catalog))
        .with_events(events.clone())
        .run(config)
        .await;
    (outcome, events)
}

fn find<'a>(outcome: &'a AuditOutcome, name: &str) -> Option<&'a BucketRecord> {
    outcome.buckets.iter().find(|b| b.name == name)
}

/// Sum of reported bucket bytes per (region, class).
fn reported_totals(outcome: &AuditOutcome, region: &Region) -> ClassBytes {
    let mut sums = ClassBytes::new();
    for bucket in outcome.buckets.iter().filter(|b| &b.region == region) {
        for (class, bytes) in &bucket.bytes_by_storage_class {
            *sums.entry(*class).or_insert(0) += bytes;
        }
    }
    sums
}

// =============================================================================
// Pricing
// =============================================================================

mod pricing_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_bucket_costs() {
        let store = InMemoryObjectStore::new();
        store
            .add_bucket("alpha", Some(CA), objects(&[(StorageClassId::Standard, 50_000_000)]))
            .add_bucket("beta", Some(CA), objects(&[(StorageClassId::Standard, 5_000_033)]))
            .add_bucket(
                "bulk",
                Some(CA),
                objects(&[(StorageClassId::Standard, 50_000_000_000 - 55_000_033)]),
            );

        let (outcome, _) = run(&store, flat_catalog(&[CA], 0.25), &config(&[CA])).await;
        let outcome = outcome.unwrap();

        let ca = Region::from(CA);
        assert_eq!(outcome.totals.get(&ca, StorageClassId::Standard), 50_000_000_000);

        let alpha = find(&outcome, "alpha").unwrap();
        let beta = find(&outcome, "beta").unwrap();
        assert!((alpha.cost - 0.011641532182693481).abs() < 1e-12);
        assert!((beta.cost - 0.0011641609016805887).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_costs_conserve_tiered_charge() {
        let store = InMemoryObjectStore::new().with_page_size(2);
        let gb = 1u64 << 30;
        store
            .add_bucket("a", Some(CA), objects(&[(StorageClassId::Standard, 300 * gb)]))
            .add_bucket(
                "b",
                Some(CA),
                objects(&[(StorageClassId::Standard, 100 * gb), (StorageClassId::Standard, 50 * gb)]),
            );

        let catalog = InMemoryPriceCatalog::new().with_schedule(
            CA,
            StorageClassId::Standard,
            PriceSchedule::new(vec![
                PriceBand::new(0.0, Some(400.0), 0.25),
                PriceBand::new(400.0, None, 0.20),
            ])
            .unwrap(),
        );

        let (outcome, _) = run(&store, catalog, &config(&[CA])).await;
        let outcome = outcome.unwrap();

        // 450 GB: 400 * 0.25 + 50 * 0.20
        assert!((outcome.total_cost() - 110.0).abs() < 110.0 * 1e-9);
        assert!((outcome.prices.total_charge() - 110.0).abs() < 1e-9);

        let a = find(&outcome, "a").unwrap();
        assert!((a.cost - 110.0 * 300.0 / 450.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unpriced_class_costs_nothing() {
        let store = InMemoryObjectStore::new();
        store.add_bucket(
            "mixed",
            Some(CA),
            objects(&[(StorageClassId::Standard, 1 << 30), (StorageClassId::DeepArchive, 1 << 30)]),
        );
        let catalog = InMemoryPriceCatalog::new().with_schedule(
            CA,
            StorageClassId::Standard,
            PriceSchedule::flat(0.02).unwrap(),
        );

        let (outcome, events) = run(&store, catalog, &config(&[CA])).await;
        let outcome = outcome.unwrap();

        assert!((find(&outcome, "mixed").unwrap().cost - 0.02).abs() < 1e-12);
        assert_eq!(events.events_of_type("PricingGap").len(), 1);
    }
}

// =============================================================================
// Scan
// =============================================================================

mod scan_tests {
    use super::*;

    fn multi_region_store() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new().with_page_size(3);
        for i in 0..30u64 {
            let region = match i % 3 {
                0 => Some(CA),
                1 => Some(US),
                _ => None,
            };
            let sizes: Vec<_> = (0..(i % 7))
                .map(|k| {
                    let class = if k % 2 == 0 {
                        StorageClassId::Standard
                    } else {
                        StorageClassId::StandardIa
                    };
                    (class, 1_000 * (i + 1) + k)
                })
                .collect();
            store.add_bucket(&format!("bucket-{:02}", i), region, objects(&sizes));
        }
        store
    }

    #[tokio::test]
    async fn test_accumulator_partitions_reported_buckets() {
        let store = multi_region_store();
        store.fail_page("bucket-13", 1);

        let (outcome, events) = run(&store, flat_catalog(&[CA, US], 0.01), &config(&[CA, US])).await;
        let outcome = outcome.unwrap();

        for region in [Region::from(CA), Region::from(US)] {
            let expected = reported_totals(&outcome, &region);
            for class in StorageClassId::ALL {
                assert_eq!(
                    outcome.totals.get(&region, class),
                    expected.get(&class).copied().unwrap_or(0),
                    "{} {}",
                    region,
                    class
                );
            }
        }

        assert!(find(&outcome, "bucket-13").is_none());
        assert_eq!(events.buckets_of_type("BucketSkipped"), vec!["bucket-13"]);
        assert_eq!(outcome.summary.buckets_skipped, 1);
        assert_eq!(outcome.buckets.len(), 29);
    }

    #[tokio::test]
    async fn test_buckets_keep_discovery_order() {
        let store = multi_region_store();
        let (outcome, _) = run(&store, flat_catalog(&[CA, US], 0.01), &config(&[US, CA])).await;
        let outcome = outcome.unwrap();

        let regions: Vec<_> = outcome.buckets.iter().map(|b| b.region.to_string()).collect();
        let mut sorted = regions.clone();
        sorted.sort();
        assert_eq!(regions, sorted);

        let ca_names: Vec<_> = outcome
            .buckets
            .iter()
            .filter(|b| b.region.as_str() == CA)
            .map(|b| b.name.clone())
            .collect();
        let mut expected = ca_names.clone();
        expected.sort();
        assert_eq!(ca_names, expected);
    }

    #[tokio::test]
    async fn test_omit_empty_excludes_empty_buckets() {
        let store = InMemoryObjectStore::new();
        store
            .add_bucket("full", Some(CA), objects(&[(StorageClassId::Standard, 10)]))
            .add_bucket("empty", Some(CA), vec![]);

        let mut cfg = config(&[CA]);
        cfg.scan.omit_empty = true;
        let (outcome, events) = run(&store, flat_catalog(&[CA], 0.02), &cfg).await;
        let outcome = outcome.unwrap();
        assert!(find(&outcome, "empty").is_none());
        assert_eq!(events.buckets_of_type("BucketDiscardedEmpty"), vec!["empty"]);

        cfg.scan.omit_empty = false;
        let (outcome, _) = run(&store, flat_catalog(&[CA], 0.02), &cfg).await;
        let outcome = outcome.unwrap();
        let empty = find(&outcome, "empty").unwrap();
        assert_eq!(empty.file_count, 0);
        assert_eq!(empty.cost, 0.0);
    }

    #[tokio::test]
    async fn test_class_and_name_filters() {
        let store = InMemoryObjectStore::new();
        store
            .add_bucket(
                "logs",
                Some(CA),
                objects(&[(StorageClassId::Standard, 10), (StorageClassId::Glacier, 20)]),
            )
            .add_bucket("other", Some(CA), objects(&[(StorageClassId::Glacier, 5)]));

        let mut cfg = config(&[CA]);
        cfg.scan.name_filter = vec!["logs".to_string()];
        cfg.scan.class_filter = vec![StorageClassId::Glacier];

        let (outcome, _) = run(&store, flat_catalog(&[CA], 0.02), &cfg).await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.buckets.len(), 1);
        let logs = &outcome.buckets[0];
        assert_eq!(logs.total_bytes, 20);
        assert_eq!(logs.bytes_by_storage_class.get(&StorageClassId::Standard), None);
        assert_eq!(outcome.totals.get(&Region::from(CA), StorageClassId::Glacier), 20);
    }

    #[tokio::test]
    async fn test_unavailable_region_and_failed_lookup_are_reported() {
        let store = InMemoryObjectStore::new();
        store
            .add_bucket("ok", Some(CA), objects(&[(StorageClassId::Standard, 10)]))
            .add_bucket("lost", Some(US), objects(&[(StorageClassId::Standard, 10)]))
            .add_bucket("hidden", Some(CA), objects(&[(StorageClassId::Standard, 10)]));
        store.fail_region(US).fail_lookup("hidden");

        let (outcome, events) = run(&store, flat_catalog(&[CA, US], 0.02), &config(&[CA, US])).await;
        let outcome = outcome.unwrap();

        let names: Vec<_> = outcome.buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["ok"]);
        assert_eq!(events.events_of_type("RegionUnavailable").len(), 1);
        assert_eq!(events.buckets_of_type("BucketLookupFailed"), vec!["hidden"]);
        assert_eq!(events.coverage_losses(), 2);
        assert_eq!(outcome.summary.regions_unavailable, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_run() {
        let store = InMemoryObjectStore::new();
        store.add_bucket("any", Some(CA), vec![]);
        store.fail_listing();

        let (outcome, _) = run(&store, flat_catalog(&[CA], 0.02), &config(&[CA])).await;
        assert!(matches!(outcome, Err(Error::Provider { .. })));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_any_call() {
        let store = InMemoryObjectStore::new();
        let mut cfg = config(&[CA]);
        cfg.scan.rate_limit = 0;

        let (outcome, _) = run(&store, flat_catalog(&[CA], 0.02), &cfg).await;
        assert!(matches!(outcome, Err(Error::Config(_))));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_remote_call_is_rate_limited() {
        let store = InMemoryObjectStore::new().with_page_size(1);
        store
            .add_bucket("a", Some(CA), objects(&[(StorageClassId::Standard, 1), (StorageClassId::Standard, 2)]))
            .add_bucket("b", Some(CA), objects(&[(StorageClassId::Standard, 3)]));

        let mut cfg = config(&[CA]);
        cfg.scan.rate_limit = 10;

        let start = tokio::time::Instant::now();
        let (outcome, _) = run(&store, flat_catalog(&[CA], 0.02), &cfg).await;
        let outcome = outcome.unwrap();

        // 1 listing + 2 lookups + 3 pages + 1 price schedule
        assert_eq!(outcome.summary.remote_calls, 7);
        assert_eq!(store.calls(), 6);
        // seven starts at 10/s span at least 0.6s
        assert!(start.elapsed() >= std::time::Duration::from_millis(600));
    }
}

// =============================================================================
// Reporting
// =============================================================================

mod report_tests {
    use super::*;
    use bucket_ledger::report::{GroupBy, OrderKey, SizeUnit, SortOrder};

    #[tokio::test]
    async fn test_report_groups_and_orders_run_output() {
        let store = InMemoryObjectStore::new();
        store
            .add_bucket("small", Some(CA), objects(&[(StorageClassId::Standard, 1024)]))
            .add_bucket("large", Some(CA), objects(&[(StorageClassId::Standard, 4096)]))
            .add_bucket("east", None, objects(&[(StorageClassId::Standard, 2048)]));

        let mut cfg = config(&[CA, US]);
        cfg.report.provider = "S3".to_string();
        cfg.report.group_by = GroupBy::Region;
        cfg.report.size_unit = SizeUnit::KiB;
        cfg.report.order = Some(SortOrder::descending(OrderKey::Size));

        let (outcome, _) = run(&store, flat_catalog(&[CA, US], 0.02), &cfg).await;
        let report = AuditRun::report(&outcome.unwrap(), &cfg.report);

        let ca: Vec<_> = report.groups[CA].iter().map(|e| (e.name.as_str(), e.size)).collect();
        assert_eq!(ca, vec![("large", 4.0), ("small", 1.0)]);
        assert_eq!(report.groups[US][0].name, "east");
        assert_eq!(report.totals.buckets, 3);
        assert_eq!(report.prices.len(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["provider"], "S3");
        assert_eq!(json["scan"]["buckets_scanned"], 3);
    }
}
