//! In-Memory Provider
//!
//! Implements the object store and pricing ports over fixtures. Used by the
//! test suites and for dry runs; failures can be injected per bucket, page,
//! lookup and region.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;

use crate::domain::ports::{
    BucketListing, BucketPage, ObjectPage, ObjectStoreClient, ObjectStoreConnector,
    ObjectSummary, PriceListPage, PricingCatalogClient,
};
use crate::domain::{Region, StorageClassId};
use crate::error::{Error, Result};
use crate::pricing::price_list::{
    OfferTerm, PriceDimension, PricePerUnit, Product, ProductAttributes, Terms,
};
use crate::pricing::{PriceListDocument, PriceSchedule};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Build an object fixture with a fixed modification time.
pub fn fixture_object(key: &str, size: u64, storage_class: StorageClassId) -> ObjectSummary {
    ObjectSummary {
        key: key.to_string(),
        size,
        storage_class,
        last_modified: fixture_time(),
    }
}

fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

// =============================================================================
// Object Store
// =============================================================================

#[derive(Debug, Clone)]
struct FixtureBucket {
    name: String,
    creation_date: DateTime<Utc>,
    location_constraint: Option<String>,
    objects: Vec<ObjectSummary>,
}

#[derive(Debug, Default)]
struct StoreState {
    buckets: Vec<FixtureBucket>,
    page_size: usize,
    bucket_page_size: usize,
    /// bucket -> zero-based page index that fails
    failing_pages: HashMap<String, usize>,
    failing_lookups: HashSet<String>,
    unavailable_regions: HashSet<Region>,
    listing_fails: bool,
}

/// Fixture-backed object store; acts as its own connector.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    state: Arc<RwLock<StoreState>>,
    calls: Arc<AtomicU64>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                page_size: DEFAULT_PAGE_SIZE,
                bucket_page_size: DEFAULT_PAGE_SIZE,
                ..StoreState::default()
            })),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Objects per listing page (minimum 1).
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.write().page_size = page_size.max(1);
        self
    }

    /// Buckets per account listing page (minimum 1).
    pub fn with_bucket_page_size(self, page_size: usize) -> Self {
        self.state.write().bucket_page_size = page_size.max(1);
        self
    }

    /// Add a bucket with a raw location constraint (`None` behaves like the
    /// provider's default region).
    pub fn add_bucket(
        &self,
        name: &str,
        location_constraint: Option<&str>,
        objects: Vec<ObjectSummary>,
    ) -> &Self {
        let creation_date = fixture_time();
        self.state.write().buckets.push(FixtureBucket {
            name: name.to_string(),
            creation_date,
            location_constraint: location_constraint.map(str::to_string),
            objects,
        });
        self
    }

    /// Make listing page `page_index` of `bucket` fail.
    pub fn fail_page(&self, bucket: &str, page_index: usize) -> &Self {
        self.state
            .write()
            .failing_pages
            .insert(bucket.to_string(), page_index);
        self
    }

    /// Make the region lookup of `bucket` fail.
    pub fn fail_lookup(&self, bucket: &str) -> &Self {
        self.state.write().failing_lookups.insert(bucket.to_string());
        self
    }

    /// Make client creation for `region` fail.
    pub fn fail_region(&self, region: &str) -> &Self {
        self.state
            .write()
            .unavailable_regions
            .insert(Region::from(region));
        self
    }

    /// Make the account-wide bucket listing fail.
    pub fn fail_listing(&self) -> &Self {
        self.state.write().listing_fails = true;
        self
    }

    /// Remote calls served so far, client creation excluded.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// A client bound to `region`, bypassing failure injection.
    pub fn client(&self, region: &Region) -> InMemoryRegionClient {
        InMemoryRegionClient {
            store: self.clone(),
            region: region.clone(),
        }
    }
}

#[async_trait]
impl ObjectStoreConnector for InMemoryObjectStore {
    async fn connect(&self, region: &Region) -> Result<Arc<dyn ObjectStoreClient>> {
        if self.state.read().unavailable_regions.contains(region) {
            return Err(Error::RegionUnavailable {
                region: region.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(Arc::new(self.client(region)))
    }
}

/// Region-scoped view of an [`InMemoryObjectStore`].
#[derive(Debug, Clone)]
pub struct InMemoryRegionClient {
    store: InMemoryObjectStore,
    region: Region,
}

#[async_trait]
impl ObjectStoreClient for InMemoryRegionClient {
    fn region(&self) -> &Region {
        &self.region
    }

    async fn list_buckets_page(&self, cursor: Option<&str>) -> Result<BucketPage> {
        self.store.calls.fetch_add(1, Ordering::Relaxed);
        let state = self.store.state.read();
        if state.listing_fails {
            return Err(Error::provider("ListBuckets", "injected failure"));
        }

        let offset = parse_offset("ListBuckets", cursor)?;
        let end = (offset + state.bucket_page_size).min(state.buckets.len());
        let buckets = state
            .buckets
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|b| BucketListing {
                name: b.name.clone(),
                creation_date: b.creation_date,
            })
            .collect();

        Ok(BucketPage {
            buckets,
            next_cursor: (end < state.buckets.len()).then(|| end.to_string()),
        })
    }

    async fn resolve_bucket_region(&self, bucket: &str) -> Result<Region> {
        self.store.calls.fetch_add(1, Ordering::Relaxed);
        let state = self.store.state.read();
        if state.failing_lookups.contains(bucket) {
            return Err(Error::provider("GetBucketLocation", "injected failure"));
        }
        state
            .buckets
            .iter()
            .find(|b| b.name == bucket)
            .map(|b| Region::from_location_constraint(b.location_constraint.as_deref()))
            .ok_or_else(|| Error::provider("GetBucketLocation", format!("NoSuchBucket: {}", bucket)))
    }

    async fn list_objects_page(&self, bucket: &str, cursor: Option<&str>) -> Result<ObjectPage> {
        self.store.calls.fetch_add(1, Ordering::Relaxed);
        let state = self.store.state.read();

        let fixture = state
            .buckets
            .iter()
            .find(|b| b.name == bucket)
            .ok_or_else(|| Error::provider("ListObjectsV2", format!("NoSuchBucket: {}", bucket)))?;

        let location = Region::from_location_constraint(fixture.location_constraint.as_deref());
        if location != self.region {
            return Err(Error::provider(
                "ListObjectsV2",
                format!("PermanentRedirect: bucket is in {}", location),
            ));
        }

        let offset = parse_offset("ListObjectsV2", cursor)?;

        if state.failing_pages.get(bucket) == Some(&(offset / state.page_size)) {
            return Err(Error::provider("ListObjectsV2", "injected failure"));
        }

        let end = (offset + state.page_size).min(fixture.objects.len());
        let objects = fixture.objects.get(offset..end).unwrap_or_default().to_vec();
        let next_cursor = (end < fixture.objects.len()).then(|| end.to_string());

        Ok(ObjectPage {
            objects,
            next_cursor,
        })
    }
}

fn parse_offset(operation: &str, cursor: Option<&str>) -> Result<usize> {
    match cursor {
        None => Ok(0),
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| Error::provider(operation, "invalid continuation token")),
    }
}

// =============================================================================
// Price Catalog
// =============================================================================

/// Fixture-backed price catalog.
///
/// Each known (region, class) is served as two price list documents, a tag
/// storage product followed by the storage product itself, so lookups go
/// through the same decoding and selection as a real catalog.
#[derive(Debug)]
pub struct InMemoryPriceCatalog {
    schedules: RwLock<HashMap<(Region, StorageClassId), PriceSchedule>>,
    page_size: usize,
    calls: AtomicU64,
}

impl Default for InMemoryPriceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPriceCatalog {
    pub fn new() -> Self {
        Self {
            schedules: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_schedule(
        self,
        region: &str,
        storage_class: StorageClassId,
        schedule: PriceSchedule,
    ) -> Self {
        self.schedules
            .write()
            .insert((Region::from(region), storage_class), schedule);
        self
    }

    /// Documents per price list page (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Page requests served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PricingCatalogClient for InMemoryPriceCatalog {
    async fn price_list_page(
        &self,
        region: &Region,
        storage_class: StorageClassId,
        token: Option<&str>,
    ) -> Result<PriceListPage> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let gap = || Error::PricingGap {
            region: region.to_string(),
            storage_class: storage_class.to_string(),
        };
        let volume_type = storage_class.pricing_sku().ok_or_else(gap)?;
        let schedule = self
            .schedules
            .read()
            .get(&(region.clone(), storage_class))
            .cloned()
            .ok_or_else(gap)?;

        let documents = [
            price_document(region, volume_type, "TagStorage-TagHrs", &[]),
            price_document(region, volume_type, "TimedStorage-ByteHrs", schedule.bands()),
        ];
        let offset = parse_offset("GetProducts", token)?;
        let end = (offset + self.page_size).min(documents.len());

        Ok(PriceListPage {
            documents: documents.get(offset..end).unwrap_or_default().to_vec(),
            next_token: (end < documents.len()).then(|| end.to_string()),
        })
    }
}

/// A storage product document the way the provider encodes it.
fn price_document(
    region: &Region,
    volume_type: &str,
    usagetype: &str,
    bands: &[crate::pricing::PriceBand],
) -> PriceListDocument {
    let sku = format!("{}-{}", region, volume_type).to_uppercase();
    let price_dimensions = bands
        .iter()
        .enumerate()
        .map(|(i, band)| {
            let dimension = PriceDimension {
                begin_range: band.begin_range.to_string(),
                end_range: band
                    .end_range
                    .map_or_else(|| "Inf".to_string(), |end| end.to_string()),
                price_per_unit: PricePerUnit {
                    usd: band.unit_price.to_string(),
                },
                unit: "GB-Mo".to_string(),
            };
            (format!("{}.{}", sku, i), dimension)
        })
        .collect();

    PriceListDocument {
        product: Product {
            product_family: "Storage".to_string(),
            sku: sku.clone(),
            attributes: ProductAttributes {
                operation: String::new(),
                usagetype: usagetype.to_string(),
                volume_type: volume_type.to_string(),
                region_code: region.to_string(),
            },
        },
        terms: Terms {
            on_demand: [(sku, OfferTerm { price_dimensions })].into_iter().collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn store() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new().with_page_size(2);
        store.add_bucket(
            "photos",
            Some("ca-central-1"),
            (0..5)
                .map(|i| fixture_object(&format!("k{}", i), 10, StorageClassId::Standard))
                .collect(),
        );
        store.add_bucket("legacy", Some("EU"), vec![]);
        store.add_bucket("virginia", None, vec![]);
        store
    }

    #[tokio::test]
    async fn test_location_constraints_are_normalized() {
        let client = store().client(&Region::from("ca-central-1"));

        assert_eq!(client.resolve_bucket_region("legacy").await.unwrap().as_str(), "eu-west-1");
        assert_eq!(client.resolve_bucket_region("virginia").await.unwrap().as_str(), "us-east-1");
        assert!(client.resolve_bucket_region("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_pagination_walks_every_object() {
        let client = store().client(&Region::from("ca-central-1"));

        let mut cursor = None;
        let mut seen = 0;
        let mut pages = 0;
        loop {
            let page = client.list_objects_page("photos", cursor.as_deref()).await.unwrap();
            seen += page.objects.len();
            pages += 1;
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(seen, 5);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn test_listing_from_wrong_region_fails() {
        let client = store().client(&Region::from("us-east-1"));
        assert_matches!(
            client.list_objects_page("photos", None).await,
            Err(Error::Provider { .. })
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = store();
        store.fail_page("photos", 1).fail_region("eu-west-1");
        let client = store.client(&Region::from("ca-central-1"));

        assert!(client.list_objects_page("photos", None).await.is_ok());
        assert!(client.list_objects_page("photos", Some("2")).await.is_err());
        assert_matches!(
            store.connect(&Region::from("eu-west-1")).await.err(),
            Some(Error::RegionUnavailable { .. })
        );
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_price_catalog_reports_gaps() {
        let catalog = InMemoryPriceCatalog::new().with_schedule(
            "ca-central-1",
            StorageClassId::Standard,
            PriceSchedule::flat(0.025).unwrap(),
        );
        let region = Region::from("ca-central-1");

        assert!(catalog.price_schedule(&region, StorageClassId::Standard).await.is_ok());
        assert_matches!(
            catalog.price_schedule(&region, StorageClassId::Glacier).await,
            Err(Error::PricingGap { .. })
        );
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_price_list_walks_every_page() {
        let schedule = PriceSchedule::new(vec![
            crate::pricing::PriceBand::new(0.0, Some(51200.0), 0.025),
            crate::pricing::PriceBand::new(51200.0, None, 0.024),
        ])
        .unwrap();
        let catalog = InMemoryPriceCatalog::new()
            .with_page_size(1)
            .with_schedule("ca-central-1", StorageClassId::Standard, schedule.clone());

        let fetched = catalog
            .price_schedule(&Region::from("ca-central-1"), StorageClassId::Standard)
            .await
            .unwrap();

        assert_eq!(fetched, schedule);
        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_bucket_listing_is_paged() {
        let store = store().with_bucket_page_size(2);
        let client = store.client(&Region::from("ca-central-1"));

        let first = client.list_buckets_page(None).await.unwrap();
        assert_eq!(first.buckets.len(), 2);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let names: Vec<_> = client
            .list_buckets()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["photos", "legacy", "virginia"]);
        assert_eq!(store.calls(), 3);
    }
}
