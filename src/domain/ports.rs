//! Domain Ports (Port/Adapter Pattern)
//!
//! Capabilities the audit core consumes from a storage provider, and the
//! ones it hands its results to. Adapters implement these traits; the core
//! never sees a provider SDK type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audit Core                              │
//! │  Discovery │ Scanner │ Coordinator │ Catalog │ Allocator     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Ports (Traits)                          │
//! │  ObjectStoreClient │ ObjectStoreConnector │                  │
//! │  PricingCatalogClient │ ReportSink │ EventPublisher          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Adapters (Impls)                           │
//! │  AwsS3Store │ AwsPriceCatalog │ InMemoryObjectStore │ Json   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::ScanEvent;
use super::model::{Region, StorageClassId};
use crate::error::{Error, Result};
use crate::pricing::{select_storage_schedule, PriceListDocument, PriceSchedule};
use crate::report::Report;

// =============================================================================
// Listing Value Objects
// =============================================================================

/// A bucket as returned by the account-wide bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketListing {
    pub name: String,
    pub creation_date: DateTime<Utc>,
}

/// One page of the account-wide bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketPage {
    pub buckets: Vec<BucketListing>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub storage_class: StorageClassId,
    pub last_modified: DateTime<Utc>,
}

/// One page of price list documents.
#[derive(Debug, Clone, Default)]
pub struct PriceListPage {
    pub documents: Vec<PriceListDocument>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

/// One page of an object listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

// =============================================================================
// Object Store Port
// =============================================================================

/// Port for the object storage provider.
///
/// A client is bound to one region. Object listing is region-scoped by
/// provider contract, so a client must only list buckets located in
/// [`ObjectStoreClient::region`].
///
/// Every required method maps to exactly one remote request.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Region this client is configured for.
    fn region(&self) -> &Region;

    /// Fetch one page of the account-wide bucket listing.
    async fn list_buckets_page(&self, cursor: Option<&str>) -> Result<BucketPage>;

    /// List every bucket visible to the account, one page request at a time.
    async fn list_buckets(&self) -> Result<Vec<BucketListing>> {
        let mut buckets = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_buckets_page(cursor.as_deref()).await?;
            buckets.extend(page.buckets);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(buckets),
            }
        }
    }

    /// Resolve the region a bucket physically lives in.
    ///
    /// Implementations normalize empty and legacy location constraints
    /// (see [`Region::from_location_constraint`]).
    async fn resolve_bucket_region(&self, bucket: &str) -> Result<Region>;

    /// Fetch one page of the object listing of `bucket`.
    ///
    /// `cursor` is `None` for the first page and the previous page's
    /// `next_cursor` afterwards.
    async fn list_objects_page(&self, bucket: &str, cursor: Option<&str>) -> Result<ObjectPage>;
}

/// Port for creating region-scoped object store clients.
#[async_trait]
pub trait ObjectStoreConnector: Send + Sync {
    async fn connect(&self, region: &Region) -> Result<Arc<dyn ObjectStoreClient>>;
}

// =============================================================================
// Pricing Port
// =============================================================================

/// Port for the provider's price catalog.
///
/// The class to SKU mapping is static ([`StorageClassId::pricing_sku`]); the
/// catalog only answers for the SKU it is asked about. As with the object
/// store, the required method is one remote request.
#[async_trait]
pub trait PricingCatalogClient: Send + Sync {
    /// Fetch one page of price list documents for a class in a region.
    async fn price_list_page(
        &self,
        region: &Region,
        storage_class: StorageClassId,
        token: Option<&str>,
    ) -> Result<PriceListPage>;

    /// Walk every price list page and build the storage schedule.
    async fn price_schedule(
        &self,
        region: &Region,
        storage_class: StorageClassId,
    ) -> Result<PriceSchedule> {
        if storage_class.pricing_sku().is_none() {
            return Err(Error::PricingGap {
                region: region.to_string(),
                storage_class: storage_class.to_string(),
            });
        }

        let mut documents = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .price_list_page(region, storage_class, token.as_deref())
                .await?;
            documents.extend(page.documents);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        select_storage_schedule(&documents, storage_class)
    }
}

// =============================================================================
// Output Port
// =============================================================================

/// Port for handing over the finished report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn emit(&self, report: &Report) -> Result<()>;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Port for publishing scan events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a scan event.
    async fn publish(&self, event: ScanEvent) -> Result<()>;
}
