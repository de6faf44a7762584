//! Rate-Limited Decorators
//!
//! Wrap provider clients so every remote call takes a token from the shared
//! [`RateLimiter`] immediately before it is issued. Only the single-request
//! port methods are wrapped; multi-page walks use the ports' provided
//! methods, which call back into the wrapped page methods once per page.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    BucketPage, ObjectPage, ObjectStoreClient, ObjectStoreConnector, PriceListPage,
    PricingCatalogClient,
};
use crate::domain::{Region, StorageClassId};
use crate::error::Result;
use crate::scan::RateLimiter;

/// Object store client that throttles every call.
pub struct RateLimitedStore {
    inner: Arc<dyn ObjectStoreClient>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedStore {
    pub fn new(inner: Arc<dyn ObjectStoreClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl ObjectStoreClient for RateLimitedStore {
    fn region(&self) -> &Region {
        self.inner.region()
    }

    async fn list_buckets_page(&self, cursor: Option<&str>) -> Result<BucketPage> {
        self.limiter.take().await;
        self.inner.list_buckets_page(cursor).await
    }

    async fn resolve_bucket_region(&self, bucket: &str) -> Result<Region> {
        self.limiter.take().await;
        self.inner.resolve_bucket_region(bucket).await
    }

    async fn list_objects_page(&self, bucket: &str, cursor: Option<&str>) -> Result<ObjectPage> {
        self.limiter.take().await;
        self.inner.list_objects_page(bucket, cursor).await
    }
}

/// Connector whose clients are all throttled by the same limiter.
pub struct RateLimitedConnector {
    inner: Arc<dyn ObjectStoreConnector>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedConnector {
    pub fn new(inner: Arc<dyn ObjectStoreConnector>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl ObjectStoreConnector for RateLimitedConnector {
    async fn connect(&self, region: &Region) -> Result<Arc<dyn ObjectStoreClient>> {
        let client = self.inner.connect(region).await?;
        Ok(Arc::new(RateLimitedStore::new(client, self.limiter.clone())))
    }
}

/// Price catalog client that throttles every call.
pub struct RateLimitedCatalog {
    inner: Arc<dyn PricingCatalogClient>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedCatalog {
    pub fn new(inner: Arc<dyn PricingCatalogClient>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl PricingCatalogClient for RateLimitedCatalog {
    async fn price_list_page(
        &self,
        region: &Region,
        storage_class: StorageClassId,
        token: Option<&str>,
    ) -> Result<PriceListPage> {
        self.limiter.take().await;
        self.inner.price_list_page(region, storage_class, token).await
    }
}
