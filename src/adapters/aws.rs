//! AWS Adapter
//!
//! S3 and Price List API implementations of the provider ports. Credentials
//! and defaults come from the standard AWS configuration chain; each region
//! gets its own S3 client built from the shared base configuration.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_pricing::types::{Filter, FilterType};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::domain::ports::{
    BucketListing, BucketPage, ObjectPage, ObjectStoreClient, ObjectStoreConnector,
    ObjectSummary, PriceListPage, PricingCatalogClient,
};
use crate::domain::{Region, StorageClassId};
use crate::error::{Error, Result};
use crate::pricing::PriceListDocument;

/// Display label for reports produced from this provider.
pub const PROVIDER_LABEL: &str = "S3";

/// Region hosting the Price List API endpoint.
const PRICING_REGION: &str = "us-east-1";
const S3_SERVICE_CODE: &str = "AmazonS3";

/// Load the shared SDK configuration from the environment.
pub async fn load_sdk_config() -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest()).load().await
}

fn to_utc(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

// =============================================================================
// S3
// =============================================================================

/// Builds region-scoped S3 clients.
#[derive(Debug, Clone)]
pub struct AwsConnector {
    sdk_config: SdkConfig,
}

impl AwsConnector {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }

    pub async fn from_env() -> Self {
        Self::new(load_sdk_config().await)
    }

    fn client_for(&self, region: &Region) -> aws_sdk_s3::Client {
        let config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }
}

#[async_trait]
impl ObjectStoreConnector for AwsConnector {
    async fn connect(&self, region: &Region) -> Result<Arc<dyn ObjectStoreClient>> {
        debug!(region = %region, "Creating S3 client");
        Ok(Arc::new(AwsS3Store {
            client: self.client_for(region),
            region: region.clone(),
        }))
    }
}

/// S3 client bound to one region.
#[derive(Debug, Clone)]
pub struct AwsS3Store {
    client: aws_sdk_s3::Client,
    region: Region,
}

#[async_trait]
impl ObjectStoreClient for AwsS3Store {
    fn region(&self) -> &Region {
        &self.region
    }

    async fn list_buckets_page(&self, cursor: Option<&str>) -> Result<BucketPage> {
        let mut req = self.client.list_buckets();
        if let Some(token) = cursor {
            req = req.continuation_token(token);
        }

        let resp = req.send().await.map_err(|e| {
            Error::provider("ListBuckets", aws_sdk_s3::error::DisplayErrorContext(&e))
        })?;

        let buckets = resp
            .buckets()
            .iter()
            .filter_map(|bucket| {
                let name = bucket.name()?;
                let creation_date = bucket
                    .creation_date()
                    .and_then(to_utc)
                    .unwrap_or(DateTime::UNIX_EPOCH);
                Some(BucketListing {
                    name: name.to_string(),
                    creation_date,
                })
            })
            .collect();

        let next_cursor = resp
            .continuation_token()
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Ok(BucketPage {
            buckets,
            next_cursor,
        })
    }

    #[instrument(skip(self))]
    async fn resolve_bucket_region(&self, bucket: &str) -> Result<Region> {
        let resp = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                Error::provider("GetBucketLocation", aws_sdk_s3::error::DisplayErrorContext(&e))
            })?;

        Ok(Region::from_location_constraint(
            resp.location_constraint().map(|c| c.as_str()),
        ))
    }

    async fn list_objects_page(&self, bucket: &str, cursor: Option<&str>) -> Result<ObjectPage> {
        let mut req = self.client.list_objects_v2().bucket(bucket);
        if let Some(token) = cursor {
            req = req.continuation_token(token);
        }

        let resp = req.send().await.map_err(|e| {
            Error::provider("ListObjectsV2", aws_sdk_s3::error::DisplayErrorContext(&e))
        })?;

        let objects = resp
            .contents()
            .iter()
            .map(|obj| ObjectSummary {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                storage_class: StorageClassId::from_object_class(
                    obj.storage_class().map(|c| c.as_str()),
                ),
                last_modified: obj
                    .last_modified()
                    .and_then(to_utc)
                    .unwrap_or(DateTime::UNIX_EPOCH),
            })
            .collect();

        let next_cursor = match (resp.is_truncated(), resp.next_continuation_token()) {
            (Some(true), Some(token)) if !token.is_empty() => Some(token.to_string()),
            _ => None,
        };

        Ok(ObjectPage {
            objects,
            next_cursor,
        })
    }
}

// =============================================================================
// Price List API
// =============================================================================

/// Price catalog backed by the AWS Price List query API.
#[derive(Debug, Clone)]
pub struct AwsPriceCatalog {
    client: aws_sdk_pricing::Client,
}

impl AwsPriceCatalog {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_pricing::config::Builder::from(sdk_config)
            .region(aws_sdk_pricing::config::Region::new(PRICING_REGION))
            .build();
        Self {
            client: aws_sdk_pricing::Client::from_conf(config),
        }
    }
}

fn term_filter(field: &str, value: &str) -> Result<Filter> {
    Filter::builder()
        .r#type(FilterType::TermMatch)
        .field(field)
        .value(value)
        .build()
        .map_err(|e| Error::Internal(format!("invalid pricing filter: {}", e)))
}

#[async_trait]
impl PricingCatalogClient for AwsPriceCatalog {
    #[instrument(skip(self), fields(region = %region, storage_class = %storage_class))]
    async fn price_list_page(
        &self,
        region: &Region,
        storage_class: StorageClassId,
        token: Option<&str>,
    ) -> Result<PriceListPage> {
        let volume_type = storage_class.pricing_sku().ok_or_else(|| Error::PricingGap {
            region: region.to_string(),
            storage_class: storage_class.to_string(),
        })?;

        let mut req = self
            .client
            .get_products()
            .service_code(S3_SERVICE_CODE)
            .filters(term_filter("regionCode", region.as_str())?)
            .filters(term_filter("productFamily", "Storage")?)
            .filters(term_filter("volumeType", volume_type)?);
        if let Some(token) = token {
            req = req.next_token(token);
        }

        let resp = req.send().await.map_err(|e| {
            Error::provider("GetProducts", aws_sdk_pricing::error::DisplayErrorContext(&e))
        })?;

        let documents = resp
            .price_list()
            .iter()
            .map(|raw| PriceListDocument::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        debug!(documents = documents.len(), "Price list page fetched");

        Ok(PriceListPage {
            documents,
            next_token: resp
                .next_token()
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }
}
