//! Domain Layer
//!
//! Value objects, ports and events shared by every stage of an audit run.
//!
//! - **Model** (`model.rs`) - Regions, storage classes, bucket records
//! - **Ports** (`ports.rs`) - Trait abstractions for the storage provider
//! - **Events** (`events.rs`) - Scan events for coverage reporting
//!
//! # Usage
//!
//! ```ignore
//! use bucket_ledger::domain::{ObjectStoreClient, Region};
//!
//! async fn bucket_count<C: ObjectStoreClient>(client: &C) -> Result<usize> {
//!     Ok(client.list_buckets().await?.len())
//! }
//! ```

pub mod events;
pub mod model;
pub mod ports;

pub use events::ScanEvent;
pub use model::{
    bytes_to_gb, BucketRecord, ClassBytes, Region, StorageClassId, StorageContainer,
    BYTES_PER_GB, DEFAULT_REGION,
};
pub use ports::{
    BucketListing, BucketPage, EventPublisher, ObjectPage, ObjectStoreClient,
    ObjectStoreConnector, ObjectSummary, PriceListPage, PricingCatalogClient, ReportSink,
};
