//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │  ObjectStoreClient │ PricingCatalogClient │ ReportSink     │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ AwsConnector │ AwsPriceCatalog │ InMemoryObjectStore      │ │
//! │  │ RateLimitedStore │ JsonReportSink │ LoggingEventPublisher │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bucket_ledger::adapters::{AwsConnector, RateLimitedConnector};
//! use bucket_ledger::domain::ports::ObjectStoreConnector;
//!
//! let connector = RateLimitedConnector::new(Arc::new(AwsConnector::from_env().await), limiter);
//! let client = connector.connect(&Region::from("ca-central-1")).await?;
//! let buckets = client.list_buckets().await?;
//! ```

#[cfg(feature = "aws")]
pub mod aws;
pub mod memory;

mod event_publisher;
mod json_sink;
mod rate_limited;

#[cfg(feature = "aws")]
pub use aws::{AwsConnector, AwsPriceCatalog, AwsS3Store};
pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
pub use json_sink::JsonReportSink;
pub use memory::{InMemoryObjectStore, InMemoryPriceCatalog};
pub use rate_limited::{RateLimitedCatalog, RateLimitedConnector, RateLimitedStore};
