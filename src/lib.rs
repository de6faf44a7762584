//! Bucket Ledger - Multi-Region Object Storage Cost Auditor
//!
//! Discovers buckets across regions, measures each bucket's usage per
//! storage class, prices the regional totals against tiered rate schedules
//! and attributes a cost back to every bucket.
//!
//! # Architecture
//!
//! ```text
//! Discovery → Region fan-out scan → join barrier → Pricing → Allocation → Report
//! ```
//!
//! Every remote call, across all regions and workers, passes through one
//! rate limiter. Scanners in the same region share one accumulator lock;
//! pricing only ever sees the totals after every scanner has finished.
//!
//! # Modules
//!
//! - [`adapters`] - Provider, sink and event publisher implementations
//! - [`audit`] - Run configuration and the audit entrypoint
//! - [`domain`] - Domain model, ports and scan events
//! - [`error`] - Error types
//! - [`pricing`] - Tiered schedules, price catalog and cost allocation
//! - [`report`] - Ordering, grouping and unit conversion
//! - [`scan`] - Rate limiter, discovery, coordinator and scanners

pub mod adapters;
pub mod audit;
pub mod domain;
pub mod error;
pub mod pricing;
pub mod report;
pub mod scan;

// Re-export commonly used types
pub use audit::{AuditConfig, AuditOutcome, AuditRun, ScanConfig};
pub use domain::{BucketRecord, Region, StorageClassId};
pub use error::{Error, Result};
pub use report::{Report, ReportOptions};
