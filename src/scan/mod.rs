//! Scan Engine
//!
//! Discovery, the region fan-out and the per-bucket scanners, plus the two
//! pieces of state every remote call and every scanner shares: the rate
//! limiter and the storage accumulator.
//!
//! ```text
//! BucketDiscovery ──► region-sorted buckets
//!                          │
//!                          ▼
//! RegionScanCoordinator ──► one task per region
//!                          │   Semaphore(threading)
//!                          ▼
//!                    BucketScanner ──► StorageAccumulator (per-region lock)
//!                          │
//!                          ▼
//!                    mpsc::channel ──► join barrier ──► pricing
//! ```

pub mod accumulator;
pub mod coordinator;
pub mod discovery;
pub mod limiter;
pub mod scanner;
pub mod stats;

pub use accumulator::{StorageAccumulator, StorageTotals};
pub use coordinator::{claim_region, RegionScanCoordinator};
pub use discovery::{BucketDiscovery, DEFAULT_LOOKUP_CONCURRENCY};
pub use limiter::RateLimiter;
pub use scanner::{BucketScanner, ScanOutcome, ScanPolicy};
pub use stats::{ScanStats, ScanSummary};
