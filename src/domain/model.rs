//! Domain Model
//!
//! Value objects shared by discovery, scanning, pricing and reporting.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Region the provider treats as the home of buckets without a location constraint.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Bytes in one GB as the pricing catalog counts them.
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a byte count to billing GB.
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

// =============================================================================
// Region
// =============================================================================

/// Provider region code (value object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Normalize a bucket location constraint into a region code.
    ///
    /// An empty or absent constraint means the default region; `EU` is the
    /// legacy spelling of `eu-west-1`.
    pub fn from_location_constraint(constraint: Option<&str>) -> Self {
        match constraint.map(str::trim) {
            None | Some("") => Self::new(DEFAULT_REGION),
            Some("EU") => Self::new("eu-west-1"),
            Some(code) => Self::new(code),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Region {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Region {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Storage Classes
// =============================================================================

/// Storage class of an object, as reported by the provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum StorageClassId {
    #[serde(rename = "STANDARD")]
    Standard,
    #[serde(rename = "REDUCED_REDUNDANCY")]
    ReducedRedundancy,
    #[serde(rename = "GLACIER")]
    Glacier,
    #[serde(rename = "STANDARD_IA")]
    StandardIa,
    #[serde(rename = "ONEZONE_IA")]
    OnezoneIa,
    #[serde(rename = "INTELLIGENT_TIERING")]
    IntelligentTiering,
    #[serde(rename = "DEEP_ARCHIVE")]
    DeepArchive,
    #[serde(rename = "GLACIER_IR")]
    GlacierIr,
    #[serde(rename = "OUTPOSTS")]
    Outposts,
    #[serde(rename = "SNOW")]
    Snow,
    #[serde(rename = "EXPRESS_ONEZONE")]
    ExpressOnezone,
}

impl StorageClassId {
    /// Every known storage class.
    pub const ALL: [StorageClassId; 11] = [
        StorageClassId::Standard,
        StorageClassId::ReducedRedundancy,
        StorageClassId::Glacier,
        StorageClassId::StandardIa,
        StorageClassId::OnezoneIa,
        StorageClassId::IntelligentTiering,
        StorageClassId::DeepArchive,
        StorageClassId::GlacierIr,
        StorageClassId::Outposts,
        StorageClassId::Snow,
        StorageClassId::ExpressOnezone,
    ];

    /// Wire code used by the object listing API.
    pub fn code(&self) -> &'static str {
        match self {
            StorageClassId::Standard => "STANDARD",
            StorageClassId::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClassId::Glacier => "GLACIER",
            StorageClassId::StandardIa => "STANDARD_IA",
            StorageClassId::OnezoneIa => "ONEZONE_IA",
            StorageClassId::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClassId::DeepArchive => "DEEP_ARCHIVE",
            StorageClassId::GlacierIr => "GLACIER_IR",
            StorageClassId::Outposts => "OUTPOSTS",
            StorageClassId::Snow => "SNOW",
            StorageClassId::ExpressOnezone => "EXPRESS_ONEZONE",
        }
    }

    /// Pricing catalog volume type for this class, if the catalog prices it.
    pub fn pricing_sku(&self) -> Option<&'static str> {
        match self {
            StorageClassId::Standard => Some("Standard"),
            StorageClassId::ReducedRedundancy => Some("Reduced Redundancy"),
            StorageClassId::Glacier => Some("Amazon Glacier"),
            StorageClassId::StandardIa => Some("Standard - Infrequent Access"),
            StorageClassId::OnezoneIa => Some("One Zone - Infrequent Access"),
            StorageClassId::IntelligentTiering => Some("Intelligent-Tiering Frequent Access"),
            StorageClassId::DeepArchive => Some("Glacier Deep Archive"),
            StorageClassId::GlacierIr => Some("Glacier Instant Retrieval"),
            StorageClassId::ExpressOnezone => Some("S3 Express One Zone"),
            StorageClassId::Outposts | StorageClassId::Snow => None,
        }
    }

    /// Reverse lookup from a pricing catalog volume type.
    pub fn from_pricing_sku(sku: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.pricing_sku() == Some(sku))
    }

    /// Map the class reported on a listed object.
    ///
    /// Objects without a class are `STANDARD`; unknown codes are billed as
    /// `STANDARD` too.
    pub fn from_object_class(code: Option<&str>) -> Self {
        match code {
            None | Some("") => StorageClassId::Standard,
            Some(code) => code.parse().unwrap_or_else(|_| {
                tracing::debug!(storage_class = code, "Unknown storage class, billing as STANDARD");
                StorageClassId::Standard
            }),
        }
    }
}

impl std::fmt::Display for StorageClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StorageClassId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|class| class.code() == upper)
            .ok_or_else(|| Error::Config(format!("unknown storage class: {}", s)))
    }
}

// =============================================================================
// Bucket Record
// =============================================================================

/// Bytes per storage class.
pub type ClassBytes = BTreeMap<StorageClassId, u64>;

/// A bucket and everything measured about it during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub name: String,
    pub region: Region,
    pub creation_date: DateTime<Utc>,
    pub file_count: u64,
    pub total_bytes: u64,
    pub bytes_by_storage_class: ClassBytes,
    pub last_modified: Option<DateTime<Utc>>,
    pub cost: f64,
}

impl BucketRecord {
    /// Record with identity fields only, as produced by discovery.
    pub fn discovered(
        name: impl Into<String>,
        region: Region,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            region,
            creation_date,
            file_count: 0,
            total_bytes: 0,
            bytes_by_storage_class: ClassBytes::new(),
            last_modified: None,
            cost: 0.0,
        }
    }

    /// Count one object against this bucket.
    pub fn record_object(&mut self, class: StorageClassId, size: u64, last_modified: DateTime<Utc>) {
        self.file_count += 1;
        self.total_bytes += size;
        *self.bytes_by_storage_class.entry(class).or_insert(0) += size;
        if self.last_modified.map_or(true, |seen| seen < last_modified) {
            self.last_modified = Some(last_modified);
        }
    }

    /// Drop every measured value, keeping identity.
    pub fn reset_measurements(&mut self) {
        self.file_count = 0;
        self.total_bytes = 0;
        self.bytes_by_storage_class.clear();
        self.last_modified = None;
    }

    /// No objects and no bytes in any class.
    pub fn is_empty(&self) -> bool {
        self.file_count == 0 && self.bytes_by_storage_class.values().all(|b| *b == 0)
    }
}

/// Read view over a priced storage container.
///
/// Reporting only goes through this trait so another provider's container
/// type can be reported without touching the assembler.
pub trait StorageContainer {
    fn name(&self) -> &str;
    fn region(&self) -> &Region;
    fn creation_date(&self) -> DateTime<Utc>;
    fn file_count(&self) -> u64;
    fn total_bytes(&self) -> u64;
    fn bytes_by_storage_class(&self) -> &ClassBytes;
    fn last_modified(&self) -> Option<DateTime<Utc>>;
    fn cost(&self) -> f64;
}

impl StorageContainer for BucketRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &Region {
        &self.region
    }

    fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    fn file_count(&self) -> u64 {
        self.file_count
    }

    fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn bytes_by_storage_class(&self) -> &ClassBytes {
        &self.bytes_by_storage_class
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    fn cost(&self) -> f64 {
        self.cost
    }
}
