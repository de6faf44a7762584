//! Report Assembler
//!
//! Orders, groups and unit-converts priced containers into the final report.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{StorageClassId, StorageContainer};
use crate::error::{Error, Result};
use crate::pricing::ClassPrice;
use crate::scan::ScanSummary;

/// Group key used when results are not grouped by region.
pub const GLOBAL_GROUP: &str = "Global";

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKey {
    Name,
    Size,
    Cost,
}

impl FromStr for OrderKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(OrderKey::Name),
            "size" => Ok(OrderKey::Size),
            "cost" | "price" => Ok(OrderKey::Cost),
            other => Err(Error::Config(format!(
                "unsupported order key '{}' (expected name, size or cost)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: OrderKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn ascending(key: OrderKey) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: OrderKey) -> Self {
        Self {
            key,
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Global,
    Region,
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "global" | "none" => Ok(GroupBy::Global),
            "region" => Ok(GroupBy::Region),
            other => Err(Error::Config(format!(
                "unsupported grouping '{}' (expected region or global)",
                other
            ))),
        }
    }
}

/// Power-of-1024 unit applied to every size field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeUnit {
    #[default]
    #[serde(rename = "B")]
    Bytes,
    KiB,
    MiB,
    GiB,
    TiB,
    PiB,
}

impl SizeUnit {
    pub fn exponent(&self) -> i32 {
        match self {
            SizeUnit::Bytes => 0,
            SizeUnit::KiB => 1,
            SizeUnit::MiB => 2,
            SizeUnit::GiB => 3,
            SizeUnit::TiB => 4,
            SizeUnit::PiB => 5,
        }
    }

    pub fn convert(&self, bytes: u64) -> f64 {
        bytes as f64 / 1024f64.powi(self.exponent())
    }
}

impl FromStr for SizeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "by" | "b" | "bytes" => Ok(SizeUnit::Bytes),
            "kb" | "kib" => Ok(SizeUnit::KiB),
            "mb" | "mib" => Ok(SizeUnit::MiB),
            "gb" | "gib" => Ok(SizeUnit::GiB),
            "tb" | "tib" => Ok(SizeUnit::TiB),
            "pb" | "pib" => Ok(SizeUnit::PiB),
            other => Err(Error::Config(format!(
                "unsupported display size '{}' (expected by, kb, mb, gb, tb or pb)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// `None` keeps discovery order
    pub order: Option<SortOrder>,
    pub group_by: GroupBy,
    pub size_unit: SizeUnit,
    /// Top-level provider label
    pub provider: String,
}

impl ReportOptions {
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// One bucket as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,
    pub region: String,
    pub creation_date: DateTime<Utc>,
    pub file_count: u64,
    pub size: f64,
    pub size_by_storage_class: BTreeMap<StorageClassId, f64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub buckets: usize,
    pub file_count: u64,
    pub size: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub provider: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub size_unit: SizeUnit,
    pub groups: BTreeMap<String, Vec<ReportEntry>>,
    pub totals: ReportTotals,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<ClassPrice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSummary>,
}

impl Report {
    pub fn with_prices(mut self, prices: impl IntoIterator<Item = ClassPrice>) -> Self {
        self.prices = prices.into_iter().collect();
        self
    }

    pub fn with_scan_summary(mut self, summary: ScanSummary) -> Self {
        self.scan = Some(summary);
        self
    }

    /// Entries of every group, in group order.
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.groups.values().flatten()
    }
}

// =============================================================================
// Assembler
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    options: ReportOptions,
}

impl ReportAssembler {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Build the report. Input order is preserved wherever the sort key ties.
    pub fn assemble<C: StorageContainer>(&self, containers: &[C]) -> Report {
        let mut ordered: Vec<&C> = containers.iter().collect();
        if let Some(order) = self.options.order {
            sort_containers(&mut ordered, order);
        }

        let unit = self.options.size_unit;
        let mut groups: BTreeMap<String, Vec<ReportEntry>> = BTreeMap::new();
        let mut totals = ReportTotals::default();

        for container in ordered {
            let entry = to_entry(container, unit);
            totals.buckets += 1;
            totals.file_count += entry.file_count;
            totals.size += entry.size;
            totals.cost += entry.cost;

            let key = match self.options.group_by {
                GroupBy::Global => GLOBAL_GROUP.to_string(),
                GroupBy::Region => container.region().to_string(),
            };
            groups.entry(key).or_default().push(entry);
        }

        Report {
            provider: self.options.provider.clone(),
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            size_unit: unit,
            groups,
            totals,
            prices: Vec::new(),
            scan: None,
        }
    }
}

fn compare<C: StorageContainer>(a: &C, b: &C, key: OrderKey) -> Ordering {
    match key {
        OrderKey::Name => a.name().cmp(b.name()),
        OrderKey::Size => a.total_bytes().cmp(&b.total_bytes()),
        OrderKey::Cost => a.cost().total_cmp(&b.cost()),
    }
}

/// Stable sort; descending reverses the comparator, not the result, so ties
/// keep their input order in both directions.
fn sort_containers<C: StorageContainer>(containers: &mut [&C], order: SortOrder) {
    match order.direction {
        SortDirection::Ascending => containers.sort_by(|a, b| compare(*a, *b, order.key)),
        SortDirection::Descending => containers.sort_by(|a, b| compare(*b, *a, order.key)),
    }
}

fn to_entry<C: StorageContainer>(container: &C, unit: SizeUnit) -> ReportEntry {
    ReportEntry {
        name: container.name().to_string(),
        region: container.region().to_string(),
        creation_date: container.creation_date(),
        file_count: container.file_count(),
        size: unit.convert(container.total_bytes()),
        size_by_storage_class: container
            .bytes_by_storage_class()
            .iter()
            .map(|(class, bytes)| (*class, unit.convert(*bytes)))
            .collect(),
        last_modified: container.last_modified(),
        cost: container.cost(),
    }
}
