//! Reporting: ordering, grouping and size conversion of priced buckets.

pub mod assembler;

pub use assembler::{
    GroupBy, OrderKey, Report, ReportAssembler, ReportEntry, ReportOptions, ReportTotals,
    SizeUnit, SortDirection, SortOrder, GLOBAL_GROUP,
};
