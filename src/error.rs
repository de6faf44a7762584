//! Error types for Bucket Ledger

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while auditing object storage
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (fatal, raised before any scan starts)
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// A remote provider call failed
    #[error("Provider call '{operation}' failed: {reason}")]
    Provider { operation: String, reason: String },

    /// The client for a region could not be created
    #[error("Region {region} unavailable: {reason}")]
    RegionUnavailable { region: String, reason: String },

    // =========================================================================
    // Pricing Errors
    // =========================================================================
    /// No price schedule exists for an observed region/class pair
    #[error("No price schedule for storage class {storage_class} in region {region}")]
    PricingGap {
        region: String,
        storage_class: String,
    },

    /// A price schedule violates the band invariants
    #[error("Invalid price schedule: {0}")]
    InvalidPriceSchedule(String),

    /// A provider price list document could not be decoded
    #[error("Failed to parse price list: {0}")]
    PriceListParse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a provider error for the named remote operation.
    pub fn provider(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Provider {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error only affects one unit of work and the run may continue.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Provider { .. }
                | Error::RegionUnavailable { .. }
                | Error::PricingGap { .. }
                | Error::InvalidPriceSchedule(_)
                | Error::PriceListParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = Error::provider("ListObjectsV2", "throttled");
        assert_eq!(
            err.to_string(),
            "Provider call 'ListObjectsV2' failed: throttled"
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = Error::Config("no regions".to_string());
        assert!(!err.is_transient());
    }
}
