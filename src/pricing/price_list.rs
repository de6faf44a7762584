//! Provider price list decoding.
//!
//! The price list API returns one JSON document per product. Storage
//! products carry their volume type in `product.attributes.volumeType` and
//! their bands under `terms.OnDemand.<offer>.priceDimensions.<rate>`, with
//! numbers encoded as strings and the open upper bound spelled `Inf`.

use std::collections::HashMap;

use serde::Deserialize;

use super::tiered::{PriceBand, PriceSchedule};
use crate::domain::StorageClassId;
use crate::error::{Error, Result};

const STORAGE_FAMILY: &str = "Storage";
const TAG_STORAGE_USAGE: &str = "TagStorage-TagHrs";
const UNBOUNDED: &str = "Inf";

#[derive(Debug, Clone, Deserialize)]
pub struct PriceListDocument {
    pub product: Product,
    #[serde(default)]
    pub terms: Terms,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub product_family: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub attributes: ProductAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAttributes {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub usagetype: String,
    #[serde(default)]
    pub volume_type: String,
    #[serde(default)]
    pub region_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Terms {
    #[serde(rename = "OnDemand", default)]
    pub on_demand: HashMap<String, OfferTerm>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferTerm {
    #[serde(default)]
    pub price_dimensions: HashMap<String, PriceDimension>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDimension {
    pub begin_range: String,
    pub end_range: String,
    pub price_per_unit: PricePerUnit,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricePerUnit {
    #[serde(rename = "USD")]
    pub usd: String,
}

impl PriceListDocument {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::PriceListParse(e.to_string()))
    }

    /// Plain storage product: no request operation, no tag storage.
    pub fn is_storage_product(&self) -> bool {
        self.product.product_family == STORAGE_FAMILY
            && self.product.attributes.operation.is_empty()
            && self.product.attributes.usagetype != TAG_STORAGE_USAGE
    }

    /// Convert every on-demand price dimension into a validated schedule.
    pub fn schedule(&self) -> Result<PriceSchedule> {
        let bands = self
            .terms
            .on_demand
            .values()
            .flat_map(|term| term.price_dimensions.values())
            .map(PriceDimension::to_band)
            .collect::<Result<Vec<_>>>()?;
        PriceSchedule::new(bands)
    }
}

impl PriceDimension {
    fn to_band(&self) -> Result<PriceBand> {
        let begin = parse_number("beginRange", &self.begin_range)?;
        let end = if self.end_range == UNBOUNDED {
            None
        } else {
            Some(parse_number("endRange", &self.end_range)?)
        };
        let price = parse_number("pricePerUnit.USD", &self.price_per_unit.usd)?;
        Ok(PriceBand::new(begin, end, price))
    }
}

fn parse_number(field: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::PriceListParse(format!("{} '{}': {}", field, value, e)))
}

/// Pick the storage product matching `class` and build its schedule.
pub fn select_storage_schedule(
    documents: &[PriceListDocument],
    class: StorageClassId,
) -> Result<PriceSchedule> {
    let sku = class.pricing_sku().ok_or_else(|| {
        Error::PriceListParse(format!("storage class {} has no pricing volume type", class))
    })?;

    documents
        .iter()
        .filter(|doc| doc.is_storage_product())
        .find(|doc| doc.product.attributes.volume_type == sku)
        .ok_or_else(|| Error::PriceListParse(format!("no storage product for volume type '{}'", sku)))?
        .schedule()
}
