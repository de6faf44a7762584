//! Tiered price schedules.
//!
//! A schedule is a list of volume bands, each charging its own unit price
//! for the GB that fall inside it. Bands are contiguous from 0 and the last
//! one is open-ended.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One volume band, in GB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub begin_range: f64,
    /// Exclusive upper bound; `None` means unbounded.
    pub end_range: Option<f64>,
    /// USD per GB-month
    pub unit_price: f64,
}

impl PriceBand {
    pub fn new(begin_range: f64, end_range: Option<f64>, unit_price: f64) -> Self {
        Self {
            begin_range,
            end_range,
            unit_price,
        }
    }

    /// Band width, `None` for the unbounded band.
    pub fn width(&self) -> Option<f64> {
        self.end_range.map(|end| end - self.begin_range)
    }
}

/// Validated, ordered bands for one (region, class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBand>", into = "Vec<PriceBand>")]
pub struct PriceSchedule {
    bands: Vec<PriceBand>,
}

impl PriceSchedule {
    /// Sort and validate bands.
    ///
    /// Rejects empty schedules, gaps, overlaps, a first band not starting at
    /// 0, a bounded last band, an unbounded band before the last one, and
    /// negative or non-finite numbers.
    pub fn new(mut bands: Vec<PriceBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::InvalidPriceSchedule("no price bands".to_string()));
        }
        bands.sort_by(|a, b| a.begin_range.total_cmp(&b.begin_range));

        for band in &bands {
            if !band.unit_price.is_finite() || band.unit_price < 0.0 {
                return Err(Error::InvalidPriceSchedule(format!(
                    "invalid unit price {}",
                    band.unit_price
                )));
            }
            if !band.begin_range.is_finite() || band.begin_range < 0.0 {
                return Err(Error::InvalidPriceSchedule(format!(
                    "invalid band start {}",
                    band.begin_range
                )));
            }
            if let Some(end) = band.end_range {
                if !end.is_finite() || end <= band.begin_range {
                    return Err(Error::InvalidPriceSchedule(format!(
                        "band [{}, {}) is empty or inverted",
                        band.begin_range, end
                    )));
                }
            }
        }

        if bands[0].begin_range != 0.0 {
            return Err(Error::InvalidPriceSchedule(format!(
                "first band starts at {}, not 0",
                bands[0].begin_range
            )));
        }

        for pair in bands.windows(2) {
            match pair[0].end_range {
                None => {
                    return Err(Error::InvalidPriceSchedule(
                        "unbounded band is not the last one".to_string(),
                    ))
                }
                Some(end) if end != pair[1].begin_range => {
                    return Err(Error::InvalidPriceSchedule(format!(
                        "bands are not contiguous at {} / {}",
                        end, pair[1].begin_range
                    )))
                }
                Some(_) => {}
            }
        }

        if bands.last().and_then(|b| b.end_range).is_some() {
            return Err(Error::InvalidPriceSchedule(
                "last band must be unbounded".to_string(),
            ));
        }

        Ok(Self { bands })
    }

    /// A single unbounded band.
    pub fn flat(unit_price: f64) -> Result<Self> {
        Self::new(vec![PriceBand::new(0.0, None, unit_price)])
    }

    pub fn bands(&self) -> &[PriceBand] {
        &self.bands
    }

    /// Total charge for `volume_gb`, each band billing the part of the volume
    /// that falls inside it.
    pub fn tiered_charge(&self, volume_gb: f64) -> f64 {
        if volume_gb <= 0.0 || !volume_gb.is_finite() {
            return 0.0;
        }

        let mut remaining = volume_gb;
        let mut total = 0.0;
        for band in &self.bands {
            let chargeable = match band.width() {
                Some(width) => remaining.min(width),
                None => remaining,
            };
            total += chargeable * band.unit_price;
            remaining -= chargeable;
            if remaining <= 0.0 {
                break;
            }
        }
        total
    }

    /// Blended unit price for `volume_gb`; zero when there is no volume.
    pub fn effective_price(&self, volume_gb: f64) -> f64 {
        if volume_gb <= 0.0 || !volume_gb.is_finite() {
            return 0.0;
        }
        self.tiered_charge(volume_gb) / volume_gb
    }
}

impl TryFrom<Vec<PriceBand>> for PriceSchedule {
    type Error = Error;

    fn try_from(bands: Vec<PriceBand>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<PriceSchedule> for Vec<PriceBand> {
    fn from(schedule: PriceSchedule) -> Self {
        schedule.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn two_tier() -> PriceSchedule {
        PriceSchedule::new(vec![
            PriceBand::new(400.0, None, 0.20),
            PriceBand::new(0.0, Some(400.0), 0.25),
        ])
        .unwrap()
    }

    #[test]
    fn test_tiered_integral() {
        let schedule = two_tier();
        assert!((schedule.tiered_charge(450.0) - 110.0).abs() < 1e-9);
        assert!((schedule.effective_price(450.0) - 110.0 / 450.0).abs() < 1e-12);
    }

    #[test]
    fn test_volume_inside_first_band() {
        let schedule = two_tier();
        assert!((schedule.tiered_charge(100.0) - 25.0).abs() < 1e-9);
        assert!((schedule.effective_price(100.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_volume_is_free() {
        let schedule = two_tier();
        assert_eq!(schedule.tiered_charge(0.0), 0.0);
        assert_eq!(schedule.effective_price(0.0), 0.0);
    }

    #[test]
    fn test_bands_are_sorted() {
        let schedule = two_tier();
        assert_eq!(schedule.bands()[0].begin_range, 0.0);
        assert_eq!(schedule.bands()[1].end_range, None);
    }

    #[test]
    fn test_invalid_schedules_rejected() {
        assert_matches!(PriceSchedule::new(vec![]), Err(Error::InvalidPriceSchedule(_)));

        // gap
        assert_matches!(
            PriceSchedule::new(vec![
                PriceBand::new(0.0, Some(10.0), 0.3),
                PriceBand::new(20.0, None, 0.2),
            ]),
            Err(Error::InvalidPriceSchedule(_))
        );

        // overlap
        assert_matches!(
            PriceSchedule::new(vec![
                PriceBand::new(0.0, Some(30.0), 0.3),
                PriceBand::new(20.0, None, 0.2),
            ]),
            Err(Error::InvalidPriceSchedule(_))
        );

        // bounded tail
        assert_matches!(
            PriceSchedule::new(vec![PriceBand::new(0.0, Some(10.0), 0.3)]),
            Err(Error::InvalidPriceSchedule(_))
        );

        // does not start at zero
        assert_matches!(
            PriceSchedule::new(vec![PriceBand::new(5.0, None, 0.3)]),
            Err(Error::InvalidPriceSchedule(_))
        );

        assert_matches!(PriceSchedule::flat(-1.0), Err(Error::InvalidPriceSchedule(_)));
        assert_matches!(PriceSchedule::flat(f64::NAN), Err(Error::InvalidPriceSchedule(_)));
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"[{"begin_range":0.0,"end_range":null,"unit_price":0.023}]"#;
        let schedule: PriceSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.bands().len(), 1);

        let bad = r#"[{"begin_range":3.0,"end_range":null,"unit_price":0.023}]"#;
        assert!(serde_json::from_str::<PriceSchedule>(bad).is_err());
    }
}
