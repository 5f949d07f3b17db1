//! Climate samples, year windows and the aggregated summary

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{AgriError, Result};

/// A calendar month as keyed by the climate provider (`YYYYMM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Parse a provider key like `202107`.
    ///
    /// Returns `None` for anything that is not a real calendar month,
    /// including the provider's annual aggregate key (`202113`).
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if key.len() != 6 || !key.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let year = key[..4].parse().ok()?;
        let month = key[4..].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of calendar years, never empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawYearRange")]
pub struct YearRange {
    start: i32,
    end: i32,
}

#[derive(Deserialize)]
struct RawYearRange {
    start: i32,
    end: i32,
}

impl TryFrom<RawYearRange> for YearRange {
    type Error = AgriError;

    fn try_from(raw: RawYearRange) -> Result<Self> {
        YearRange::new(raw.start, raw.end)
    }
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(AgriError::config(format!(
                "Year range start ({start}) must not be after end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> i32 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> i32 {
        self.end
    }

    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// Number of years in the range (at least one)
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.start.abs_diff(self.end)).map_or(usize::MAX, |n| n.saturating_add(1))
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One monthly observation from the climate provider.
///
/// Values are kept raw; validity filtering happens during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    pub date: YearMonth,
    /// Corrected total precipitation
    pub precipitation: Option<f64>,
    /// Root-zone soil wetness, 0..=1
    pub root_zone_moisture: Option<f64>,
    /// Profile soil wetness, 0..=1
    pub profile_moisture: Option<f64>,
    /// 2 m air temperature in °C, when requested
    pub temperature: Option<f64>,
}

impl ClimateSample {
    #[must_use]
    pub fn new(date: YearMonth) -> Self {
        Self {
            date,
            precipitation: None,
            root_zone_moisture: None,
            profile_moisture: None,
            temperature: None,
        }
    }
}

/// Three-scalar reduction of a climate series for one coordinate and period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateSummary {
    /// °C
    pub avg_temperature: f64,
    /// mm, averaged per year over the requested window
    pub avg_rainfall: f64,
    /// 0..=1
    pub avg_soil_moisture: f64,
}
