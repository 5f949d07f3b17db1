//! Historical climate data
//!
//! `ClimateProvider` is the seam between the aggregation logic and the
//! NASA POWER HTTP client, so aggregation can run against any source of
//! monthly samples.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{ClimateSample, Coordinate, YearRange};

pub mod aggregator;
pub mod power;

pub use aggregator::{ClimateAggregator, TemperatureSource, summarize_samples};
pub use power::PowerClient;

/// Climate variables requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Root-zone soil wetness
    RootZoneMoisture,
    /// Profile soil wetness
    ProfileMoisture,
    /// Bias-corrected precipitation
    Precipitation,
    /// Air temperature at 2 m
    Temperature,
}

impl Parameter {
    /// Provider variable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Parameter::RootZoneMoisture => "GWETROOT",
            Parameter::ProfileMoisture => "GWETPROF",
            Parameter::Precipitation => "PRECTOTCORR",
            Parameter::Temperature => "T2M",
        }
    }
}

/// One day of precipitation, as used by irrigation advice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPrecipitation {
    pub date: NaiveDate,
    /// mm/day, raw provider value
    pub precipitation: Option<f64>,
}

/// Source of historical climate observations
pub trait ClimateProvider: Send + Sync {
    /// Monthly samples for every month of `years`
    fn monthly_series(
        &self,
        coordinate: Coordinate,
        years: YearRange,
        parameters: &[Parameter],
    ) -> impl Future<Output = Result<Vec<ClimateSample>>> + Send;

    /// Daily precipitation between `start` and `end`, inclusive
    fn daily_precipitation(
        &self,
        coordinate: Coordinate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<DailyPrecipitation>>> + Send;
}
