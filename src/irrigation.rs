//! Irrigation advice from recent rainfall
//!
//! The average daily precipitation of the last days is compared with a
//! fixed crop water requirement over one week.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::climate::ClimateProvider;
use crate::climate::aggregator::is_valid_precipitation;
use crate::models::Coordinate;
use crate::{AgriError, Result};

/// A surplus larger than this (mm/week) calls for less irrigation
const SURPLUS_TOLERANCE_MM: f64 = 2.0;

const DAYS_PER_WEEK: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IrrigationStatus {
    Increase,
    Maintain,
    Decrease,
}

/// Weekly irrigation recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationPlan {
    /// mm/day over the observed window
    pub average_precipitation: f64,
    /// mm of water to add this week
    pub recommended: f64,
    /// Weekly need minus weekly rainfall, mm; negative means surplus
    pub deficit: f64,
    pub status: IrrigationStatus,
}

impl IrrigationPlan {
    /// Plan for a week given the average daily rainfall
    #[must_use]
    pub fn from_average(average_precipitation: f64, optimal_mm_per_day: f64) -> Self {
        let weekly_optimal = optimal_mm_per_day * DAYS_PER_WEEK;
        let actual = average_precipitation * DAYS_PER_WEEK;
        let deficit = weekly_optimal - actual;

        let status = if deficit > 0.0 {
            IrrigationStatus::Increase
        } else if deficit < -SURPLUS_TOLERANCE_MM {
            IrrigationStatus::Decrease
        } else {
            IrrigationStatus::Maintain
        };

        Self {
            average_precipitation,
            recommended: deficit.max(0.0),
            deficit,
            status,
        }
    }
}

/// Builds irrigation plans from recent daily precipitation
pub struct IrrigationAdvisor<P> {
    provider: P,
    optimal_mm_per_day: f64,
    window_days: u32,
}

impl<P: ClimateProvider> IrrigationAdvisor<P> {
    pub fn new(provider: P, optimal_mm_per_day: f64, window_days: u32) -> Self {
        Self {
            provider,
            optimal_mm_per_day,
            window_days,
        }
    }

    /// Plan irrigation for the week ending `today`
    #[instrument(skip(self))]
    pub async fn plan(&self, coordinate: Coordinate, today: NaiveDate) -> Result<IrrigationPlan> {
        let coordinate = coordinate.validated()?;
        let start = today
            .checked_sub_days(Days::new(self.window_days.into()))
            .ok_or_else(|| AgriError::config("Irrigation window reaches before the calendar"))?;

        let days = self
            .provider
            .daily_precipitation(coordinate, start, today)
            .await?;

        let valid: Vec<f64> = days
            .iter()
            .filter_map(|day| day.precipitation)
            .filter(|rain| is_valid_precipitation(*rain))
            .collect();
        if valid.is_empty() {
            return Err(AgriError::malformed_response(
                "No valid precipitation readings in the irrigation window",
            ));
        }

        let average = valid.iter().sum::<f64>() / valid.len() as f64;
        let plan = IrrigationPlan::from_average(average, self.optimal_mm_per_day);

        info!(
            "Irrigation at {}: {:.1} mm/day rainfall, {:?} by {:.1} mm",
            coordinate.format(),
            average,
            plan.status,
            plan.recommended
        );

        Ok(plan)
    }
}
