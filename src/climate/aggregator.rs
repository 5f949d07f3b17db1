//! Reduction of a monthly climate series to a `ClimateSummary`

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use super::{ClimateProvider, Parameter};
use crate::Result;
use crate::models::{ClimateSample, ClimateSummary, Coordinate, YearRange};

/// Plausible 2 m air temperatures in °C; anything else is provider fill
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=60.0;

/// How `avg_temperature` is obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureSource {
    /// Use a fixed representative value
    Assumed(f64),
    /// Average monthly T2M readings, using `fallback` when none are valid
    Measured { fallback: f64 },
}

impl TemperatureSource {
    /// Short tag that tells summaries built with different sources apart
    #[must_use]
    pub fn cache_tag(&self) -> String {
        match self {
            TemperatureSource::Assumed(value) => format!("t{value}"),
            TemperatureSource::Measured { fallback } => format!("measured{fallback}"),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut parameters = vec![
            Parameter::RootZoneMoisture,
            Parameter::ProfileMoisture,
            Parameter::Precipitation,
        ];
        if matches!(self, TemperatureSource::Measured { .. }) {
            parameters.push(Parameter::Temperature);
        }
        parameters
    }
}

/// Precipitation readings below zero are provider noise
#[must_use]
pub fn is_valid_precipitation(value: f64) -> bool {
    value >= 0.0
}

/// Soil wetness is a fraction; anything outside 0..=1 is provider noise
#[must_use]
pub fn is_valid_moisture(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

#[derive(Default)]
struct YearTotals {
    rainfall: f64,
    moisture: Vec<f64>,
}

impl YearTotals {
    fn average_moisture(&self) -> f64 {
        if self.moisture.is_empty() {
            0.0
        } else {
            self.moisture.iter().sum::<f64>() / self.moisture.len() as f64
        }
    }
}

/// Reduce `samples` to per-year totals and average them over `years`.
///
/// Each requested year weighs the same, including years without any valid
/// reading. Samples outside `years` are ignored.
#[must_use]
pub fn summarize_samples(
    samples: &[ClimateSample],
    years: YearRange,
    temperature: TemperatureSource,
) -> ClimateSummary {
    let mut per_year: BTreeMap<i32, YearTotals> =
        years.years().map(|year| (year, YearTotals::default())).collect();
    let mut temperatures = Vec::new();
    let mut discarded = 0usize;

    for sample in samples {
        let Some(totals) = per_year.get_mut(&sample.date.year) else {
            continue;
        };

        match sample.precipitation {
            Some(rain) if is_valid_precipitation(rain) => totals.rainfall += rain,
            Some(_) => discarded += 1,
            None => {}
        }
        match sample.root_zone_moisture {
            Some(moisture) if is_valid_moisture(moisture) => totals.moisture.push(moisture),
            Some(_) => discarded += 1,
            None => {}
        }
        if let Some(t) = sample.temperature.filter(|t| TEMPERATURE_RANGE.contains(t)) {
            temperatures.push(t);
        }
    }

    if discarded > 0 {
        debug!("Discarded {discarded} out-of-range readings");
    }

    let year_count = years.len() as f64;
    let avg_rainfall = per_year.values().map(|y| y.rainfall).sum::<f64>() / year_count;
    let avg_soil_moisture = per_year
        .values()
        .map(YearTotals::average_moisture)
        .sum::<f64>()
        / year_count;

    let avg_temperature = match temperature {
        TemperatureSource::Assumed(value) => value,
        TemperatureSource::Measured { fallback } if temperatures.is_empty() => fallback,
        TemperatureSource::Measured { .. } => {
            temperatures.iter().sum::<f64>() / temperatures.len() as f64
        }
    };

    ClimateSummary {
        avg_temperature,
        avg_rainfall,
        avg_soil_moisture,
    }
}

/// Fetches a coordinate's history and summarises it
pub struct ClimateAggregator<P> {
    provider: P,
    temperature: TemperatureSource,
}

impl<P: ClimateProvider> ClimateAggregator<P> {
    pub fn new(provider: P, temperature: TemperatureSource) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn temperature(&self) -> TemperatureSource {
        self.temperature
    }

    /// Summarise the climate at `coordinate` over `years`
    #[instrument(skip(self))]
    pub async fn summarize(
        &self,
        coordinate: Coordinate,
        years: YearRange,
    ) -> Result<ClimateSummary> {
        let coordinate = coordinate.validated()?;
        let parameters = self.temperature.parameters();

        let samples = self
            .provider
            .monthly_series(coordinate, years, &parameters)
            .await?;
        let summary = summarize_samples(&samples, years, self.temperature);

        info!(
            "Climate at {} for {}: {:.1}°C, {:.1} mm rainfall, {:.2} soil moisture",
            coordinate.format(),
            years,
            summary.avg_temperature,
            summary.avg_rainfall,
            summary.avg_soil_moisture
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YearMonth;
    use rstest::rstest;

    const ASSUMED: TemperatureSource = TemperatureSource::Assumed(25.0);

    fn sample(key: &str, rain: Option<f64>, moisture: Option<f64>) -> ClimateSample {
        ClimateSample {
            precipitation: rain,
            root_zone_moisture: moisture,
            ..ClimateSample::new(YearMonth::parse(key).unwrap())
        }
    }

    fn years(start: i32, end: i32) -> YearRange {
        YearRange::new(start, end).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_single_year_totals() {
        let samples = vec![
            sample("202001", Some(2.0), Some(0.4)),
            sample("202002", Some(3.0), Some(0.6)),
        ];
        let summary = summarize_samples(&samples, years(2020, 2020), ASSUMED);
        assert!(approx(summary.avg_rainfall, 5.0));
        assert!(approx(summary.avg_soil_moisture, 0.5));
        assert_eq!(summary.avg_temperature, 25.0);
    }

    #[test]
    fn test_years_are_weighted_uniformly() {
        let samples = vec![
            sample("202001", Some(6.0), Some(0.3)),
            sample("202002", Some(6.0), Some(0.5)),
            sample("202101", Some(3.0), Some(0.9)),
            // 2022 has no readings at all
        ];
        let summary = summarize_samples(&samples, years(2020, 2022), ASSUMED);
        assert!(approx(summary.avg_rainfall, (12.0 + 3.0 + 0.0) / 3.0));
        assert!(approx(summary.avg_soil_moisture, (0.4 + 0.9 + 0.0) / 3.0));
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(12.5, true)]
    #[case(-0.1, false)]
    #[case(-999.0, false)]
    #[case(f64::NAN, false)]
    fn test_precipitation_validity(#[case] value: f64, #[case] valid: bool) {
        assert_eq!(is_valid_precipitation(value), valid);
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(1.0, true)]
    #[case(1.1, false)]
    #[case(-0.01, false)]
    #[case(f64::NAN, false)]
    fn test_moisture_validity(#[case] value: f64, #[case] valid: bool) {
        assert_eq!(is_valid_moisture(value), valid);
    }

    #[test]
    fn test_noise_is_dropped_not_counted() {
        let samples = vec![
            sample("202001", Some(0.0), Some(1.0)),
            sample("202002", Some(-999.0), Some(1.1)),
            sample("202003", Some(4.0), Some(0.5)),
        ];
        let summary = summarize_samples(&samples, years(2020, 2020), ASSUMED);
        assert!(approx(summary.avg_rainfall, 4.0));
        // 1.1 is excluded from both the sum and the count
        assert!(approx(summary.avg_soil_moisture, 0.75));
    }

    #[test]
    fn test_samples_outside_range_are_ignored() {
        let samples = vec![
            sample("201912", Some(100.0), Some(0.9)),
            sample("202001", Some(1.0), Some(0.3)),
        ];
        let summary = summarize_samples(&samples, years(2020, 2020), ASSUMED);
        assert!(approx(summary.avg_rainfall, 1.0));
        assert!(approx(summary.avg_soil_moisture, 0.3));
    }

    #[test]
    fn test_order_does_not_matter() {
        let mut samples = vec![
            sample("202003", Some(1.5), Some(0.2)),
            sample("202101", Some(2.5), Some(0.7)),
            sample("202001", Some(4.0), Some(0.4)),
        ];
        let forward = summarize_samples(&samples, years(2020, 2021), ASSUMED);
        samples.reverse();
        let backward = summarize_samples(&samples, years(2020, 2021), ASSUMED);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_empty_series_summarises_to_zero() {
        let summary = summarize_samples(&[], years(2020, 2022), ASSUMED);
        assert_eq!(summary.avg_rainfall, 0.0);
        assert_eq!(summary.avg_soil_moisture, 0.0);
    }

    #[test]
    fn test_measured_temperature() {
        let mut warm = sample("202001", Some(1.0), Some(0.5));
        warm.temperature = Some(27.0);
        let mut cool = sample("202002", Some(1.0), Some(0.5));
        cool.temperature = Some(21.0);
        let mut fill = sample("202003", Some(1.0), Some(0.5));
        fill.temperature = Some(-999.0);

        let summary = summarize_samples(
            &[warm, cool, fill],
            years(2020, 2020),
            TemperatureSource::Measured { fallback: 25.0 },
        );
        assert!(approx(summary.avg_temperature, 24.0));
    }

    #[test]
    fn test_measured_temperature_falls_back() {
        let summary = summarize_samples(
            &[sample("202001", Some(1.0), Some(0.5))],
            years(2020, 2020),
            TemperatureSource::Measured { fallback: 23.5 },
        );
        assert_eq!(summary.avg_temperature, 23.5);
    }

    #[test]
    fn test_requested_parameters() {
        assert_eq!(ASSUMED.parameters().len(), 3);
        assert!(
            TemperatureSource::Measured { fallback: 25.0 }
                .parameters()
                .contains(&Parameter::Temperature)
        );
    }
}
