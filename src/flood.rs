//! River discharge flood indicator
//!
//! Compares the latest daily river discharge reported by the Open-Meteo
//! flood API against a fixed threshold.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::http::{self, ProviderClient};
use crate::models::Coordinate;
use crate::{AgriError, Result};

const PROVIDER: &str = "Open-Meteo flood";

/// Source of daily river discharge series
pub trait FloodProvider: Send + Sync {
    /// Daily discharge in m³/s, oldest first
    fn river_discharge(
        &self,
        coordinate: Coordinate,
    ) -> impl Future<Output = Result<Vec<Option<f64>>>> + Send;
}

#[derive(Debug, Deserialize)]
struct FloodResponse {
    daily: Option<FloodDaily>,
}

#[derive(Debug, Deserialize)]
struct FloodDaily {
    river_discharge: Option<Vec<Option<f64>>>,
}

/// Open-Meteo flood API client
#[derive(Clone)]
pub struct OpenMeteoFloodClient {
    client: ProviderClient,
    base_url: String,
}

impl OpenMeteoFloodClient {
    pub fn new(client: ProviderClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn flood_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/flood?latitude={}&longitude={}&daily=river_discharge",
            self.base_url, coordinate.latitude, coordinate.longitude
        )
    }
}

impl FloodProvider for OpenMeteoFloodClient {
    #[instrument(skip(self))]
    async fn river_discharge(&self, coordinate: Coordinate) -> Result<Vec<Option<f64>>> {
        let response: FloodResponse =
            http::get_json(&self.client, PROVIDER, &self.flood_url(coordinate)).await?;
        response
            .daily
            .and_then(|daily| daily.river_discharge)
            .ok_or_else(|| AgriError::malformed_response("Flood response lacks daily.river_discharge"))
    }
}

/// Flood risk derived from the most recent discharge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodAssessment {
    /// m³/s
    pub latest_discharge: f64,
    /// m³/s
    pub threshold: f64,
    /// Latest discharge as a percentage of the threshold
    pub risk_percent: f64,
    pub warning: bool,
}

impl FloodAssessment {
    /// Assess the last reported value of `series`
    pub fn from_discharge(series: &[Option<f64>], threshold: f64) -> Result<Self> {
        let latest_discharge = series
            .iter()
            .rev()
            .find_map(|value| value.filter(|v| v.is_finite()))
            .ok_or_else(|| AgriError::malformed_response("No river discharge values reported"))?;

        Ok(Self {
            latest_discharge,
            threshold,
            risk_percent: latest_discharge / threshold * 100.0,
            warning: latest_discharge >= threshold,
        })
    }
}

/// Flood risk checks for a coordinate
pub struct FloodMonitor<F> {
    provider: F,
    threshold: f64,
}

impl<F: FloodProvider> FloodMonitor<F> {
    pub fn new(provider: F, threshold: f64) -> Self {
        Self {
            provider,
            threshold,
        }
    }

    #[instrument(skip(self))]
    pub async fn assess(&self, coordinate: Coordinate) -> Result<FloodAssessment> {
        let coordinate = coordinate.validated()?;
        let series = self.provider.river_discharge(coordinate).await?;
        let assessment = FloodAssessment::from_discharge(&series, self.threshold)?;

        if assessment.warning {
            warn!(
                "Flood warning at {}: discharge {:.1} m³/s exceeds {:.1} m³/s",
                coordinate.format(),
                assessment.latest_discharge,
                assessment.threshold
            );
        } else {
            info!(
                "Flood risk at {}: {:.0}%",
                coordinate.format(),
                assessment.risk_percent
            );
        }

        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDischarge(Vec<Option<f64>>);

    impl FloodProvider for FixedDischarge {
        async fn river_discharge(&self, _coordinate: Coordinate) -> Result<Vec<Option<f64>>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_below_threshold() {
        let assessment = FloodAssessment::from_discharge(&[Some(30.0), Some(5.0)], 20.0).unwrap();
        assert_eq!(assessment.latest_discharge, 5.0);
        assert_eq!(assessment.risk_percent, 25.0);
        assert!(!assessment.warning);
    }

    #[test]
    fn test_warning_at_threshold() {
        let assessment = FloodAssessment::from_discharge(&[Some(20.0)], 20.0).unwrap();
        assert_eq!(assessment.risk_percent, 100.0);
        assert!(assessment.warning);
    }

    #[test]
    fn test_trailing_nulls_are_skipped() {
        let assessment =
            FloodAssessment::from_discharge(&[Some(12.0), Some(44.0), None, None], 20.0).unwrap();
        assert_eq!(assessment.latest_discharge, 44.0);
        assert!(assessment.warning);
    }

    #[test]
    fn test_empty_series_is_malformed() {
        for series in [vec![], vec![None, None]] {
            assert!(matches!(
                FloodAssessment::from_discharge(&series, 20.0).unwrap_err(),
                AgriError::MalformedResponse { .. }
            ));
        }
    }

    #[test]
    fn test_response_shape() {
        let response: FloodResponse = serde_json::from_str(
            r#"{"daily":{"time":["2024-07-01","2024-07-02"],"river_discharge":[3.2,null]}}"#,
        )
        .unwrap();
        assert_eq!(
            response.daily.unwrap().river_discharge.unwrap(),
            vec![Some(3.2), None]
        );
    }

    #[tokio::test]
    async fn test_monitor_uses_configured_threshold() {
        let monitor = FloodMonitor::new(FixedDischarge(vec![Some(45.0)]), 50.0);
        let assessment = monitor
            .assess(Coordinate::new(25.6, 85.1).unwrap())
            .await
            .unwrap();
        assert_eq!(assessment.risk_percent, 90.0);
        assert!(!assessment.warning);
    }
}
