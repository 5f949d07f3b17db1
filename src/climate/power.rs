//! NASA POWER client
//!
//! Monthly agro-climatology (`community=AG`) for crop suitability and daily
//! precipitation (`community=RE`) for irrigation advice. Both endpoints
//! answer `{ properties: { parameter: { CODE: { date: value } } } }`.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{ClimateProvider, DailyPrecipitation, Parameter};
use crate::http::{self, ProviderClient};
use crate::models::{ClimateSample, Coordinate, YearMonth, YearRange};
use crate::{AgriError, Result};

const PROVIDER: &str = "NASA POWER";

/// `{ CODE: { date: value } }`
type ParameterTable = HashMap<String, BTreeMap<String, Option<f64>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct PowerResponse {
    properties: Option<PowerProperties>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: Option<ParameterTable>,
}

impl PowerResponse {
    fn into_table(self) -> Result<ParameterTable> {
        self.properties
            .and_then(|p| p.parameter)
            .ok_or_else(|| {
                AgriError::malformed_response("NASA POWER response lacks properties.parameter")
            })
    }
}

/// HTTP client for the NASA POWER point API
#[derive(Clone)]
pub struct PowerClient {
    client: ProviderClient,
    base_url: String,
}

impl PowerClient {
    pub fn new(client: ProviderClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn monthly_url(&self, coordinate: Coordinate, years: YearRange, parameters: &[Parameter]) -> String {
        format!(
            "{}/temporal/monthly/point?start={}&end={}&latitude={}&longitude={}&community=AG&parameters={}&format=JSON",
            self.base_url,
            years.start(),
            years.end(),
            coordinate.latitude,
            coordinate.longitude,
            parameter_codes(parameters)
        )
    }

    fn daily_url(&self, coordinate: Coordinate, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/temporal/daily/point?start={}&end={}&latitude={}&longitude={}&community=RE&parameters={}&format=JSON",
            self.base_url,
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
            coordinate.latitude,
            coordinate.longitude,
            Parameter::Precipitation.code()
        )
    }
}

impl ClimateProvider for PowerClient {
    #[instrument(skip(self))]
    async fn monthly_series(
        &self,
        coordinate: Coordinate,
        years: YearRange,
        parameters: &[Parameter],
    ) -> Result<Vec<ClimateSample>> {
        let url = self.monthly_url(coordinate, years, parameters);
        let response: PowerResponse = http::get_json(&self.client, PROVIDER, &url).await?;
        monthly_samples(response, parameters)
    }

    #[instrument(skip(self))]
    async fn daily_precipitation(
        &self,
        coordinate: Coordinate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrecipitation>> {
        let url = self.daily_url(coordinate, start, end);
        let response: PowerResponse = http::get_json(&self.client, PROVIDER, &url).await?;
        daily_samples(response)
    }
}

fn parameter_codes(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(Parameter::code)
        .collect::<Vec<_>>()
        .join(",")
}

/// Join the per-parameter tables into chronological monthly samples.
///
/// A requested series missing from the table is treated as empty.
pub(crate) fn monthly_samples(
    response: PowerResponse,
    parameters: &[Parameter],
) -> Result<Vec<ClimateSample>> {
    let table = response.into_table()?;
    let mut samples: BTreeMap<YearMonth, ClimateSample> = BTreeMap::new();

    for parameter in parameters {
        let Some(series) = table.get(parameter.code()) else {
            warn!("{} series missing from NASA POWER response", parameter.code());
            continue;
        };

        for (key, value) in series {
            let Some(date) = YearMonth::parse(key) else {
                // YYYY13 carries the provider's annual aggregate
                debug!("Skipping non-monthly key {key} in {}", parameter.code());
                continue;
            };
            let sample = samples
                .entry(date)
                .or_insert_with(|| ClimateSample::new(date));
            let slot = match parameter {
                Parameter::RootZoneMoisture => &mut sample.root_zone_moisture,
                Parameter::ProfileMoisture => &mut sample.profile_moisture,
                Parameter::Precipitation => &mut sample.precipitation,
                Parameter::Temperature => &mut sample.temperature,
            };
            *slot = *value;
        }
    }

    debug!("Parsed {} monthly samples", samples.len());
    Ok(samples.into_values().collect())
}

/// Daily precipitation keyed `YYYYMMDD`
pub(crate) fn daily_samples(response: PowerResponse) -> Result<Vec<DailyPrecipitation>> {
    let table = response.into_table()?;
    let series = table.get(Parameter::Precipitation.code()).ok_or_else(|| {
        AgriError::malformed_response("NASA POWER response lacks the PRECTOTCORR series")
    })?;

    Ok(series
        .iter()
        .filter_map(|(key, value)| {
            NaiveDate::parse_from_str(key, "%Y%m%d")
                .ok()
                .map(|date| DailyPrecipitation {
                    date,
                    precipitation: *value,
                })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    const MONTHLY: &[Parameter] = &[
        Parameter::RootZoneMoisture,
        Parameter::ProfileMoisture,
        Parameter::Precipitation,
    ];

    fn parse(json: &str) -> PowerResponse {
        serde_json::from_str(json).unwrap()
    }

    fn client() -> PowerClient {
        let http = http::build_client(&ProviderConfig::default()).unwrap();
        PowerClient::new(http, "https://power.larc.nasa.gov/api/")
    }

    #[test]
    fn test_monthly_url() {
        let coordinate = Coordinate::new(28.6, 77.2).unwrap();
        let years = YearRange::new(2020, 2022).unwrap();
        let url = client().monthly_url(coordinate, years, MONTHLY);
        assert_eq!(
            url,
            "https://power.larc.nasa.gov/api/temporal/monthly/point?start=2020&end=2022&latitude=28.6&longitude=77.2&community=AG&parameters=GWETROOT,GWETPROF,PRECTOTCORR&format=JSON"
        );
    }

    #[test]
    fn test_daily_url() {
        let coordinate = Coordinate::new(28.6, 77.2).unwrap();
        let url = client().daily_url(
            coordinate,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        );
        assert!(url.contains("temporal/daily/point?start=20240301&end=20240308"));
        assert!(url.contains("community=RE&parameters=PRECTOTCORR"));
    }

    #[test]
    fn test_monthly_samples_join_parameters() {
        let response = parse(
            r#"{"properties":{"parameter":{
                "PRECTOTCORR":{"202001":3.5,"202002":0.0,"202013":1.7},
                "GWETROOT":{"202001":0.61,"202002":0.58,"202013":0.6},
                "GWETPROF":{"202001":0.55}
            }}}"#,
        );
        let samples = monthly_samples(response, MONTHLY).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].date.to_string(), "2020-01");
        assert_eq!(samples[0].precipitation, Some(3.5));
        assert_eq!(samples[0].root_zone_moisture, Some(0.61));
        assert_eq!(samples[0].profile_moisture, Some(0.55));
        assert_eq!(samples[1].profile_moisture, None);
        assert_eq!(samples[1].temperature, None);
    }

    #[test]
    fn test_missing_series_is_empty() {
        let response = parse(r#"{"properties":{"parameter":{"GWETROOT":{"202101":0.4}}}}"#);
        let samples = monthly_samples(response, MONTHLY).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].precipitation, None);
    }

    #[test]
    fn test_null_values_are_kept_as_missing() {
        let response = parse(r#"{"properties":{"parameter":{"PRECTOTCORR":{"202101":null}}}}"#);
        let samples = monthly_samples(response, MONTHLY).unwrap();
        assert_eq!(samples[0].precipitation, None);
    }

    #[test]
    fn test_missing_parameter_block_is_malformed() {
        for json in [
            r#"{}"#,
            r#"{"properties":{}}"#,
            r#"{"type":"Feature","properties":{"parameter":null}}"#,
        ] {
            let err = monthly_samples(parse(json), MONTHLY).unwrap_err();
            assert!(matches!(err, AgriError::MalformedResponse { .. }), "{json}");
        }
    }

    #[test]
    fn test_daily_samples() {
        let response = parse(
            r#"{"properties":{"parameter":{"PRECTOTCORR":{"20240301":1.2,"20240302":-999.0}}}}"#,
        );
        let days = daily_samples(response).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(days[1].precipitation, Some(-999.0));
    }

    #[test]
    fn test_daily_samples_require_precipitation() {
        let response = parse(r#"{"properties":{"parameter":{"T2M":{"20240301":21.0}}}}"#);
        assert!(matches!(
            daily_samples(response).unwrap_err(),
            AgriError::MalformedResponse { .. }
        ));
    }
}
