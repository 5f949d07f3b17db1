//! JSON HTTP API
//!
//! Thin axum layer over the advisors. Handlers are generic over the data
//! providers so the router can be exercised with in-memory fakes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::advisor::{CropAdvice, CropAdvisor};
use crate::cache::PersistentCache;
use crate::catalog::CropCatalog;
use crate::climate::{ClimateAggregator, ClimateProvider, PowerClient, TemperatureSource};
use crate::config::AgriConfig;
use crate::flood::{FloodAssessment, FloodMonitor, FloodProvider, OpenMeteoFloodClient};
use crate::geocoding::{Geocoder, LocationInput, LocationParser, LocationResolver, OpenMeteoGeocoder};
use crate::irrigation::{IrrigationAdvisor, IrrigationPlan};
use crate::models::{Coordinate, CropProfile};
use crate::{AgriError, VERSION, http};

/// Services shared by all requests
pub struct AppState<P = PowerClient, G = OpenMeteoGeocoder, F = OpenMeteoFloodClient> {
    pub advisor: Arc<CropAdvisor<P, G>>,
    pub irrigation: Arc<IrrigationAdvisor<P>>,
    pub flood: Arc<FloodMonitor<F>>,
}

// Providers are shared through `Arc` and need not be `Clone`
impl<P, G, F> Clone for AppState<P, G, F> {
    fn clone(&self) -> Self {
        Self {
            advisor: Arc::clone(&self.advisor),
            irrigation: Arc::clone(&self.irrigation),
            flood: Arc::clone(&self.flood),
        }
    }
}

impl AppState {
    /// Wire the live providers from configuration
    pub fn from_config(config: &AgriConfig) -> anyhow::Result<Self> {
        let client = http::build_client(&config.providers)?;
        let power = PowerClient::new(client.clone(), config.providers.power_base_url.as_str());
        let geocoder = OpenMeteoGeocoder::new(
            client.clone(),
            config.providers.geocoding_base_url.as_str(),
        );
        let flood = OpenMeteoFloodClient::new(client, config.providers.flood_base_url.as_str());

        let temperature = if config.climate.measure_temperature {
            TemperatureSource::Measured {
                fallback: config.climate.assumed_temperature_c,
            }
        } else {
            TemperatureSource::Assumed(config.climate.assumed_temperature_c)
        };

        let catalog = CropCatalog::load(config.catalog.path.as_deref().map(Path::new))?;

        let mut advisor = CropAdvisor::new(
            ClimateAggregator::new(power.clone(), temperature),
            LocationResolver::new(geocoder),
            Arc::new(catalog),
            config.climate.year_range()?,
            config.climate.fallback.summary(),
        );

        if config.cache.enabled {
            match PersistentCache::open(&config.cache.location) {
                Ok(cache) => {
                    let ttl = Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600);
                    advisor = advisor.with_cache(cache, ttl);
                }
                Err(e) => warn!(
                    "Climate cache at {} unavailable, continuing without it: {e}",
                    config.cache.location
                ),
            }
        }

        Ok(Self {
            advisor: Arc::new(advisor),
            irrigation: Arc::new(IrrigationAdvisor::new(
                power,
                config.irrigation.optimal_mm_per_day,
                config.irrigation.window_days,
            )),
            flood: Arc::new(FloodMonitor::new(flood, config.flood.discharge_threshold)),
        })
    }
}

/// `{error, message}` body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

pub struct ApiError(AgriError);

impl From<AgriError> for ApiError {
    fn from(err: AgriError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AgriError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            AgriError::LocationUnavailable { .. } => StatusCode::BAD_REQUEST,
            AgriError::ProviderUnreachable { .. } | AgriError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoordinateQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl CoordinateQuery {
    fn coordinate(&self) -> Result<Coordinate, AgriError> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => Err(AgriError::location_unavailable(
                "Both lat and lon query parameters are required",
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    /// Place name or `lat,lon` text
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl RecommendationQuery {
    fn input(&self) -> Result<LocationInput, AgriError> {
        match self.location.as_deref() {
            Some(text) if !text.trim().is_empty() => LocationParser::parse(text),
            _ => {
                let coordinate = CoordinateQuery {
                    lat: self.lat,
                    lon: self.lon,
                }
                .coordinate()?;
                Ok(LocationInput::Coordinates(
                    coordinate.latitude,
                    coordinate.longitude,
                ))
            }
        }
    }
}

pub fn router<P, G, F>(state: AppState<P, G, F>) -> Router
where
    P: ClimateProvider + 'static,
    G: Geocoder + 'static,
    F: FloodProvider + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/crops", get(get_crops::<P, G, F>))
        .route("/recommendations", get(get_recommendations::<P, G, F>))
        .route("/irrigation", get(get_irrigation::<P, G, F>))
        .route("/flood", get(get_flood::<P, G, F>))
        .with_state(state)
}

/// Unwrap query parameters, turning a malformed query string into a JSON
/// `location_unavailable` error instead of axum's plain-text rejection
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AgriError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AgriError::location_unavailable(rejection.body_text()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}

async fn get_crops<P, G, F>(State(state): State<AppState<P, G, F>>) -> Json<Vec<CropProfile>>
where
    P: ClimateProvider,
    G: Geocoder,
{
    Json(state.advisor.catalog().crops().to_vec())
}

async fn get_recommendations<P, G, F>(
    State(state): State<AppState<P, G, F>>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> Result<Json<CropAdvice>, ApiError>
where
    P: ClimateProvider,
    G: Geocoder,
{
    let input = query_params(query)?.input()?;
    let advice = state.advisor.advise(input).await?;
    Ok(Json(advice))
}

async fn get_irrigation<P, G, F>(
    State(state): State<AppState<P, G, F>>,
    query: Result<Query<CoordinateQuery>, QueryRejection>,
) -> Result<Json<IrrigationPlan>, ApiError>
where
    P: ClimateProvider,
{
    let coordinate = query_params(query)?.coordinate()?;
    let today = chrono::Utc::now().date_naive();
    let plan = state.irrigation.plan(coordinate, today).await?;
    Ok(Json(plan))
}

async fn get_flood<P, G, F>(
    State(state): State<AppState<P, G, F>>,
    query: Result<Query<CoordinateQuery>, QueryRejection>,
) -> Result<Json<FloodAssessment>, ApiError>
where
    F: FloodProvider,
{
    let coordinate = query_params(query)?.coordinate()?;
    let assessment = state.flood.assess(coordinate).await?;
    Ok(Json(assessment))
}
