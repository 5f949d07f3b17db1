//! Location input parsing and resolution
//!
//! Free-text input is either a `lat,lon` pair or a place name. Place names
//! are resolved through the Open-Meteo geocoding API, first match only.

use std::future::Future;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::http::{self, ProviderClient};
use crate::models::{Coordinate, Location};
use crate::{AgriError, Result};

const PROVIDER: &str = "Open-Meteo geocoding";

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Place name (city, region, etc.)
    Name(String),
}

/// Location parsing utilities
pub struct LocationParser;

impl LocationParser {
    /// Parse location input (coordinates or place names)
    pub fn parse(input: &str) -> Result<LocationInput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgriError::location_unavailable("No location given"));
        }

        if let Some((lat, lon)) = Self::parse_coordinates(input) {
            return Ok(LocationInput::Coordinates(lat, lon));
        }

        Ok(LocationInput::Name(input.to_string()))
    }

    /// Parse coordinates from `46.8182,8.2275` or `46.8182 8.2275`.
    ///
    /// Out-of-range pairs are not coordinates.
    fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        let [lat, lon] = parts.as_slice() else {
            return None;
        };
        let coordinate = Coordinate::new(lat.parse().ok()?, lon.parse().ok()?).ok()?;
        Some((coordinate.latitude, coordinate.longitude))
    }
}

/// Resolves a place name to its best-matching location
pub trait Geocoder: Send + Sync {
    fn locate(&self, query: &str) -> impl Future<Output = Result<Location>> + Send;
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

impl GeocodingResponse {
    fn first_location(self, query: &str) -> Result<Location> {
        let result = self
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| {
                warn!("No results found for location '{query}'");
                AgriError::location_not_found(query)
            })?;

        let coordinate = Coordinate::new(result.latitude, result.longitude).map_err(|e| {
            AgriError::malformed_response(format!("Geocoding returned bad coordinates: {e}"))
        })?;

        Ok(match result.country {
            Some(country) => Location::with_country(coordinate, result.name, country),
            None => Location::new(coordinate, result.name),
        })
    }
}

/// Open-Meteo geocoding client
#[derive(Clone)]
pub struct OpenMeteoGeocoder {
    client: ProviderClient,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(client: ProviderClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?name={}&count=1&language=en&format=json",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn locate(&self, query: &str) -> Result<Location> {
        info!("Geocoding location: '{query}'");
        let response: GeocodingResponse =
            http::get_json(&self.client, PROVIDER, &self.search_url(query)).await?;
        response.first_location(query)
    }
}

/// Turns user input into a concrete location
pub struct LocationResolver<G> {
    geocoder: G,
}

impl<G: Geocoder> LocationResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self { geocoder }
    }

    /// Resolve a location input into a structured Location
    pub async fn resolve(&self, input: LocationInput) -> Result<Location> {
        debug!("Resolving location input: {:?}", input);

        let location = match input {
            LocationInput::Coordinates(lat, lon) => {
                Location::from_coordinate(Coordinate::new(lat, lon)?)
            }
            LocationInput::Name(name) => self.geocoder.locate(&name).await?,
        };

        debug!(
            "Resolved location: {} at ({:.4}, {:.4})",
            location.name, location.coordinate.latitude, location.coordinate.longitude
        );

        Ok(location)
    }
}
