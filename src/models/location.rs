//! Coordinate and location models

use serde::{Deserialize, Serialize};

use crate::{AgriError, Result};

/// A validated latitude/longitude pair in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AgriError::location_unavailable(format!(
                "Latitude must be between -90 and 90, got: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AgriError::location_unavailable(format!(
                "Longitude must be between -180 and 180, got: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Re-check the invariants of a coordinate built field by field
    pub fn validated(self) -> Result<Self> {
        Self::new(self.latitude, self.longitude)
    }

    /// Format as `lat, lon` with four decimals
    #[must_use]
    pub fn format(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }
}

/// A coordinate with a human-readable name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub coordinate: Coordinate,
    /// Location name (city, region, or the formatted coordinates)
    pub name: String,
    pub country: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(coordinate: Coordinate, name: String) -> Self {
        Self {
            coordinate,
            name,
            country: None,
        }
    }

    #[must_use]
    pub fn with_country(coordinate: Coordinate, name: String, country: String) -> Self {
        Self {
            coordinate,
            name,
            country: Some(country),
        }
    }

    /// Location named after its own coordinates
    #[must_use]
    pub fn from_coordinate(coordinate: Coordinate) -> Self {
        Self::new(coordinate, coordinate.format())
    }

    /// `Name, Country` or just the name
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.country {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(-6.2, 106.8)]
    fn test_valid_coordinates(#[case] lat: f64, #[case] lon: f64) {
        let coordinate = Coordinate::new(lat, lon).unwrap();
        assert_eq!(coordinate.latitude, lat);
        assert_eq!(coordinate.longitude, lon);
    }

    #[rstest]
    #[case(90.1, 0.0)]
    #[case(-91.0, 0.0)]
    #[case(0.0, 180.5)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn test_invalid_coordinates(#[case] lat: f64, #[case] lon: f64) {
        let err = Coordinate::new(lat, lon).unwrap_err();
        assert!(matches!(err, AgriError::LocationUnavailable { .. }));
    }

    #[test]
    fn test_rounded_coordinates() {
        let coordinate = Coordinate::new(46.818_234, 8.227_456).unwrap();
        assert_eq!(coordinate.rounded(2), (46.82, 8.23));
    }

    #[test]
    fn test_location_from_coordinate() {
        let location = Location::from_coordinate(Coordinate::new(46.8182, 8.2275).unwrap());
        assert_eq!(location.name, "46.8182, 8.2275");
        assert_eq!(location.display_name(), "46.8182, 8.2275");
    }

    #[test]
    fn test_display_name_with_country() {
        let location = Location::with_country(
            Coordinate::new(28.61, 77.21).unwrap(),
            "New Delhi".to_string(),
            "India".to_string(),
        );
        assert_eq!(location.display_name(), "New Delhi, India");
    }
}
