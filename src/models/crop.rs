//! Crop profile model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Indian cropping season a crop is sown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    /// Monsoon season, sown June-July
    Kharif,
    /// Winter season, sown October-November
    Rabi,
    /// Short summer season between Rabi and Kharif
    Zaid,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Kharif => write!(f, "Kharif"),
            Season::Rabi => write!(f, "Rabi"),
            Season::Zaid => write!(f, "Zaid"),
        }
    }
}

/// Climate envelope and growing notes for one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropProfile {
    pub name: String,
    /// °C, inclusive
    pub min_temp: f64,
    /// °C, inclusive
    pub max_temp: f64,
    /// mm per year, inclusive
    pub min_rainfall: f64,
    /// mm per year, inclusive
    pub max_rainfall: f64,
    pub description: String,
    pub season: Season,
    pub tips: String,
}

impl CropProfile {
    #[must_use]
    pub fn accepts_temperature(&self, temperature: f64) -> bool {
        (self.min_temp..=self.max_temp).contains(&temperature)
    }

    #[must_use]
    pub fn accepts_rainfall(&self, yearly_rainfall: f64) -> bool {
        (self.min_rainfall..=self.max_rainfall).contains(&yearly_rainfall)
    }

    /// Format the temperature envelope with unit
    #[must_use]
    pub fn format_temperature_range(&self) -> String {
        format!("{}°C - {}°C", self.min_temp, self.max_temp)
    }

    /// Format the rainfall envelope with unit
    #[must_use]
    pub fn format_rainfall_range(&self) -> String {
        format!("{} - {} mm", self.min_rainfall, self.max_rainfall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rice() -> CropProfile {
        CropProfile {
            name: "rice".to_string(),
            min_temp: 20.0,
            max_temp: 35.0,
            min_rainfall: 1200.0,
            max_rainfall: 2400.0,
            description: "Staple grain crop, needs consistent water".to_string(),
            season: Season::Kharif,
            tips: "Plant in standing water, maintain water level".to_string(),
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let crop = rice();
        assert!(crop.accepts_temperature(20.0));
        assert!(crop.accepts_temperature(35.0));
        assert!(!crop.accepts_temperature(35.01));
        assert!(crop.accepts_rainfall(1200.0));
        assert!(crop.accepts_rainfall(2400.0));
        assert!(!crop.accepts_rainfall(1199.9));
    }

    #[test]
    fn test_nan_is_never_accepted() {
        let crop = rice();
        assert!(!crop.accepts_temperature(f64::NAN));
        assert!(!crop.accepts_rainfall(f64::NAN));
    }

    #[test]
    fn test_formatting() {
        let crop = rice();
        assert_eq!(crop.format_temperature_range(), "20°C - 35°C");
        assert_eq!(crop.format_rainfall_range(), "1200 - 2400 mm");
        assert_eq!(crop.season.to_string(), "Kharif");
    }
}
