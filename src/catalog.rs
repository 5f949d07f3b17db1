//! Crop catalog: the immutable reference table the recommendation engine
//! evaluates. Loaded once at start-up and shared read-only.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::models::CropProfile;
use crate::{AgriError, Result};

const BUILTIN_CATALOG: &str = include_str!("data/crop_catalog.json");

/// Ordered, validated set of crop profiles
#[derive(Debug, Clone, PartialEq)]
pub struct CropCatalog {
    crops: Vec<CropProfile>,
}

impl CropCatalog {
    /// The catalog shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Load the catalog from `path`, or the builtin one when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading crop catalog from {}", path.display());
                let contents = std::fs::read_to_string(path)?;
                Self::from_json(&contents)
            }
            None => Self::builtin(),
        }
    }

    /// Parse a JSON array of crop profiles
    pub fn from_json(json: &str) -> Result<Self> {
        let crops: Vec<CropProfile> = serde_json::from_str(json)
            .map_err(|e| AgriError::catalog(format!("Failed to parse catalog: {e}")))?;
        Self::new(crops)
    }

    /// Build a non-empty catalog, enforcing the range and naming invariants
    pub fn new(crops: Vec<CropProfile>) -> Result<Self> {
        let mut seen = HashSet::new();

        for crop in &crops {
            if crop.name.trim().is_empty() {
                return Err(AgriError::catalog("Crop name cannot be empty"));
            }
            if !seen.insert(crop.name.as_str()) {
                return Err(AgriError::catalog(format!("Duplicate crop '{}'", crop.name)));
            }
            let bounds = [
                crop.min_temp,
                crop.max_temp,
                crop.min_rainfall,
                crop.max_rainfall,
            ];
            if bounds.iter().any(|b| !b.is_finite()) {
                return Err(AgriError::catalog(format!(
                    "Crop '{}' has non-finite bounds",
                    crop.name
                )));
            }
            if crop.min_temp > crop.max_temp {
                return Err(AgriError::catalog(format!(
                    "Crop '{}': minTemp {} exceeds maxTemp {}",
                    crop.name, crop.min_temp, crop.max_temp
                )));
            }
            if crop.min_rainfall > crop.max_rainfall {
                return Err(AgriError::catalog(format!(
                    "Crop '{}': minRainfall {} exceeds maxRainfall {}",
                    crop.name, crop.min_rainfall, crop.max_rainfall
                )));
            }
        }

        let catalog = Self { crops };
        if catalog.is_empty() {
            return Err(AgriError::catalog("Catalog holds no crops"));
        }
        debug!("Crop catalog loaded with {} entries", catalog.len());
        Ok(catalog)
    }

    /// Profiles in catalog order
    #[must_use]
    pub fn crops(&self) -> &[CropProfile] {
        &self.crops
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CropProfile> {
        self.crops.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.crops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }
}
