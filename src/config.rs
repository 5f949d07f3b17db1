//! Configuration management for `AgriSense`
//!
//! Handles loading configuration from a TOML file and `AGRISENSE__*`
//! environment variables, and validates every setting before use.

use crate::AgriError;
use crate::models::{ClimateSummary, YearRange};
use anyhow::{Context, Result};
use chrono::Datelike;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// First year covered by the climate provider's records
const FIRST_DATA_YEAR: i32 = 1981;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgriConfig {
    /// External data providers
    pub providers: ProviderConfig,
    /// Climate aggregation window and fallback values
    pub climate: ClimateConfig,
    /// Crop catalog source
    pub catalog: CatalogConfig,
    /// Irrigation advice parameters
    pub irrigation: IrrigationConfig,
    /// Flood alert parameters
    pub flood: FloodConfig,
    /// Summary cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP API configuration
    pub web: WebConfig,
}

/// Provider endpoints and HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// NASA POWER API base URL
    pub power_base_url: String,
    /// Open-Meteo geocoding base URL
    pub geocoding_base_url: String,
    /// Open-Meteo flood API base URL
    pub flood_base_url: String,
    /// Timeout for a single attempt in seconds
    pub timeout_seconds: u32,
    /// Upper bound in seconds on a whole provider call, retries and backoff
    /// included
    pub total_timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
}

/// Climate aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    /// First year of the historical window (inclusive)
    pub start_year: i32,
    /// Last year of the historical window (inclusive)
    pub end_year: i32,
    /// Temperature used when temperature is not measured
    pub assumed_temperature_c: f64,
    /// Average monthly T2M readings instead of the assumed temperature
    pub measure_temperature: bool,
    /// Summary substituted when aggregation fails
    pub fallback: FallbackConfig,
}

/// Degraded summary used when the climate provider fails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub avg_temperature: f64,
    pub avg_rainfall: f64,
    pub avg_soil_moisture: f64,
}

/// Crop catalog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON file replacing the builtin catalog
    pub path: Option<String>,
}

/// Irrigation advice settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrigationConfig {
    /// Crop water requirement in mm/day
    pub optimal_mm_per_day: f64,
    /// Number of past days averaged
    pub window_days: u32,
}

/// Flood alert settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    /// River discharge (m³/s) at which a warning is raised
    pub discharge_threshold: f64,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to always query the provider
    pub enabled: bool,
    /// Cache TTL in hours
    pub ttl_hours: u32,
    /// Cache directory location
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub port: u16,
}

// Default value functions
fn default_power_base_url() -> String {
    "https://power.larc.nasa.gov/api".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_flood_base_url() -> String {
    "https://flood-api.open-meteo.com/v1".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_total_timeout() -> u32 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_start_year() -> i32 {
    2020
}

fn default_end_year() -> i32 {
    2022
}

fn default_temperature() -> f64 {
    25.0
}

fn default_fallback_rainfall() -> f64 {
    100.0
}

fn default_fallback_moisture() -> f64 {
    0.5
}

fn default_optimal_mm_per_day() -> f64 {
    6.0
}

fn default_window_days() -> u32 {
    7
}

fn default_discharge_threshold() -> f64 {
    20.0
}

fn default_cache_ttl() -> u32 {
    24 * 7
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("agrisense").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".agrisense-cache".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            power_base_url: default_power_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            flood_base_url: default_flood_base_url(),
            timeout_seconds: default_timeout(),
            total_timeout_seconds: default_total_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            assumed_temperature_c: default_temperature(),
            measure_temperature: false,
            fallback: FallbackConfig::default(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            avg_temperature: default_temperature(),
            avg_rainfall: default_fallback_rainfall(),
            avg_soil_moisture: default_fallback_moisture(),
        }
    }
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        Self {
            optimal_mm_per_day: default_optimal_mm_per_day(),
            window_days: default_window_days(),
        }
    }
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            discharge_threshold: default_discharge_threshold(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl ClimateConfig {
    /// Historical window as a validated range
    pub fn year_range(&self) -> crate::Result<YearRange> {
        YearRange::new(self.start_year, self.end_year)
    }
}

impl FallbackConfig {
    #[must_use]
    pub fn summary(&self) -> ClimateSummary {
        ClimateSummary {
            avg_temperature: self.avg_temperature,
            avg_rainfall: self.avg_rainfall,
            avg_soil_moisture: self.avg_soil_moisture,
        }
    }
}

impl AgriConfig {
    /// Load configuration from the default file location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("agrisense.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // AGRISENSE__CLIMATE__START_YEAR=2019 and friends
        builder = builder.add_source(
            Environment::with_prefix("AGRISENSE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AgriConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agrisense").join("config.toml"))
    }

    /// Apply default values to fields left empty or zero
    pub fn apply_defaults(&mut self) {
        if self.providers.power_base_url.is_empty() {
            self.providers.power_base_url = default_power_base_url();
        }
        if self.providers.geocoding_base_url.is_empty() {
            self.providers.geocoding_base_url = default_geocoding_base_url();
        }
        if self.providers.flood_base_url.is_empty() {
            self.providers.flood_base_url = default_flood_base_url();
        }
        if self.providers.timeout_seconds == 0 {
            self.providers.timeout_seconds = default_timeout();
        }
        if self.providers.total_timeout_seconds == 0 {
            self.providers.total_timeout_seconds = default_total_timeout();
        }
        if self.irrigation.window_days == 0 {
            self.irrigation.window_days = default_window_days();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.web.port == 0 {
            self.web.port = default_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.providers.timeout_seconds > 300 {
            return Err(AgriError::config("Provider timeout cannot exceed 300 seconds").into());
        }
        if self.providers.total_timeout_seconds > 300 {
            return Err(
                AgriError::config("Provider total timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.providers.max_retries > 10 {
            return Err(AgriError::config("Provider max retries cannot exceed 10").into());
        }

        self.climate
            .year_range()
            .map_err(|e| AgriError::config(e.to_string()))?;
        let latest_year = chrono::Utc::now().year();
        if self.climate.start_year < FIRST_DATA_YEAR || self.climate.end_year > latest_year {
            return Err(AgriError::config(format!(
                "Climate years must lie between {FIRST_DATA_YEAR} and {latest_year}"
            ))
            .into());
        }

        let fallback = &self.climate.fallback;
        if !(0.0..=1.0).contains(&fallback.avg_soil_moisture) {
            return Err(AgriError::config(
                "Fallback soil moisture must be between 0 and 1",
            )
            .into());
        }
        if !fallback.avg_rainfall.is_finite() || fallback.avg_rainfall < 0.0 {
            return Err(AgriError::config("Fallback rainfall must be a non-negative number").into());
        }
        if !fallback.avg_temperature.is_finite() || !self.climate.assumed_temperature_c.is_finite()
        {
            return Err(AgriError::config("Temperatures must be finite numbers").into());
        }

        if self.irrigation.optimal_mm_per_day <= 0.0 {
            return Err(AgriError::config("Optimal irrigation must be positive").into());
        }

        if self.irrigation.window_days > 90 {
            return Err(AgriError::config("Irrigation window cannot exceed 90 days").into());
        }

        if self.flood.discharge_threshold <= 0.0 {
            return Err(AgriError::config("Flood discharge threshold must be positive").into());
        }

        if self.cache.ttl_hours > 24 * 365 {
            return Err(AgriError::config("Cache TTL cannot exceed one year").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AgriError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AgriError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("power_base_url", &self.providers.power_base_url),
            ("geocoding_base_url", &self.providers.geocoding_base_url),
            ("flood_base_url", &self.providers.flood_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AgriError::config(format!(
                    "Provider {name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = AgriConfig::default();
        assert_eq!(config.providers.power_base_url, "https://power.larc.nasa.gov/api");
        assert_eq!(config.providers.timeout_seconds, 10);
        assert_eq!(config.providers.total_timeout_seconds, 15);
        assert_eq!(config.climate.start_year, 2020);
        assert_eq!(config.climate.end_year, 2022);
        assert_eq!(config.climate.assumed_temperature_c, 25.0);
        assert!(!config.climate.measure_temperature);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.flood.discharge_threshold, 20.0);
        assert!(config.catalog.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fallback_summary_defaults() {
        let summary = AgriConfig::default().climate.fallback.summary();
        assert_eq!(summary.avg_temperature, 25.0);
        assert_eq!(summary.avg_rainfall, 100.0);
        assert_eq!(summary.avg_soil_moisture, 0.5);
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AgriConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = AgriConfig::default();
        config.providers.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_reversed_years() {
        let mut config = AgriConfig::default();
        config.climate.start_year = 2023;
        config.climate.end_year = 2020;
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(i32::MIN, 2022)]
    #[case(1950, 2022)]
    #[case(2020, i32::MAX)]
    #[case(2020, 9999)]
    fn test_config_validation_years_outside_data_span(#[case] start: i32, #[case] end: i32) {
        let mut config = AgriConfig::default();
        config.climate.start_year = start;
        config.climate.end_year = end;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must lie between"));
    }

    #[test]
    fn test_config_validation_earliest_data_year() {
        let mut config = AgriConfig::default();
        config.climate.start_year = 1981;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_total_timeout() {
        let mut config = AgriConfig::default();
        config.providers.total_timeout_seconds = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_fallback_moisture() {
        let mut config = AgriConfig::default();
        config.climate.fallback.avg_soil_moisture = 1.5;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("soil moisture"));
    }

    #[test]
    fn test_config_validation_provider_url() {
        let mut config = AgriConfig::default();
        config.providers.flood_base_url = "ftp://example.org".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("flood_base_url"));
    }

    #[test]
    fn test_apply_defaults_fills_empty_values() {
        let mut config = AgriConfig::default();
        config.providers.geocoding_base_url.clear();
        config.logging.format.clear();
        config.web.port = 0;
        config.apply_defaults();
        assert_eq!(
            config.providers.geocoding_base_url,
            "https://geocoding-api.open-meteo.com/v1"
        );
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("agrisense-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[climate]\nstart_year = 2018\nend_year = 2019\n\n[flood]\ndischarge_threshold = 35.5\n",
        )
        .unwrap();

        let config = AgriConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.climate.start_year, 2018);
        assert_eq!(config.climate.end_year, 2019);
        assert_eq!(config.flood.discharge_threshold, 35.5);
        assert_eq!(config.irrigation.window_days, 7);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = AgriConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("agrisense"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
