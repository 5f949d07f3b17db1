//! `AgriSense` - climate-driven crop advice for farmers
//!
//! This library aggregates historical NASA POWER climate data for a
//! location, matches it against a crop catalog, and derives irrigation
//! and flood guidance from recent observations.

pub mod advisor;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod climate;
pub mod config;
pub mod error;
pub mod flood;
pub mod geocoding;
pub mod http;
pub mod irrigation;
pub mod models;
pub mod recommend;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use advisor::{CropAdvice, CropAdvisor, RequestTracker, SummarySource, Tracked};
pub use catalog::CropCatalog;
pub use climate::{ClimateAggregator, ClimateProvider, PowerClient, TemperatureSource};
pub use config::AgriConfig;
pub use error::AgriError;
pub use flood::{FloodAssessment, FloodMonitor, FloodProvider};
pub use geocoding::{Geocoder, LocationInput, LocationParser, LocationResolver};
pub use irrigation::{IrrigationAdvisor, IrrigationPlan, IrrigationStatus};
pub use models::{ClimateSummary, Coordinate, CropProfile, Location, YearRange};
pub use recommend::recommend;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AgriError>;
