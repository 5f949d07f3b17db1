//! Data models for `AgriSense`
//!
//! - Location: coordinates and geocoded place metadata
//! - Climate: provider samples, year ranges and the three-scalar summary
//! - Crop: catalog entries used by the recommendation engine

pub mod climate;
pub mod crop;
pub mod location;

pub use climate::{ClimateSample, ClimateSummary, YearMonth, YearRange};
pub use crop::{CropProfile, Season};
pub use location::{Coordinate, Location};
