//! Rule-based crop recommendation
//!
//! A crop is recommended when the observed temperature and the yearly
//! rainfall estimate both fall inside its envelope and the soil holds
//! enough moisture to establish any crop at all.

use tracing::debug;

use crate::catalog::CropCatalog;
use crate::models::{ClimateSummary, CropProfile};

/// Minimum average root-zone wetness for any recommendation
pub const MIN_SOIL_MOISTURE: f64 = 0.2;

/// Scales the per-year rainfall average to the yearly figure crop envelopes use
pub const RAINFALL_SCALE: f64 = 12.0;

/// Rainfall figure compared against crop envelopes
#[must_use]
pub fn yearly_rainfall(summary: &ClimateSummary) -> f64 {
    summary.avg_rainfall * RAINFALL_SCALE
}

/// Whether `crop` suits the climate described by `summary`
#[must_use]
pub fn is_suitable(crop: &CropProfile, summary: &ClimateSummary) -> bool {
    crop.accepts_temperature(summary.avg_temperature)
        && crop.accepts_rainfall(yearly_rainfall(summary))
        && summary.avg_soil_moisture >= MIN_SOIL_MOISTURE
}

/// Crops suited to `summary`, in catalog order.
///
/// An absent summary yields an empty list.
#[must_use]
pub fn recommend<'a>(
    summary: Option<&ClimateSummary>,
    catalog: &'a CropCatalog,
) -> Vec<&'a CropProfile> {
    let Some(summary) = summary else {
        return Vec::new();
    };

    let suitable: Vec<&CropProfile> = catalog
        .crops()
        .iter()
        .filter(|crop| is_suitable(crop, summary))
        .collect();

    debug!(
        "{} of {} crops suit temperature {:.1}°C, yearly rainfall {:.1} mm, moisture {:.2}",
        suitable.len(),
        catalog.len(),
        summary.avg_temperature,
        yearly_rainfall(summary),
        summary.avg_soil_moisture
    );

    suitable
}
