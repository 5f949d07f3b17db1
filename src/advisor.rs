//! Crop advice for a location
//!
//! Ties the pieces together: resolve the location, obtain a climate
//! summary (cache, provider, or the configured estimate when the provider
//! fails) and filter the catalog against it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::cache::{self, PersistentCache};
use crate::catalog::CropCatalog;
use crate::climate::{ClimateAggregator, ClimateProvider};
use crate::geocoding::{Geocoder, LocationInput, LocationResolver};
use crate::models::{ClimateSummary, Coordinate, CropProfile, Location, YearRange};
use crate::recommend::{recommend, yearly_rainfall};

/// Where the summary behind an advice came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SummarySource {
    /// Freshly aggregated from the climate provider
    Measured,
    /// Served from the summary cache
    Cached,
    /// Fallback values used because aggregation failed
    Estimated { reason: String },
}

/// Crop recommendations for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropAdvice {
    pub location: Location,
    pub years: YearRange,
    pub summary: ClimateSummary,
    pub source: SummarySource,
    /// Rainfall figure the crops were matched against, mm
    pub yearly_rainfall: f64,
    pub crops: Vec<CropProfile>,
}

impl CropAdvice {
    #[must_use]
    pub fn is_estimated(&self) -> bool {
        matches!(self.source, SummarySource::Estimated { .. })
    }
}

/// Generation counter used to drop answers to superseded requests
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: AtomicU64,
}

/// Generation a request was started under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

impl RequestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding every earlier one
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no request was started after `ticket`
    #[must_use]
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

/// Outcome of a tracked request
#[derive(Debug, Clone, PartialEq)]
pub enum Tracked<T> {
    Current(T),
    /// A newer request was started before this one finished
    Superseded,
}

pub struct CropAdvisor<P, G> {
    aggregator: ClimateAggregator<P>,
    resolver: LocationResolver<G>,
    catalog: Arc<CropCatalog>,
    years: YearRange,
    fallback: ClimateSummary,
    cache: Option<PersistentCache>,
    cache_ttl: Duration,
}

impl<P: ClimateProvider, G: Geocoder> CropAdvisor<P, G> {
    pub fn new(
        aggregator: ClimateAggregator<P>,
        resolver: LocationResolver<G>,
        catalog: Arc<CropCatalog>,
        years: YearRange,
        fallback: ClimateSummary,
    ) -> Self {
        Self {
            aggregator,
            resolver,
            catalog,
            years,
            fallback,
            cache: None,
            cache_ttl: Duration::ZERO,
        }
    }

    /// Keep measured summaries in `cache` for roughly `ttl`
    #[must_use]
    pub fn with_cache(mut self, cache: PersistentCache, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn aggregator(&self) -> &ClimateAggregator<P> {
        &self.aggregator
    }

    #[must_use]
    pub fn catalog(&self) -> &CropCatalog {
        &self.catalog
    }

    /// Resolve `input` and advise on crops for it.
    ///
    /// Only location resolution can fail; climate failures degrade to the
    /// estimated summary.
    #[instrument(skip(self))]
    pub async fn advise(&self, input: LocationInput) -> Result<CropAdvice> {
        let location = self.resolver.resolve(input).await?;
        Ok(self.advise_location(location).await)
    }

    /// Advise on crops for an already resolved location
    pub async fn advise_location(&self, location: Location) -> CropAdvice {
        let (summary, source) = self.summary_for(location.coordinate).await;

        let crops: Vec<CropProfile> = recommend(Some(&summary), &self.catalog)
            .into_iter()
            .cloned()
            .collect();

        info!(
            "{} crops recommended for {} ({:?})",
            crops.len(),
            location.display_name(),
            source
        );

        CropAdvice {
            location,
            years: self.years,
            yearly_rainfall: yearly_rainfall(&summary),
            summary,
            source,
            crops,
        }
    }

    /// Like [`advise`](Self::advise), but the result is dropped if another
    /// request was started on `tracker` in the meantime.
    pub async fn advise_latest(
        &self,
        tracker: &RequestTracker,
        input: LocationInput,
    ) -> Result<Tracked<CropAdvice>> {
        let ticket = tracker.begin();
        let result = self.advise(input).await;

        if !tracker.is_current(ticket) {
            debug!("Discarding superseded advice {:?}", ticket);
            return Ok(Tracked::Superseded);
        }
        result.map(Tracked::Current)
    }

    async fn summary_for(&self, coordinate: Coordinate) -> (ClimateSummary, SummarySource) {
        let key = cache::summary_key(&coordinate, self.years, self.aggregator.temperature());

        if let Some(cache) = &self.cache {
            match cache.get::<ClimateSummary>(&key).await {
                Ok(Some(summary)) => {
                    debug!("Using cached climate summary for {key}");
                    return (summary, SummarySource::Cached);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read climate cache: {e}"),
            }
        }

        match self.aggregator.summarize(coordinate, self.years).await {
            Ok(summary) => {
                if let Some(cache) = &self.cache {
                    let ttl = cache::jittered(self.cache_ttl);
                    if let Err(e) = cache.put(&key, summary, ttl).await {
                        warn!("Failed to cache climate summary: {e}");
                    }
                }
                (summary, SummarySource::Measured)
            }
            Err(e) => {
                warn!(
                    "Climate aggregation failed for {}, using estimated values: {e}",
                    coordinate.format()
                );
                (
                    self.fallback,
                    SummarySource::Estimated {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }
}
