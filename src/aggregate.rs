//! Forecast aggregation
//!
//! Fetches every enabled source concurrently, converts series into the
//! preferred units and resamples them onto one regular time grid. Sources that
//! fail are recorded on the forecast instead of aborting the run.

use crate::bodies::{self, Body};
use crate::cache::PersistentCache;
use crate::config::ForecastConfig;
use crate::models::{DataSource, Forecast, Location, Parameter, Sample, SourceFailure, TimeGrid, TimeSeries, TimeWindow};
use crate::sources::rdps::GridSettings;
use crate::sources::{
    ForecastSource, KpSource, NwsSource, RdpsAstroSource, RdpsMetSource, SourceData, build_client,
};
use crate::units::{TemperatureUnit, Unit, WindUnit};
use crate::ForecastError;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one source fetch, kept with the source's identity
struct Fetched {
    source: DataSource,
    location_dependent: bool,
    result: Result<SourceData, ForecastError>,
}

/// Builds forecasts from a fixed set of sources
pub struct ForecastService {
    sources: Vec<Arc<dyn ForecastSource>>,
    /// Consulted only when no primary source delivered cloud cover
    cloud_fallback: Option<Arc<dyn ForecastSource>>,
    temperature_unit: TemperatureUnit,
    wind_unit: WindUnit,
    step: Duration,
}

impl ForecastService {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn ForecastSource>>, temperature_unit: TemperatureUnit, wind_unit: WindUnit) -> Self {
        Self {
            sources,
            cloud_fallback: None,
            temperature_unit,
            wind_unit,
            step: Duration::hours(1),
        }
    }

    #[must_use]
    pub fn with_cloud_fallback(mut self, source: Arc<dyn ForecastSource>) -> Self {
        self.cloud_fallback = Some(source);
        self
    }

    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Wire up the sources enabled in `config`; `use_cache` false bypasses the response cache
    pub fn from_config(config: &ForecastConfig, use_cache: bool) -> Result<Self, ForecastError> {
        let settings = &config.sources;
        let client = build_client(settings)?;
        let cache = if use_cache && config.cache.enabled {
            match PersistentCache::open(config.cache_dir().join("responses")) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!(error = %e, "Response cache unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };
        let ttl = std::time::Duration::from_secs(u64::from(config.cache.ttl_minutes) * 60);
        let points_ttl = std::time::Duration::from_secs(u64::from(config.cache.points_ttl_hours) * 3600);

        let grid_settings = |url: &str, product: &str| GridSettings {
            concurrency: settings.download_concurrency,
            max_distance_km: settings.max_grid_distance_km,
            ..GridSettings::new(url, config.grib_dir(product))
        };

        let mut sources: Vec<Arc<dyn ForecastSource>> = Vec::new();
        let rdps_met = settings
            .enable_rdps_met
            .then(|| Arc::new(RdpsMetSource::new(client.clone(), grid_settings(&settings.rdps_met_url, "met"))) as Arc<dyn ForecastSource>);
        // the preferred met source goes first so its cloud cover wins
        if config.prefers_rdps_met() {
            if let Some(met) = &rdps_met {
                sources.push(Arc::clone(met));
            }
        }
        if settings.enable_nws {
            let mut nws = NwsSource::new(client.clone(), &settings.nws_base_url);
            if let Some(cache) = &cache {
                nws = nws.with_cache(cache.clone(), ttl, points_ttl);
            }
            sources.push(Arc::new(nws));
        }
        if settings.enable_kp {
            let mut kp = KpSource::new(client.clone(), &settings.kp_observed_url, &settings.kp_forecast_url);
            if let Some(cache) = &cache {
                kp = kp.with_cache(cache.clone(), ttl);
            }
            sources.push(Arc::new(kp));
        }
        if settings.enable_rdps_astro {
            sources.push(Arc::new(RdpsAstroSource::new(
                client.clone(),
                grid_settings(&settings.rdps_astro_url, "astro"),
            )));
        }

        let mut service = Self::new(sources, config.temperature_unit()?, config.wind_unit()?)
            .with_step(Duration::minutes(i64::from(config.forecast.step_minutes)));
        if !config.prefers_rdps_met() {
            if let Some(met) = rdps_met {
                service = service.with_cloud_fallback(met);
            }
        }
        Ok(service)
    }

    async fn fetch_all(
        sources: &[Arc<dyn ForecastSource>],
        location: &Location,
        window: &TimeWindow,
    ) -> Vec<Fetched> {
        join_all(sources.iter().map(|source| async move {
            Fetched {
                source: source.source(),
                location_dependent: source.location_dependent(),
                result: source.fetch(location, window).await,
            }
        }))
        .await
    }

    /// Fetch, align and assemble the forecast for `window`
    pub async fn build(&self, location: &Location, window: TimeWindow, now: DateTime<Utc>) -> Result<Forecast, ForecastError> {
        info!(
            location = %location.format_hemispheres(),
            sources = self.sources.len(),
            hours = window.duration().num_hours(),
            "Building forecast"
        );
        let grid = window.grid(self.step);
        let mut forecast = Forecast::new(location.clone(), window, now, bodies::moon_phase(now));

        let mut fetched = Self::fetch_all(&self.sources, location, &window).await;
        self.absorb(&mut forecast, &grid, &mut fetched);

        if !forecast.has(Parameter::CloudCover) {
            if let Some(fallback) = &self.cloud_fallback {
                info!(source = %fallback.source(), "No cloud cover from primary sources, trying fallback");
                let mut second = Self::fetch_all(std::slice::from_ref(fallback), location, &window).await;
                self.absorb(&mut forecast, &grid, &mut second);
                fetched.extend(second);
            }
        }

        ensure_location_supported(&fetched, location)?;

        for series in ephemeris_series(location, &grid) {
            forecast.insert(series);
        }
        info!(
            parameters = forecast.series.len(),
            failures = forecast.failures.len(),
            "Forecast assembled"
        );
        Ok(forecast)
    }

    /// Move results into the forecast: series are aligned, failures recorded
    fn absorb(&self, forecast: &mut Forecast, grid: &TimeGrid, fetched: &mut [Fetched]) {
        for outcome in fetched.iter_mut() {
            match &mut outcome.result {
                Ok(data) => {
                    for series in std::mem::take(&mut data.series) {
                        let aligned = self.convert_units(&series).resample(grid);
                        if aligned.is_empty() {
                            debug!(parameter = %series.parameter.display_name(), source = %series.source, "No samples inside the window");
                            continue;
                        }
                        forecast.insert(aligned);
                    }
                }
                Err(e) => {
                    warn!(source = %outcome.source, error = %e, "Source failed");
                    forecast.record_failure(SourceFailure {
                        source: outcome.source,
                        message: e.user_message(),
                        unsupported: e.is_unsupported_location(),
                    });
                }
            }
        }
    }

    /// Express temperature and wind series in the preferred units
    #[must_use]
    pub fn convert_units(&self, series: &TimeSeries) -> TimeSeries {
        if let Some(from) = series.unit.temperature() {
            let to = self.temperature_unit;
            return series.map_values(Unit::from(to), |v| to.convert_from(v, from));
        }
        if let Some(from) = series.unit.wind() {
            let to = self.wind_unit;
            return series.map_values(Unit::from(to), |v| to.convert_from(v, from));
        }
        series.clone()
    }
}

/// Fail when no location-dependent source succeeded and every one of them reported the location unsupported
fn ensure_location_supported(fetched: &[Fetched], location: &Location) -> Result<(), ForecastError> {
    let local: Vec<&Fetched> = fetched.iter().filter(|f| f.location_dependent).collect();
    if local.is_empty() {
        return Ok(());
    }
    let all_unsupported = local
        .iter()
        .all(|f| matches!(&f.result, Err(e) if e.is_unsupported_location()));
    if all_unsupported {
        return Err(ForecastError::unsupported_location(format!(
            "no forecast source covers {}",
            location.format_hemispheres()
        )));
    }
    Ok(())
}

/// Sun and moon altitude and lunar illumination on the grid
#[must_use]
pub fn ephemeris_series(location: &Location, grid: &TimeGrid) -> Vec<TimeSeries> {
    let mut sun = Vec::with_capacity(grid.len());
    let mut moon = Vec::with_capacity(grid.len());
    let mut illumination = Vec::with_capacity(grid.len());
    for t in grid.points() {
        sun.push(Sample::at(t, bodies::altitude(Body::Sun, t, location)));
        moon.push(Sample::at(t, bodies::altitude(Body::Moon, t, location)));
        illumination.push(Sample::at(t, bodies::moon_phase(t).illumination_percent()));
    }
    vec![
        TimeSeries::new(Parameter::SunAltitude, Unit::Degrees, DataSource::Ephemeris, sun),
        TimeSeries::new(Parameter::MoonAltitude, Unit::Degrees, DataSource::Ephemeris, moon),
        TimeSeries::new(Parameter::LunarIllumination, Unit::Percent, DataSource::Ephemeris, illumination),
    ]
}
