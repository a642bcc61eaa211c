//! National Weather Service gridpoint forecast
//!
//! `GET /points/{lat},{lon}` resolves the forecast office grid, then
//! `forecastGridData` returns one layer per parameter. Layer values are
//! interval-valued: `validTime` is an ISO-8601 start and duration.

use super::{ForecastSource, SourceData, cached, send};
use crate::ForecastError;
use crate::cache::PersistentCache;
use crate::models::{DataSource, Location, Parameter, Sample, TimeSeries, TimeWindow};
use crate::units::Unit;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

static ISO_DURATION: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
});

/// Grid metadata returned by the points endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub forecast_grid_data: String,
    pub time_zone: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiPoints {
    properties: ApiPointsProperties,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiPointsProperties {
    forecast_grid_data: Option<String>,
    time_zone: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiGridpoint {
    properties: ApiGridProperties,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiGridProperties {
    sky_cover: Option<ApiLayer>,
    probability_of_precipitation: Option<ApiLayer>,
    temperature: Option<ApiLayer>,
    dewpoint: Option<ApiLayer>,
    wind_speed: Option<ApiLayer>,
    wind_gust: Option<ApiLayer>,
    wind_direction: Option<ApiLayer>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiLayer {
    uom: Option<String>,
    #[serde(default)]
    values: Vec<ApiValue>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiValue {
    valid_time: String,
    value: Option<f64>,
}

/// Parse an ISO-8601 duration such as `PT1H`, `P1DT6H` or `PT30M`
pub fn parse_iso_duration(text: &str) -> Result<Duration, ForecastError> {
    let re = ISO_DURATION
        .as_ref()
        .map_err(|e| ForecastError::parse(e.to_string()))?;
    let invalid = || ForecastError::parse(format!("Invalid ISO-8601 duration: {text}"));
    let caps = re.captures(text.trim()).ok_or_else(invalid)?;

    let mut seconds = 0_i64;
    let mut any = false;
    for (group, unit_seconds) in [(1, 604_800), (2, 86_400), (3, 3_600), (4, 60), (5, 1)] {
        if let Some(m) = caps.get(group) {
            let n: i64 = m.as_str().parse().map_err(|_| invalid())?;
            seconds += n * unit_seconds;
            any = true;
        }
    }
    if !any {
        return Err(invalid());
    }
    Ok(Duration::seconds(seconds))
}

/// Parse a `validTime` interval, e.g. `2024-03-01T10:00:00+00:00/PT2H`
pub fn parse_valid_time(text: &str) -> Result<(DateTime<Utc>, Duration), ForecastError> {
    let (start, duration) = text
        .split_once('/')
        .ok_or_else(|| ForecastError::parse(format!("Invalid validTime interval: {text}")))?;
    let start = DateTime::parse_from_rfc3339(start)
        .map_err(|e| ForecastError::parse(format!("Invalid validTime start {start}: {e}")))?
        .with_timezone(&Utc);
    Ok((start, parse_iso_duration(duration)?))
}

/// Parse the points response into grid metadata
pub fn parse_points(body: &str) -> Result<GridPoint, ForecastError> {
    let points: ApiPoints = serde_json::from_str(body)
        .map_err(|e| ForecastError::parse(format!("Invalid NWS points response: {e}")))?;
    let forecast_grid_data = points
        .properties
        .forecast_grid_data
        .ok_or_else(|| ForecastError::unsupported_location("NWS returned no forecast grid for this point"))?;
    Ok(GridPoint {
        forecast_grid_data,
        time_zone: points.properties.time_zone,
    })
}

fn parse_layer(parameter: Parameter, layer: &ApiLayer, code: &str, unit: Unit) -> Result<TimeSeries, ForecastError> {
    let scale = Unit::wmo_scale(code);

    let mut samples = Vec::with_capacity(layer.values.len());
    for value in &layer.values {
        let Some(v) = value.value else { continue };
        let (start, duration) = parse_valid_time(&value.valid_time)?;
        samples.push(Sample::interval(start, v * scale, duration));
    }
    Ok(TimeSeries::new(parameter, unit, DataSource::Nws, samples))
}

/// Parse a `forecastGridData` response into one series per parameter, in source units
pub fn parse_gridpoint(body: &str) -> Result<Vec<TimeSeries>, ForecastError> {
    let grid: ApiGridpoint = serde_json::from_str(body)
        .map_err(|e| ForecastError::parse(format!("Invalid NWS gridpoint response: {e}")))?;
    let p = grid.properties;
    let layers = [
        (Parameter::CloudCover, p.sky_cover, "wmoUnit:percent"),
        (Parameter::PrecipitationProbability, p.probability_of_precipitation, "wmoUnit:percent"),
        (Parameter::Temperature, p.temperature, "wmoUnit:degC"),
        (Parameter::Dewpoint, p.dewpoint, "wmoUnit:degC"),
        (Parameter::WindSpeed, p.wind_speed, "wmoUnit:km_h-1"),
        (Parameter::WindGust, p.wind_gust, "wmoUnit:km_h-1"),
        (Parameter::WindDirection, p.wind_direction, "wmoUnit:degree_(angle)"),
    ];

    let mut series = Vec::new();
    for (parameter, layer, default_unit) in layers {
        let Some(layer) = layer else {
            debug!(%parameter, "Layer missing from gridpoint response");
            continue;
        };
        let code = layer.uom.as_deref().unwrap_or(default_unit);
        let unit = match Unit::from_wmo(code) {
            Ok(unit) => unit,
            Err(e) => {
                warn!(%parameter, uom = code, error = %e, "Skipping layer in an unrecognised unit");
                continue;
            }
        };
        series.push(parse_layer(parameter, &layer, code, unit)?);
    }
    Ok(series)
}

/// NWS gridpoint forecast source
pub struct NwsSource {
    client: ClientWithMiddleware,
    base_url: String,
    cache: Option<PersistentCache>,
    ttl: std::time::Duration,
    points_ttl: std::time::Duration,
}

impl NwsSource {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: None,
            ttl: std::time::Duration::from_secs(30 * 60),
            points_ttl: std::time::Duration::from_secs(7 * 24 * 3600),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: PersistentCache, ttl: std::time::Duration, points_ttl: std::time::Duration) -> Self {
        self.cache = Some(cache);
        self.ttl = ttl;
        self.points_ttl = points_ttl;
        self
    }

    fn points_url(&self, location: &Location) -> String {
        // the API redirects requests with more than four decimals
        format!("{}/points/{:.4},{:.4}", self.base_url, location.latitude, location.longitude)
    }

    /// Resolve the gridpoint forecast URL for a location
    #[instrument(skip(self, location), fields(lat = location.latitude, lon = location.longitude))]
    pub async fn grid_point(&self, location: &Location) -> Result<GridPoint, ForecastError> {
        let url = self.points_url(location);
        cached(self.cache.as_ref(), &location.cache_key("nws:points"), self.points_ttl, || async {
            let response = send(&self.client, &url).await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(ForecastError::unsupported_location(format!(
                    "NWS has no forecast for {} (United States only)",
                    location.format_hemispheres()
                )));
            }
            if !status.is_success() {
                return Err(ForecastError::api(format!("{url} returned HTTP {status}")));
            }
            parse_points(&response.text().await?)
        })
        .await
    }

    async fn fetch_series(&self, location: &Location) -> Result<Vec<TimeSeries>, ForecastError> {
        let grid = self.grid_point(location).await?;
        debug!(url = %grid.forecast_grid_data, time_zone = ?grid.time_zone, "Resolved NWS grid");
        cached(self.cache.as_ref(), &location.cache_key("nws:grid"), self.ttl, || async {
            let body = super::get_text(&self.client, &grid.forecast_grid_data).await?;
            parse_gridpoint(&body)
        })
        .await
    }
}

#[async_trait]
impl ForecastSource for NwsSource {
    fn source(&self) -> DataSource {
        DataSource::Nws
    }

    #[instrument(name = "nws_fetch", skip_all)]
    async fn fetch(&self, location: &Location, _window: &TimeWindow) -> Result<SourceData, ForecastError> {
        let series = self.fetch_series(location).await?;
        info!(layers = series.len(), "NWS forecast retrieved");
        Ok(SourceData::new(DataSource::Nws, series))
    }
}
