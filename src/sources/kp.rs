//! Planetary K-index from NOAA SWPC
//!
//! Observed values come from the `noaa-planetary-k-index.json` product,
//! predictions from the "NOAA Kp index breakdown" table of the 3-day
//! forecast text product. Both are 3-hour bins.

use super::{ForecastSource, SourceData, cached, get_text};
use crate::ForecastError;
use crate::cache::PersistentCache;
use crate::models::{DataSource, Location, Parameter, Sample, TimeSeries, TimeWindow};
use crate::units::Unit;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::fmt;
use tracing::{info, instrument, warn};

/// Width of one Kp bin
pub const KP_BIN_HOURS: i64 = 3;
/// Observed history kept before the latest observation
const OBSERVED_HISTORY_DAYS: i64 = 2;

pub const SWPC_KP_PAGE: &str = "https://www.swpc.noaa.gov/products/planetary-k-index";
pub const SWPC_AURORA_PAGE: &str = "https://www.swpc.noaa.gov/products/aurora-30-minute-forecast";

/// NOAA geomagnetic storm level for a Kp value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GLevel {
    /// `G1`..`G5`, empty below storm level
    pub scale: &'static str,
    pub description: &'static str,
    /// NOAA SWPC palette colour
    pub color: (u8, u8, u8),
}

/// Kp thresholds at which G1..G5 begin
pub const G_THRESHOLDS: [f64; 5] = [4.5, 5.5, 6.5, 7.5, 9.0];

#[must_use]
pub fn g_level(k: f64) -> GLevel {
    let (scale, description, color) = if k < 4.5 {
        ("", "None", (0x92, 0xd0, 0x50))
    } else if k < 5.5 {
        ("G1", "Minor", (0xf6, 0xeb, 0x14))
    } else if k < 6.5 {
        ("G2", "Moderate", (0xff, 0xc8, 0x00))
    } else if k < 7.5 {
        ("G3", "Strong", (0xff, 0x96, 0x00))
    } else if k < 9.0 {
        ("G4", "Severe", (0xff, 0x00, 0x00))
    } else {
        ("G5", "Extreme", (0xc8, 0x00, 0x00))
    };
    GLevel {
        scale,
        description,
        color,
    }
}

impl GLevel {
    #[must_use]
    pub fn hex(&self) -> String {
        let (r, g, b) = self.color;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl fmt::Display for GLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scale, self.description)
    }
}

fn parse_time_tag(tag: &str) -> Result<DateTime<Utc>, ForecastError> {
    let tag = tag.trim().trim_end_matches('Z');
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(tag, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ForecastError::parse(format!("Invalid Kp time tag: {tag}")))
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse the observed Kp product.
///
/// Accepts both the table layout (`[["time_tag","Kp",..], ["2024-03-01 00:00:00.000","2.33",..]]`)
/// and the record layout (`[{"time_tag": "2024-03-01T00:00:00", "Kp": 2.33, ..}]`).
/// Only the last two days before the latest observation are kept.
pub fn parse_observed(body: &str) -> Result<TimeSeries, ForecastError> {
    let rows: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| ForecastError::parse(format!("Invalid Kp observation response: {e}")))?;

    let mut samples = Vec::new();
    match rows.first() {
        Some(Value::Array(header)) => {
            let column = |name: &str| header.iter().position(|h| h.as_str() == Some(name));
            let (time_col, kp_col) = column("time_tag")
                .zip(column("Kp"))
                .ok_or_else(|| ForecastError::parse("Kp table has no time_tag/Kp columns"))?;
            for row in rows.iter().skip(1) {
                let Some(row) = row.as_array() else { continue };
                let (Some(tag), Some(kp)) = (
                    row.get(time_col).and_then(Value::as_str),
                    row.get(kp_col).and_then(parse_number),
                ) else {
                    continue;
                };
                samples.push(Sample::interval(parse_time_tag(tag)?, kp, Duration::hours(KP_BIN_HOURS)));
            }
        }
        Some(Value::Object(_)) => {
            for row in &rows {
                let (Some(tag), Some(kp)) = (
                    row.get("time_tag").and_then(Value::as_str),
                    row.get("Kp").or_else(|| row.get("kp_index")).and_then(parse_number),
                ) else {
                    continue;
                };
                samples.push(Sample::interval(parse_time_tag(tag)?, kp, Duration::hours(KP_BIN_HOURS)));
            }
        }
        Some(_) => return Err(ForecastError::parse("Unrecognised Kp observation layout")),
        None => {}
    }

    if let Some(latest) = samples.iter().map(|s| s.time).max() {
        let cutoff = latest - Duration::days(OBSERVED_HISTORY_DAYS);
        samples.retain(|s| s.time > cutoff);
    }
    Ok(TimeSeries::new(Parameter::KpIndex, Unit::Index, DataSource::Swpc, samples))
}

fn month_day(text: &str, year: i32) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{year} {}", text.trim()), "%Y %b %d").ok()
}

/// Year the product was issued, from `:Issued: 2024 Mar 01 0030 UTC`
fn issued_date(text: &str) -> Option<NaiveDate> {
    let line = text.lines().find(|l| l.starts_with(":Issued:"))?;
    let mut parts = line.trim_start_matches(":Issued:").split_whitespace();
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    NaiveDate::parse_from_str(&format!("{year} {month} {day}"), "%Y %b %d").ok()
}

/// Parse the Kp table of the 3-day forecast product.
///
/// Dates in the table carry no year; it is taken from the `:Issued:` line
/// (or `reference` when absent) and rolled forward for tables spanning New Year.
pub fn parse_forecast(text: &str, reference: DateTime<Utc>) -> Result<TimeSeries, ForecastError> {
    let splitter = Regex::new(r" {2,}").map_err(|e| ForecastError::parse(e.to_string()))?;
    let anchor = issued_date(text).unwrap_or_else(|| reference.date_naive());

    let mut lines = text
        .lines()
        .skip_while(|l| !l.starts_with("NOAA Kp index breakdown"))
        .skip(1)
        .skip_while(|l| l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| ForecastError::parse("3-day forecast has no Kp breakdown table"))?;
    let mut dates = Vec::new();
    for column in splitter.split(header.trim()).filter(|c| !c.is_empty()) {
        let mut date = month_day(column, anchor.year())
            .ok_or_else(|| ForecastError::parse(format!("Invalid Kp forecast date: {column}")))?;
        if date < anchor - Duration::days(180) {
            date = month_day(column, anchor.year() + 1).unwrap_or(date);
        }
        dates.push(date);
    }

    let mut samples = Vec::new();
    for line in lines.take_while(|l| !l.trim().is_empty() && !l.starts_with("Rationale")) {
        let mut cells = splitter.split(line.trim()).filter(|c| !c.is_empty());
        let Some(range) = cells.next() else { continue };
        let hour: u32 = range
            .split('-')
            .next()
            .and_then(|h| h.trim().parse().ok())
            .ok_or_else(|| ForecastError::parse(format!("Invalid Kp forecast time range: {range}")))?;
        for (date, cell) in dates.iter().zip(cells) {
            // cells look like "2.67" or "5.00 (G1)"
            let value = cell
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| ForecastError::parse(format!("Invalid Kp forecast value: {cell}")))?;
            let Some(time) = date.and_hms_opt(hour, 0, 0) else { continue };
            samples.push(Sample::interval(time.and_utc(), value, Duration::hours(KP_BIN_HOURS)));
        }
    }

    if samples.is_empty() {
        return Err(ForecastError::parse("3-day forecast Kp table is empty"));
    }
    Ok(TimeSeries::new(Parameter::KpIndex, Unit::Index, DataSource::Swpc, samples))
}

/// Observed values followed by predictions for the bins after the last observation
#[must_use]
pub fn merge_observed_and_predicted(observed: &TimeSeries, predicted: &TimeSeries) -> TimeSeries {
    let last_observed = observed.samples().last().map(|s| s.time);
    let mut samples: Vec<Sample> = observed.samples().to_vec();
    samples.extend(
        predicted
            .samples()
            .iter()
            .filter(|s| last_observed.is_none_or(|t| s.time > t))
            .cloned(),
    );
    TimeSeries::new(Parameter::KpIndex, Unit::Index, DataSource::Swpc, samples)
}

/// Text summary of recent geomagnetic activity
#[derive(Debug, Clone, PartialEq)]
pub struct StormSummary {
    pub current_kp: f64,
    pub max_kp: f64,
    /// Kp at or above 5
    pub storm: bool,
}

impl StormSummary {
    #[must_use]
    pub fn from_observed(observed: &TimeSeries) -> Option<Self> {
        let current_kp = observed.samples().last()?.value;
        let max_kp = observed.max_value()?;
        Some(Self {
            current_kp,
            max_kp,
            storm: current_kp >= 5.0,
        })
    }

    #[must_use]
    pub fn header(&self) -> String {
        let level = g_level(self.current_kp);
        format!("Geomagnetic Storm Alert: {} ({})", level.scale, level.description)
    }

    #[must_use]
    pub fn message(&self) -> String {
        let current = g_level(self.current_kp);
        let max = g_level(self.max_kp);
        format!(
            "Current Kp: {} ({current})\nRecent Maximum Kp: {} ({max})\n\nSource: {SWPC_KP_PAGE}\nAurora forecast: {SWPC_AURORA_PAGE}",
            format_kp(self.current_kp),
            format_kp(self.max_kp),
        )
    }

    /// Header and message as printed by the `kp` command, storm or not
    #[must_use]
    pub fn report(&self) -> String {
        format!("{}\n{}", self.header(), self.message())
    }
}

fn format_kp(k: f64) -> String {
    format!("{:.2}", k).trim_end_matches('0').trim_end_matches('.').to_string()
}

/// NOAA SWPC planetary K-index source
pub struct KpSource {
    client: ClientWithMiddleware,
    observed_url: String,
    forecast_url: String,
    cache: Option<PersistentCache>,
    ttl: std::time::Duration,
}

impl KpSource {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, observed_url: &str, forecast_url: &str) -> Self {
        Self {
            client,
            observed_url: observed_url.to_string(),
            forecast_url: forecast_url.to_string(),
            cache: None,
            ttl: std::time::Duration::from_secs(30 * 60),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: PersistentCache, ttl: std::time::Duration) -> Self {
        self.cache = Some(cache);
        self.ttl = ttl;
        self
    }

    #[instrument(skip(self))]
    pub async fn observed(&self) -> Result<TimeSeries, ForecastError> {
        cached(self.cache.as_ref(), "swpc:kp:observed", self.ttl, || async {
            parse_observed(&get_text(&self.client, &self.observed_url).await?)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn predicted(&self) -> Result<TimeSeries, ForecastError> {
        cached(self.cache.as_ref(), "swpc:kp:forecast", self.ttl, || async {
            parse_forecast(&get_text(&self.client, &self.forecast_url).await?, Utc::now())
        })
        .await
    }
}

#[async_trait]
impl ForecastSource for KpSource {
    fn source(&self) -> DataSource {
        DataSource::Swpc
    }

    fn location_dependent(&self) -> bool {
        false
    }

    #[instrument(name = "kp_fetch", skip_all)]
    async fn fetch(&self, _location: &Location, _window: &TimeWindow) -> Result<SourceData, ForecastError> {
        let (observed, predicted) = tokio::join!(self.observed(), self.predicted());
        let series = match (observed, predicted) {
            (Ok(observed), Ok(predicted)) => merge_observed_and_predicted(&observed, &predicted),
            (Ok(observed), Err(e)) => {
                warn!(error = %e, "Kp forecast unavailable, using observations only");
                observed
            }
            (Err(e), Ok(predicted)) => {
                warn!(error = %e, "Kp observations unavailable, using forecast only");
                predicted
            }
            (Err(e), Err(_)) => return Err(e),
        };
        info!(bins = series.len(), "Kp retrieved");
        Ok(SourceData::new(DataSource::Swpc, vec![series]))
    }
}
