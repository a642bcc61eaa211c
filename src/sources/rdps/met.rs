//! RDPS 10 km regional model cloud cover
//!
//! Runs live under `HH/` directories with one `NNN/` directory per forecast
//! step. All four run hours are listed and the most recently updated one wins.

use super::files::{FileNameParser, RdpsFile, cloud_cover_file_name};
use super::listing::{ListingEntry, grib_files, parse_listing};
use super::{Download, GridSettings, sync_and_extract};
use crate::ForecastError;
use crate::models::{DataSource, Location, Parameter, TimeWindow};
use crate::sources::{ForecastSource, SourceData, get_text};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::join_all;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info, instrument, warn};

/// Model run hours published on the datamart
const RUN_HOURS: [u32; 4] = [0, 6, 12, 18];

/// A published run: its directory, start time and when its first step appeared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    pub url: String,
    pub run: DateTime<Utc>,
    pub updated: Option<NaiveDateTime>,
}

/// Forecast step directories (`000/`, `001/`, ..) of a run listing, in order
#[must_use]
pub fn step_directories(entries: &[ListingEntry]) -> Vec<u32> {
    let mut steps: Vec<u32> = entries
        .iter()
        .filter(|e| e.is_dir())
        .filter_map(|e| e.name.trim_end_matches('/').parse().ok())
        .collect();
    steps.sort_unstable();
    steps.dedup();
    steps
}

/// Run start time and update stamp from the listing of a run's `000/` directory
#[must_use]
pub fn run_from_first_step(parser: &FileNameParser, entries: &[ListingEntry]) -> Option<(DateTime<Utc>, Option<NaiveDateTime>)> {
    let names = grib_files(entries);
    let file: RdpsFile = names.iter().find_map(|n| parser.parse(n))?;
    let updated = entries.iter().find(|e| e.name == file.name).and_then(|e| e.modified);
    Some((file.run, updated))
}

/// RDPS 10 km regional model: total cloud cover
pub struct RdpsMetSource {
    client: ClientWithMiddleware,
    settings: GridSettings,
}

impl RdpsMetSource {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, settings: GridSettings) -> Self {
        Self { client, settings }
    }

    async fn inspect_run(&self, hour: u32, parser: &FileNameParser) -> Result<RunDirectory, ForecastError> {
        let url = format!("{}{hour:02}/", self.settings.base_url);
        let entries = parse_listing(&get_text(&self.client, &format!("{url}000/")).await?)?;
        let (run, updated) = run_from_first_step(parser, &entries)
            .ok_or_else(|| ForecastError::parse(format!("No RDPS files listed under {url}000/")))?;
        Ok(RunDirectory { url, run, updated })
    }

    /// Most recently updated of the four daily runs
    #[instrument(skip(self))]
    pub async fn latest_run(&self) -> Result<RunDirectory, ForecastError> {
        let parser = FileNameParser::new()?;
        let candidates = join_all(RUN_HOURS.iter().map(|&hour| self.inspect_run(hour, &parser))).await;
        let mut runs = Vec::new();
        for candidate in candidates {
            match candidate {
                Ok(run) => runs.push(run),
                Err(e) => debug!(error = %e, "Skipping RDPS run directory"),
            }
        }
        runs.into_iter()
            .max_by_key(|r| (r.updated, r.run))
            .ok_or_else(|| ForecastError::api(format!("No RDPS runs available at {}", self.settings.base_url)))
    }

    /// Cloud cover file for every step of the latest run
    pub async fn downloads(&self) -> Result<Vec<Download>, ForecastError> {
        let run = self.latest_run().await?;
        let steps = step_directories(&parse_listing(&get_text(&self.client, &run.url).await?)?);
        if steps.is_empty() {
            warn!(url = %run.url, "Run directory lists no forecast steps");
        }
        Ok(steps
            .into_iter()
            .map(|step| {
                let name = cloud_cover_file_name(run.run, step);
                Download {
                    url: format!("{}{step:03}/{name}", run.url),
                    file: RdpsFile {
                        name,
                        parameter: Parameter::CloudCover,
                        run: run.run,
                        step_hours: step,
                    },
                }
            })
            .collect())
    }
}

#[async_trait]
impl ForecastSource for RdpsMetSource {
    fn source(&self) -> DataSource {
        DataSource::RdpsMet
    }

    #[instrument(name = "rdps_met_fetch", skip_all)]
    async fn fetch(&self, location: &Location, window: &TimeWindow) -> Result<SourceData, ForecastError> {
        // steps past the window are never plotted
        let downloads: Vec<Download> = self
            .downloads()
            .await?
            .into_iter()
            .filter(|d| d.file.valid_time() <= window.end)
            .collect();
        if downloads.is_empty() {
            return Err(ForecastError::api("RDPS run has no steps inside the forecast window"));
        }
        let series = sync_and_extract(&self.client, &self.settings, downloads, location, DataSource::RdpsMet).await?;
        info!(layers = series.len(), "RDPS cloud cover retrieved");
        Ok(SourceData::new(DataSource::RdpsMet, series))
    }
}
