//! ECCC Regional Deterministic Prediction System (RDPS) grids
//!
//! Model runs are discovered by scraping the datamart index pages, GRIB2
//! files of the latest run are mirrored into a local directory, files of
//! older runs are pruned, and values are read at the grid point nearest the
//! forecast location.

pub mod astro;
pub mod files;
pub mod grid;
pub mod listing;
pub mod met;
#[cfg(test)]
pub(crate) mod testing;

pub use astro::RdpsAstroSource;
pub use met::RdpsMetSource;

use super::get_bytes;
use crate::ForecastError;
use crate::models::{DataSource, Location, Parameter, Sample, TimeSeries};
use crate::units::Unit;
use files::RdpsFile;
use futures::{StreamExt, stream};
use reqwest_middleware::ClientWithMiddleware;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A file to mirror: where to get it and its local name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub file: RdpsFile,
}

/// Shared settings of both RDPS sources
#[derive(Debug, Clone)]
pub struct GridSettings {
    pub base_url: String,
    pub dir: PathBuf,
    pub concurrency: usize,
    pub max_distance_km: f64,
}

impl GridSettings {
    #[must_use]
    pub fn new(base_url: &str, dir: PathBuf) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            dir,
            concurrency: 8,
            max_distance_km: 50.0,
        }
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') { url.to_string() } else { format!("{url}/") }
}

/// Download files missing from `dir`; individual failures are logged and skipped
pub(crate) async fn mirror(
    client: &ClientWithMiddleware,
    dir: &Path,
    downloads: &[Download],
    concurrency: usize,
) -> Result<(), ForecastError> {
    tokio::fs::create_dir_all(dir).await?;
    let missing: Vec<Download> = downloads
        .iter()
        .filter(|d| !dir.join(&d.file.name).exists())
        .cloned()
        .collect();
    info!(missing = missing.len(), total = downloads.len(), dir = %dir.display(), "Syncing RDPS files");

    let results: Vec<Result<(), ForecastError>> = stream::iter(missing)
        .map(|download| {
            let client = client.clone();
            let dir = dir.to_path_buf();
            async move {
                let bytes = get_bytes(&client, &download.url).await?;
                // write under a temporary name so interrupted downloads never look complete
                let partial = dir.join(format!("{}.part", download.file.name));
                tokio::fs::write(&partial, &bytes).await?;
                tokio::fs::rename(&partial, dir.join(&download.file.name)).await?;
                debug!(file = %download.file.name, bytes = bytes.len(), "Downloaded");
                Ok(())
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failures = results.iter().filter(|r| r.is_err()).count();
    if let Some(Err(e)) = results.into_iter().find(Result::is_err) {
        warn!(failures, error = %e, "Some RDPS downloads failed");
    }
    Ok(())
}

/// Remove every file in `dir` that is not one of `keep`
pub(crate) async fn prune(dir: &Path, keep: &HashSet<String>) -> Result<usize, ForecastError> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().await?.is_file() && !keep.contains(&name) {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(removed, dir = %dir.display(), "Pruned files of older runs");
    }
    Ok(removed)
}

fn unit_for(parameter: Parameter) -> Unit {
    match parameter {
        Parameter::CloudCover => Unit::Percent,
        _ => Unit::Index,
    }
}

/// Decode one file; coordinates are only read again when the grid size changed
fn decode_step(path: &Path, grid_len: Option<usize>) -> Result<grid::DecodedGrid, ForecastError> {
    match grid_len {
        Some(len) => {
            let decoded = grid::decode_file(path, false)?;
            if decoded.values.len() == len { Ok(decoded) } else { grid::decode_file(path, true) }
        }
        None => grid::decode_file(path, true),
    }
}

/// Read every mirrored file at the grid point nearest `location`, one series per parameter.
/// Blocking: decodes GRIB2.
pub(crate) fn extract_point_series(
    dir: &Path,
    files: &[RdpsFile],
    location: &Location,
    max_distance_km: f64,
    source: DataSource,
) -> Result<Vec<TimeSeries>, ForecastError> {
    let mut by_parameter: BTreeMap<Parameter, Vec<Sample>> = BTreeMap::new();
    let mut nearest: Option<(grid::GridMatch, usize)> = None;

    for file in files {
        let path = dir.join(&file.name);
        if !path.exists() {
            continue;
        }
        // all steps of a run share one grid, so locate the point once
        let decoded = match decode_step(&path, nearest.map(|(_, len)| len)) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(file = %file.name, error = %e, "Skipping unreadable GRIB2 file");
                continue;
            }
        };
        if !decoded.points.is_empty() {
            let matched = grid::nearest_point(&decoded.points, location)
                .ok_or_else(|| ForecastError::parse(format!("{} has an empty grid", file.name)))?;
            grid::ensure_within(&matched, max_distance_km, source.name())?;
            debug!(
                lat = matched.latitude,
                lon = matched.longitude,
                distance_km = matched.distance_km,
                "Closest grid point"
            );
            nearest = Some((matched, decoded.values.len()));
        }
        let Some((matched, _)) = nearest else { continue };
        let Some(&value) = decoded.values.get(matched.index) else {
            continue;
        };
        by_parameter
            .entry(file.parameter)
            .or_default()
            .push(Sample::at(file.valid_time(), value));
    }

    if by_parameter.is_empty() {
        return Err(ForecastError::api(format!("No {source} files could be read")));
    }
    Ok(by_parameter
        .into_iter()
        .map(|(parameter, samples)| TimeSeries::new(parameter, unit_for(parameter), source, samples))
        .collect())
}

/// Mirror, prune, then extract on a blocking thread
pub(crate) async fn sync_and_extract(
    client: &ClientWithMiddleware,
    settings: &GridSettings,
    downloads: Vec<Download>,
    location: &Location,
    source: DataSource,
) -> Result<Vec<TimeSeries>, ForecastError> {
    mirror(client, &settings.dir, &downloads, settings.concurrency).await?;
    let keep: HashSet<String> = downloads.iter().map(|d| d.file.name.clone()).collect();
    prune(&settings.dir, &keep).await?;

    let dir = settings.dir.clone();
    let files: Vec<RdpsFile> = downloads.into_iter().map(|d| d.file).collect();
    let location = location.clone();
    let max_distance = settings.max_distance_km;
    tokio::task::spawn_blocking(move || extract_point_series(&dir, &files, &location, max_distance, source))
        .await
        .map_err(|e| ForecastError::parse(format!("GRIB2 extraction task failed: {e}")))?
}
