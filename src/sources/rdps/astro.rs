//! RDPS astronomy products: seeing and sky transparency
//!
//! The astronomy directory lists one subdirectory per run; the newest one is
//! read and only the files of its latest run are mirrored.

use super::files::FileNameParser;
use super::listing::{grib_files, latest_directory, parse_listing};
use super::{Download, GridSettings, sync_and_extract};
use crate::ForecastError;
use crate::models::{DataSource, Location, Parameter, TimeWindow};
use crate::sources::{ForecastSource, SourceData, get_text};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{info, instrument};

/// RDPS astronomy model: seeing and sky transparency
pub struct RdpsAstroSource {
    client: ClientWithMiddleware,
    settings: GridSettings,
}

impl RdpsAstroSource {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, settings: GridSettings) -> Self {
        Self { client, settings }
    }

    /// URL of the latest run directory and the files it holds
    #[instrument(skip(self))]
    pub async fn latest_run(&self) -> Result<(String, Vec<String>), ForecastError> {
        let root = parse_listing(&get_text(&self.client, &self.settings.base_url).await?)?;
        let root_files = grib_files(&root);
        // some mirrors publish the files without a run subdirectory
        if !root_files.is_empty() {
            return Ok((self.settings.base_url.clone(), root_files));
        }
        let run = latest_directory(&root)
            .ok_or_else(|| ForecastError::parse(format!("No model runs listed at {}", self.settings.base_url)))?;
        let run_url = format!("{}{}", self.settings.base_url, run.name);
        let files = grib_files(&parse_listing(&get_text(&self.client, &run_url).await?)?);
        Ok((run_url, files))
    }

    /// Latest-run seeing and transparency files to mirror
    pub async fn downloads(&self) -> Result<Vec<Download>, ForecastError> {
        let (run_url, names) = self.latest_run().await?;
        let parser = FileNameParser::new()?;
        let downloads: Vec<Download> = parser
            .latest_run_files(&names)
            .into_iter()
            .filter(|f| matches!(f.parameter, Parameter::Seeing | Parameter::Transparency))
            .map(|file| Download {
                url: format!("{run_url}{}", file.name),
                file,
            })
            .collect();
        if downloads.is_empty() {
            return Err(ForecastError::api(format!("No seeing or transparency files at {run_url}")));
        }
        Ok(downloads)
    }
}

#[async_trait]
impl ForecastSource for RdpsAstroSource {
    fn source(&self) -> DataSource {
        DataSource::RdpsAstro
    }

    #[instrument(name = "rdps_astro_fetch", skip_all)]
    async fn fetch(&self, location: &Location, _window: &TimeWindow) -> Result<SourceData, ForecastError> {
        let downloads = self.downloads().await?;
        let run = downloads.first().map(|d| d.file.run);
        let series = sync_and_extract(&self.client, &self.settings, downloads, location, DataSource::RdpsAstro).await?;
        info!(run = ?run, layers = series.len(), "RDPS astronomy forecast retrieved");
        Ok(SourceData::new(DataSource::RdpsAstro, series))
    }
}
