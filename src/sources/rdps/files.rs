//! RDPS GRIB2 file names
//!
//! Two naming schemes are in use on the datamart:
//! `CMC_reg_SEEI_SFC_0_ps10km_2024030100_P001.grib2` and
//! `20240301T00Z_MSC_RDPS_Seeing_Sfc_RLatLon0.09_PT001H.grib2`.
//! Both carry the model run and forecast step, which give the valid time.

use crate::ForecastError;
use crate::models::Parameter;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;

/// Variable code of RDPS total cloud cover at the surface
pub const CLOUD_COVER_VARIABLE: &str = "TCDC_SFC_0";

/// A parsed RDPS file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdpsFile {
    pub name: String,
    pub parameter: Parameter,
    pub run: DateTime<Utc>,
    pub step_hours: u32,
}

impl RdpsFile {
    #[must_use]
    pub fn valid_time(&self) -> DateTime<Utc> {
        self.run + Duration::hours(i64::from(self.step_hours))
    }
}

fn parameter_of(name: &str) -> Option<Parameter> {
    if name.contains("_SEEI_") || name.contains("_Seeing_") {
        Some(Parameter::Seeing)
    } else if name.contains("_TRSP_") || name.contains("_Transparency_") {
        Some(Parameter::Transparency)
    } else if name.contains("_TCDC_") || name.contains("_TotalCloudCover_") {
        Some(Parameter::CloudCover)
    } else {
        None
    }
}

/// Parses RDPS file names of either scheme
pub struct FileNameParser {
    legacy: Regex,
    current: Regex,
}

impl FileNameParser {
    pub fn new() -> Result<Self, ForecastError> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| ForecastError::parse(e.to_string()));
        Ok(Self {
            legacy: compile(r"_(?P<run>\d{10})_P(?P<step>\d{3})(?:-\d{2})?\.grib2$")?,
            current: compile(r"^(?P<run>\d{8}T\d{2})Z_.*_PT(?P<step>\d{3})H\.grib2$")?,
        })
    }

    /// `None` for names that are not RDPS parameter files we use
    #[must_use]
    pub fn parse(&self, name: &str) -> Option<RdpsFile> {
        let parameter = parameter_of(name)?;
        let (run, step) = if let Some(caps) = self.legacy.captures(name) {
            let run = NaiveDateTime::parse_from_str(&format!("{}00", &caps["run"]), "%Y%m%d%H%M").ok()?;
            (run, caps["step"].parse().ok()?)
        } else {
            let caps = self.current.captures(name)?;
            let run = NaiveDateTime::parse_from_str(&format!("{}00", &caps["run"]), "%Y%m%dT%H%M").ok()?;
            (run, caps["step"].parse().ok()?)
        };
        Some(RdpsFile {
            name: name.to_string(),
            parameter,
            run: run.and_utc(),
            step_hours: step,
        })
    }

    /// Parse every usable name, keeping only files of the most recent run
    #[must_use]
    pub fn latest_run_files(&self, names: &[String]) -> Vec<RdpsFile> {
        let files: Vec<RdpsFile> = names.iter().filter_map(|n| self.parse(n)).collect();
        let Some(latest) = files.iter().map(|f| f.run).max() else {
            return Vec::new();
        };
        let mut latest_files: Vec<RdpsFile> = files.into_iter().filter(|f| f.run == latest).collect();
        latest_files.sort_by_key(|f| (f.parameter, f.step_hours));
        latest_files
    }
}

/// Name of the RDPS cloud cover file for a run and step
#[must_use]
pub fn cloud_cover_file_name(run: DateTime<Utc>, step_hours: u32) -> String {
    format!(
        "CMC_reg_{CLOUD_COVER_VARIABLE}_ps10km_{}_P{step_hours:03}.grib2",
        run.format("%Y%m%d%H")
    )
}
