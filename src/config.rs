//! Configuration management for `astroatmos`
//!
//! Reads the INI forecast location file, applies `ASTROATMOS_` environment
//! overrides, and validates every setting before the pipeline starts.

use crate::ForecastError;
use crate::models::Location;
use crate::units::{TemperatureUnit, WindUnit};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the forecast location file
pub const DEFAULT_CONFIG_FILE: &str = "forecast_location.txt";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Observing site
    pub location: LocationConfig,
    #[serde(default)]
    pub units: UnitsConfig,
    #[serde(default)]
    pub forecast: WindowConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[location]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// IANA timezone name
    pub timezone: String,
    /// Elevation in metres (optional, default 0)
    #[serde(default)]
    pub elevation: f64,
}

/// `[units]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsConfig {
    /// `F` or `C`
    #[serde(default = "default_temp_unit")]
    pub temp_unit: String,
    /// `mph` or `km/hr`
    #[serde(default = "default_wind_unit")]
    pub wind_unit: String,
}

/// `[forecast]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Length of the forecast window in hours
    #[serde(default = "default_hours")]
    pub hours: u32,
    /// Spacing of the output time grid
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,
}

/// `[sources]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_nws_base_url")]
    pub nws_base_url: String,
    #[serde(default = "default_kp_observed_url")]
    pub kp_observed_url: String,
    #[serde(default = "default_kp_forecast_url")]
    pub kp_forecast_url: String,
    #[serde(default = "default_rdps_astro_url")]
    pub rdps_astro_url: String,
    #[serde(default = "default_rdps_met_url")]
    pub rdps_met_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// User agent sent with every request; api.weather.gov rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Preferred cloud cover source, `nws` or `rdps`
    #[serde(default = "default_met_source")]
    pub met_source: String,
    #[serde(default = "default_true")]
    pub enable_nws: bool,
    #[serde(default = "default_true")]
    pub enable_kp: bool,
    #[serde(default = "default_true")]
    pub enable_rdps_astro: bool,
    #[serde(default = "default_true")]
    pub enable_rdps_met: bool,
    /// Locations farther than this from the nearest model grid point are unsupported
    #[serde(default = "default_max_grid_distance")]
    pub max_grid_distance_km: f64,
    /// Concurrent GRIB2 downloads
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
}

/// `[cache]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache directory; `~` expands to the home directory
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Lifetime of cached source responses
    #[serde(default = "default_cache_ttl")]
    pub ttl_minutes: u32,
    /// Lifetime of cached NWS grid metadata
    #[serde(default = "default_points_ttl")]
    pub points_ttl_hours: u32,
}

/// `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Static chart image
    #[serde(default = "default_image")]
    pub image: String,
    /// Interactive view opened in the system viewer
    #[serde(default = "default_svg")]
    pub svg: String,
    /// Standalone Kp chart written by the `kp` command
    #[serde(default = "default_kp_image")]
    pub kp_image: String,
    /// Open the interactive view after rendering
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_temp_unit() -> String {
    "F".to_string()
}

fn default_wind_unit() -> String {
    "mph".to_string()
}

fn default_hours() -> u32 {
    72
}

fn default_step_minutes() -> u32 {
    60
}

fn default_nws_base_url() -> String {
    "https://api.weather.gov".to_string()
}

fn default_kp_observed_url() -> String {
    "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json".to_string()
}

fn default_kp_forecast_url() -> String {
    "https://services.swpc.noaa.gov/text/3-day-forecast.txt".to_string()
}

fn default_rdps_astro_url() -> String {
    "https://dd.alpha.meteo.gc.ca/model_gem_regional/astronomy/grib2/".to_string()
}

fn default_rdps_met_url() -> String {
    "https://dd.weather.gc.ca/model_gem_regional/10km/grib2/".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("astroatmos/{} (stargazing forecast)", env!("CARGO_PKG_VERSION"))
}

fn default_met_source() -> String {
    "nws".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_grid_distance() -> f64 {
    50.0
}

fn default_download_concurrency() -> usize {
    8
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("astroatmos").display().to_string())
        .unwrap_or_else(|| "~/.cache/astroatmos".to_string())
}

fn default_cache_ttl() -> u32 {
    30
}

fn default_points_ttl() -> u32 {
    168
}

fn default_image() -> String {
    "forecast.png".to_string()
}

fn default_svg() -> String {
    "forecast.svg".to_string()
}

fn default_kp_image() -> String {
    "kp_plot.png".to_string()
}

fn default_width() -> u32 {
    1400
}

fn default_height() -> u32 {
    900
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            temp_unit: default_temp_unit(),
            wind_unit: default_wind_unit(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            hours: default_hours(),
            step_minutes: default_step_minutes(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            nws_base_url: default_nws_base_url(),
            kp_observed_url: default_kp_observed_url(),
            kp_forecast_url: default_kp_forecast_url(),
            rdps_astro_url: default_rdps_astro_url(),
            rdps_met_url: default_rdps_met_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            met_source: default_met_source(),
            enable_nws: true,
            enable_kp: true,
            enable_rdps_astro: true,
            enable_rdps_met: true,
            max_grid_distance_km: default_max_grid_distance(),
            download_concurrency: default_download_concurrency(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: default_cache_location(),
            ttl_minutes: default_cache_ttl(),
            points_ttl_hours: default_points_ttl(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            svg: default_svg(),
            kp_image: default_kp_image(),
            show: true,
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ForecastConfig {
    /// Configuration for a site, everything else at defaults
    #[must_use]
    pub fn for_site(lat: f64, lon: f64, timezone: &str, elevation: f64) -> Self {
        Self {
            location: LocationConfig {
                lat,
                lon,
                timezone: timezone.to_string(),
                elevation,
            },
            units: UnitsConfig::default(),
            forecast: WindowConfig::default(),
            sources: SourcesConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from `forecast_location.txt` in the working directory
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from the given file (or the default one) plus environment overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(FileFormat::Ini),
            );
        } else {
            tracing::debug!(path = %config_file.display(), "Config file not found, using environment only");
        }

        // Environment overrides, e.g. ASTROATMOS_LOCATION__LAT=46.5
        builder = builder.add_source(
            Environment::with_prefix("ASTROATMOS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ForecastConfig = settings.try_deserialize().with_context(|| {
            format!(
                "Failed to read forecast configuration from {} (a [location] section with lat, lon and timezone is required)",
                config_file.display()
            )
        })?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty or zero fields
    pub fn apply_defaults(&mut self) {
        if self.units.temp_unit.trim().is_empty() {
            self.units.temp_unit = default_temp_unit();
        }
        if self.units.wind_unit.trim().is_empty() {
            self.units.wind_unit = default_wind_unit();
        }
        if self.forecast.hours == 0 {
            self.forecast.hours = default_hours();
        }
        if self.forecast.step_minutes == 0 {
            self.forecast.step_minutes = default_step_minutes();
        }
        if self.sources.timeout_seconds == 0 {
            self.sources.timeout_seconds = default_timeout();
        }
        if self.sources.user_agent.trim().is_empty() {
            self.sources.user_agent = default_user_agent();
        }
        if self.sources.met_source.trim().is_empty() {
            self.sources.met_source = default_met_source();
        }
        if self.sources.download_concurrency == 0 {
            self.sources.download_concurrency = default_download_concurrency();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.cache.points_ttl_hours == 0 {
            self.cache.points_ttl_hours = default_points_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.location.timezone.trim().is_empty() {
            return Err(ForecastError::config("Location timezone is required (an IANA name such as America/Toronto)").into());
        }
        self.to_location()?;
        self.temperature_unit()?;
        self.wind_unit()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(1..=168).contains(&self.forecast.hours) {
            return Err(ForecastError::config("Forecast hours must be between 1 and 168").into());
        }

        if !(5..=360).contains(&self.forecast.step_minutes) {
            return Err(ForecastError::config("Forecast step must be between 5 and 360 minutes").into());
        }

        if self.sources.timeout_seconds > 300 {
            return Err(ForecastError::config("Source timeout cannot exceed 300 seconds").into());
        }

        if self.sources.max_retries > 10 {
            return Err(ForecastError::config("Source max retries cannot exceed 10").into());
        }

        if !(self.sources.max_grid_distance_km > 0.0) {
            return Err(ForecastError::config("Maximum grid distance must be positive").into());
        }

        if self.cache.ttl_minutes > 1440 {
            return Err(ForecastError::config("Cache TTL cannot exceed 1440 minutes (1 day)").into());
        }

        if !(400..=8000).contains(&self.output.width) || !(300..=8000).contains(&self.output.height) {
            return Err(ForecastError::config("Output size must be between 400x300 and 8000x8000 pixels").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ForecastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ForecastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_met_sources = ["nws", "rdps"];
        if !valid_met_sources.contains(&self.sources.met_source.as_str()) {
            return Err(ForecastError::config(format!(
                "Invalid met_source '{}'. Must be one of: {}",
                self.sources.met_source,
                valid_met_sources.join(", ")
            ))
            .into());
        }

        for url in [
            &self.sources.nws_base_url,
            &self.sources.kp_observed_url,
            &self.sources.kp_forecast_url,
            &self.sources.rdps_astro_url,
            &self.sources.rdps_met_url,
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ForecastError::config(format!(
                    "Source URL must be a valid HTTP or HTTPS URL: {url}"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validated observing site
    pub fn to_location(&self) -> Result<Location, ForecastError> {
        let timezone = Location::parse_timezone(&self.location.timezone)?;
        Location::new(
            self.location.lat,
            self.location.lon,
            timezone,
            self.location.elevation,
        )
    }

    pub fn temperature_unit(&self) -> Result<TemperatureUnit, ForecastError> {
        self.units.temp_unit.parse()
    }

    pub fn wind_unit(&self) -> Result<WindUnit, ForecastError> {
        self.units.wind_unit.parse()
    }

    /// Whether RDPS cloud cover should win over NWS cloud cover
    #[must_use]
    pub fn prefers_rdps_met(&self) -> bool {
        self.sources.met_source == "rdps"
    }

    /// Cache directory with `~` expanded
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        expand_home(&self.cache.location)
    }

    /// Directory holding downloaded GRIB2 files for one RDPS product
    #[must_use]
    pub fn grib_dir(&self, product: &str) -> PathBuf {
        self.cache_dir().join("grib").join(product)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(path).to_path_buf(),
    }
}
