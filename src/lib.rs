//! `astroatmos` - stargazing forecasts
//!
//! Collects cloud cover, sky transparency, seeing, geomagnetic activity,
//! temperature and wind for an observing site, aligns them on one time grid
//! and renders them as a stacked chart next to the sun and moon altitude.

pub mod aggregate;
pub mod bodies;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod plot;
pub mod sources;
pub mod units;

// Re-export core types for public API
pub use aggregate::ForecastService;
pub use bodies::{LunarPhase, MoonPhase};
pub use cache::PersistentCache;
pub use config::ForecastConfig;
pub use error::ForecastError;
pub use models::{DataSource, Forecast, Location, Parameter, TimeSeries, TimeWindow};
pub use sources::{ForecastSource, SourceData};
pub use units::{TemperatureUnit, WindUnit};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ForecastError>;
