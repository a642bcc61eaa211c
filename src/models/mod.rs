//! Data models for the forecast pipeline
//!
//! - Location: the observing site
//! - Series: parameters, samples, time windows and grids
//! - Forecast: the aligned result handed to the renderer

pub mod forecast;
pub mod location;
pub mod series;

pub use forecast::{Forecast, SourceFailure};
pub use location::Location;
pub use series::{DataSource, Parameter, Resample, Sample, TimeGrid, TimeSeries, TimeWindow};
