//! Aggregated forecast handed to the renderer

use super::{DataSource, Location, Parameter, TimeSeries, TimeWindow};
use crate::bodies::MoonPhase;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A source that could not contribute to the forecast
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source: DataSource,
    pub message: String,
    /// The source answered that it does not cover the location
    pub unsupported: bool,
}

/// All aligned series for one location over one window
#[derive(Debug, Clone)]
pub struct Forecast {
    pub location: Location,
    pub window: TimeWindow,
    /// Instant the forecast was assembled, drawn as the "now" line
    pub generated_at: DateTime<Utc>,
    pub series: BTreeMap<Parameter, TimeSeries>,
    pub failures: Vec<SourceFailure>,
    pub moon: MoonPhase,
}

impl Forecast {
    #[must_use]
    pub fn new(location: Location, window: TimeWindow, generated_at: DateTime<Utc>, moon: MoonPhase) -> Self {
        Self {
            location,
            window,
            generated_at,
            series: BTreeMap::new(),
            failures: Vec::new(),
            moon,
        }
    }

    /// Insert a series, skipping empty ones so missing panels stay missing
    pub fn insert(&mut self, series: TimeSeries) {
        if series.is_empty() {
            return;
        }
        self.series.entry(series.parameter).or_insert(series);
    }

    #[must_use]
    pub fn get(&self, parameter: Parameter) -> Option<&TimeSeries> {
        self.series.get(&parameter)
    }

    #[must_use]
    pub fn has(&self, parameter: Parameter) -> bool {
        self.series.contains_key(&parameter)
    }

    pub fn record_failure(&mut self, failure: SourceFailure) {
        self.failures.push(failure);
    }

    /// Sources that contributed at least one series
    #[must_use]
    pub fn sources(&self) -> Vec<DataSource> {
        let mut sources: Vec<DataSource> = Vec::new();
        for series in self.series.values() {
            if !sources.contains(&series.source) {
                sources.push(series.source);
            }
        }
        sources
    }

    /// One line per failed source, for the run summary
    #[must_use]
    pub fn failure_summary(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.source, f.message))
            .collect()
    }
}
