//! Time series model: parameters, samples, windows and grid alignment

use crate::units::Unit;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecast parameters shown on the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parameter {
    CloudCover,
    PrecipitationProbability,
    Transparency,
    Seeing,
    KpIndex,
    Temperature,
    Dewpoint,
    WindSpeed,
    WindGust,
    WindDirection,
    SunAltitude,
    MoonAltitude,
    LunarIllumination,
}

impl Parameter {
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Parameter::CloudCover => "Cloud cover",
            Parameter::PrecipitationProbability => "Precipitation",
            Parameter::Transparency => "Transparency",
            Parameter::Seeing => "Seeing",
            Parameter::KpIndex => "Kp",
            Parameter::Temperature => "Temperature",
            Parameter::Dewpoint => "Dewpoint",
            Parameter::WindSpeed => "Wind speed",
            Parameter::WindGust => "Wind gust",
            Parameter::WindDirection => "Wind direction",
            Parameter::SunAltitude => "Sun altitude",
            Parameter::MoonAltitude => "Moon altitude",
            Parameter::LunarIllumination => "Moon illumination",
        }
    }

    /// How this parameter is carried onto the output grid
    #[must_use]
    pub fn resample_method(self) -> Resample {
        match self {
            Parameter::Temperature
            | Parameter::Dewpoint
            | Parameter::WindSpeed
            | Parameter::WindGust
            | Parameter::SunAltitude
            | Parameter::MoonAltitude
            | Parameter::LunarIllumination => Resample::Linear,
            // categorical values, bins, and angles that wrap at 360
            _ => Resample::Hold,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where a series came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// US National Weather Service gridpoint forecast
    Nws,
    /// ECCC RDPS astronomy model (seeing, transparency)
    RdpsAstro,
    /// ECCC RDPS regional model (cloud cover)
    RdpsMet,
    /// NOAA Space Weather Prediction Center
    Swpc,
    /// Computed locally from ephemeris
    Ephemeris,
}

impl DataSource {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DataSource::Nws => "NWS",
            DataSource::RdpsAstro => "RDPS astronomy",
            DataSource::RdpsMet => "RDPS",
            DataSource::Swpc => "NOAA SWPC",
            DataSource::Ephemeris => "ephemeris",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resampling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    /// Carry a value forward over its validity interval
    Hold,
    /// Interpolate linearly between neighbouring samples
    Linear,
}

/// One value at one instant, optionally valid for a duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
    /// Length of the validity interval in seconds, when the source states one
    pub valid_for_secs: Option<i64>,
}

impl Sample {
    #[must_use]
    pub fn at(time: DateTime<Utc>, value: f64) -> Self {
        Self {
            time,
            value,
            valid_for_secs: None,
        }
    }

    #[must_use]
    pub fn interval(time: DateTime<Utc>, value: f64, valid_for: Duration) -> Self {
        Self {
            time,
            value,
            valid_for_secs: Some(valid_for.num_seconds()),
        }
    }

    #[must_use]
    pub fn valid_for(&self) -> Option<Duration> {
        self.valid_for_secs.map(Duration::seconds)
    }
}

/// Ordered samples of one parameter from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub parameter: Parameter,
    pub unit: Unit,
    pub source: DataSource,
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Build a series; samples are sorted by time and non-finite values dropped
    #[must_use]
    pub fn new(parameter: Parameter, unit: Unit, source: DataSource, mut samples: Vec<Sample>) -> Self {
        samples.retain(|s| s.value.is_finite());
        samples.sort_by_key(|s| s.time);
        samples.dedup_by_key(|s| s.time);
        Self {
            parameter,
            unit,
            source,
            samples,
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        self.values().reduce(f64::max)
    }

    /// Apply a conversion to every value, relabelling the unit
    #[must_use]
    pub fn map_values(&self, unit: Unit, f: impl Fn(f64) -> f64) -> Self {
        let samples = self
            .samples
            .iter()
            .map(|s| Sample {
                value: f(s.value),
                ..s.clone()
            })
            .collect();
        Self::new(self.parameter, unit, self.source, samples)
    }

    /// Median spacing between consecutive samples
    #[must_use]
    pub fn median_step(&self) -> Option<Duration> {
        let mut steps: Vec<Duration> = self
            .samples
            .windows(2)
            .map(|w| w[1].time - w[0].time)
            .collect();
        if steps.is_empty() {
            return None;
        }
        steps.sort();
        Some(steps[steps.len() / 2])
    }

    /// End of the validity interval of sample `index`
    fn valid_until(&self, index: usize) -> DateTime<Utc> {
        let sample = &self.samples[index];
        if let Some(valid_for) = sample.valid_for() {
            return sample.time + valid_for;
        }
        match self.samples.get(index + 1) {
            Some(next) => next.time,
            None => sample.time + self.median_step().unwrap_or_else(|| Duration::hours(1)),
        }
    }

    /// First instant covered and the instant coverage ends
    #[must_use]
    pub fn coverage(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.samples.first()?;
        Some((first.time, self.valid_until(self.samples.len() - 1)))
    }

    /// Value at `t`, or `None` when `t` lies outside the native coverage
    #[must_use]
    pub fn value_at(&self, t: DateTime<Utc>, method: Resample) -> Option<f64> {
        // index of the last sample at or before t
        let idx = self.samples.partition_point(|s| s.time <= t).checked_sub(1)?;
        let current = &self.samples[idx];

        if method == Resample::Linear && current.time != t {
            if let Some(next) = self.samples.get(idx + 1) {
                // bracketed: interpolate unless the gap is a hole in the data
                if current.valid_for().is_none_or(|d| current.time + d >= next.time) {
                    let span = (next.time - current.time).num_milliseconds() as f64;
                    let offset = (t - current.time).num_milliseconds() as f64;
                    return Some(current.value + (next.value - current.value) * offset / span);
                }
            }
        }

        (t < self.valid_until(idx)).then_some(current.value)
    }

    /// Carry this series onto `grid`, never emitting timestamps outside it
    #[must_use]
    pub fn resample(&self, grid: &TimeGrid) -> Self {
        let method = self.parameter.resample_method();
        let samples = grid
            .points()
            .filter_map(|t| self.value_at(t, method).map(|v| Sample::interval(t, v, grid.step)))
            .collect();
        Self::new(self.parameter, self.unit, self.source, samples)
    }
}

/// Half-open forecast window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `hours` starting at the top of the current hour
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>, hours: u32) -> Self {
        let start = now.duration_trunc(Duration::hours(1)).unwrap_or(now);
        Self {
            start,
            end: start + Duration::hours(i64::from(hours)),
        }
    }

    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    #[must_use]
    pub fn grid(&self, step: Duration) -> TimeGrid {
        TimeGrid { window: *self, step }
    }

    /// Hours from the window start, used as the chart's x coordinate
    #[must_use]
    pub fn offset_hours(&self, t: DateTime<Utc>) -> f64 {
        (t - self.start).num_seconds() as f64 / 3600.0
    }

    #[must_use]
    pub fn time_at_offset(&self, hours: f64) -> DateTime<Utc> {
        self.start + Duration::seconds((hours * 3600.0).round() as i64)
    }
}

/// Regular grid of instants inside a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    pub window: TimeWindow,
    pub step: Duration,
}

impl TimeGrid {
    pub fn points(&self) -> impl Iterator<Item = DateTime<Utc>> + use<> {
        let TimeWindow { start, end } = self.window;
        let step = self.step;
        std::iter::successors(Some(start), move |t| Some(*t + step)).take_while(move |t| *t < end)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.start >= self.window.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_new_sorts_and_drops_non_finite() {
        let series = TimeSeries::new(
            Parameter::Temperature,
            Unit::Celsius,
            DataSource::Nws,
            vec![Sample::at(t(2), 3.0), Sample::at(t(0), 1.0), Sample::at(t(1), f64::NAN)],
        );
        let times: Vec<_> = series.samples().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![t(0), t(2)]);
    }

    #[test]
    fn test_hold_respects_interval() {
        let series = TimeSeries::new(
            Parameter::CloudCover,
            Unit::Percent,
            DataSource::Nws,
            vec![
                Sample::interval(t(0), 10.0, Duration::hours(3)),
                Sample::interval(t(6), 80.0, Duration::hours(1)),
            ],
        );
        assert_eq!(series.value_at(t(2), Resample::Hold), Some(10.0));
        assert_eq!(series.value_at(t(4), Resample::Hold), None);
        assert_eq!(series.value_at(t(6), Resample::Hold), Some(80.0));
        assert_eq!(series.value_at(t(7), Resample::Hold), None);
    }

    #[test]
    fn test_linear_interpolates_between_samples() {
        let series = TimeSeries::new(
            Parameter::Temperature,
            Unit::Celsius,
            DataSource::Nws,
            vec![Sample::at(t(0), 0.0), Sample::at(t(4), 8.0)],
        );
        assert_eq!(series.value_at(t(1), Resample::Linear), Some(2.0));
        assert_eq!(series.value_at(t(4), Resample::Linear), Some(8.0));
        assert_eq!(series.value_at(t(0) - Duration::minutes(1), Resample::Linear), None);
    }

    #[test]
    fn test_window_starts_on_the_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 42, 17).unwrap();
        let window = TimeWindow::starting_at(now, 72);
        assert_eq!(window.start, t(10));
        assert_eq!(window.duration(), Duration::hours(72));
        assert_eq!(window.grid(Duration::hours(1)).len(), 72);
    }

    #[test]
    fn test_median_step() {
        let series = TimeSeries::new(
            Parameter::Seeing,
            Unit::Index,
            DataSource::RdpsAstro,
            vec![Sample::at(t(0), 1.0), Sample::at(t(1), 2.0), Sample::at(t(2), 3.0), Sample::at(t(5), 3.0)],
        );
        assert_eq!(series.median_step(), Some(Duration::hours(1)));
        assert_eq!(series.coverage(), Some((t(0), t(6))));
    }
}
