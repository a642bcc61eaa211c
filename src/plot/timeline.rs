//! Time axis, title and annotation helpers
//!
//! The x axis of every panel is hours since the start of the forecast window.

use crate::models::{Location, TimeSeries, TimeWindow};
use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::types::RangedCoordf64;
use std::ops::Range;

/// Spacing of time axis labels
pub const TICK_HOURS: u32 = 3;

/// Offsets (hours since window start) of every whole local hour divisible by [`TICK_HOURS`]
#[must_use]
pub fn tick_offsets(window: &TimeWindow, timezone: Tz) -> Vec<f64> {
    let mut ticks = Vec::new();
    let mut t = next_local_hour(window.start, timezone);
    while t <= window.end {
        if t.with_timezone(&timezone).hour() % TICK_HOURS == 0 {
            ticks.push(window.offset_hours(t));
        }
        t = next_local_hour(t + Duration::minutes(1), timezone);
    }
    ticks
}

/// First instant at or after `t` that reads as a whole hour on the local clock
fn next_local_hour(t: DateTime<Utc>, timezone: Tz) -> DateTime<Utc> {
    let local = t.with_timezone(&timezone);
    let past_hour = Duration::minutes(i64::from(local.minute()))
        + Duration::seconds(i64::from(local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    if past_hour.is_zero() { t } else { t - past_hour + Duration::hours(1) }
}

/// X axis in hours since the window start whose key points are the local tick hours
#[derive(Clone)]
pub struct TimeAxis {
    hours: RangedCoordf64,
    ticks: Vec<f64>,
}

impl TimeAxis {
    #[must_use]
    pub fn new(window: &TimeWindow, timezone: Tz) -> Self {
        let span = window.duration().num_seconds() as f64 / 3600.0;
        Self {
            hours: RangedCoordf64::from(0.0..span),
            ticks: tick_offsets(window, timezone),
        }
    }
}

impl Ranged for TimeAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.hours.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, _hint: Hint) -> Vec<f64> {
        self.ticks.clone()
    }

    fn range(&self) -> Range<f64> {
        self.hours.range()
    }
}

/// Local 12-hour clock label; noon carries the weekday, midnight a day separator
#[must_use]
pub fn time_label(t: DateTime<Utc>, timezone: Tz) -> String {
    let local = t.with_timezone(&timezone);
    let hour = local.format("%-I").to_string();
    match local.hour() {
        12 => format!("{hour} {}", local.format("%a")),
        0 => format!("| {hour}"),
        _ => hour,
    }
}

/// "Stargazing Forecast for (39.236°N, 120.026°W)"
#[must_use]
pub fn title(location: &Location) -> String {
    format!("Stargazing Forecast for ({})", location.format_hemispheres())
}

/// Local date shown under the title, e.g. "March 1, 2024"
#[must_use]
pub fn local_date(now: DateTime<Utc>, timezone: Tz) -> String {
    now.with_timezone(&timezone).format("%B %-d, %Y").to_string()
}

/// Indices of strict local maxima and minima of `values`
#[must_use]
pub fn local_extrema(values: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for (i, w) in values.windows(3).enumerate() {
        if w[1] > w[0] && w[1] > w[2] {
            highs.push(i + 1);
        } else if w[1] < w[0] && w[1] < w[2] {
            lows.push(i + 1);
        }
    }
    (highs, lows)
}

/// Highs and lows after `now` as (offset hours, value, is_high)
#[must_use]
pub fn upcoming_extrema(series: &TimeSeries, window: &TimeWindow, now: DateTime<Utc>) -> Vec<(f64, f64, bool)> {
    let samples = series.samples();
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let (highs, lows) = local_extrema(&values);
    let mut marks: Vec<(f64, f64, bool)> = highs
        .into_iter()
        .map(|i| (i, true))
        .chain(lows.into_iter().map(|i| (i, false)))
        .filter(|(i, _)| samples[*i].time > now && window.contains(samples[*i].time))
        .map(|(i, high)| (window.offset_hours(samples[i].time), samples[i].value, high))
        .collect();
    marks.sort_by(|a, b| a.0.total_cmp(&b.0));
    marks
}

/// Spans (start, end offset hours) where the sun altitude is below `threshold`.
/// Each sample covers the interval up to the next one.
#[must_use]
pub fn spans_below(sun_altitude: &TimeSeries, window: &TimeWindow, threshold: f64) -> Vec<(f64, f64)> {
    let samples = sun_altitude.samples();
    let mut spans: Vec<(f64, f64)> = Vec::new();
    for (i, sample) in samples.iter().enumerate() {
        if sample.value >= threshold {
            continue;
        }
        let start = window.offset_hours(sample.time);
        let end = match samples.get(i + 1) {
            Some(next) => window.offset_hours(next.time),
            None => window.offset_hours(sample.time + sample.valid_for().unwrap_or_else(|| Duration::hours(1))),
        };
        match spans.last_mut() {
            Some(last) if (last.1 - start).abs() < 1e-9 => last.1 = end,
            _ => spans.push((start, end)),
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSource, Parameter, Sample};
    use crate::units::Unit;
    use chrono::TimeZone;
    use rstest::rstest;

    fn window() -> TimeWindow {
        TimeWindow::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), 24)
    }

    #[test]
    fn test_tick_offsets_follow_local_time() {
        // 00 UTC is 09:00 in Tokyo
        let ticks = tick_offsets(&window(), chrono_tz::Asia::Tokyo);
        assert_eq!(ticks.first(), Some(&0.0));
        assert_eq!(ticks.len(), 9);
        assert!(ticks.windows(2).all(|w| (w[1] - w[0] - 3.0).abs() < 1e-9));

        // 00 UTC is 16:00 Pacific, the first tick is 18:00
        let ticks = tick_offsets(&window(), chrono_tz::US::Pacific);
        assert_eq!(ticks.first(), Some(&2.0));
        assert_eq!(ticks.len(), 8);
    }

    #[rstest]
    #[case(chrono_tz::Asia::Kolkata, 0.5)]
    #[case(chrono_tz::Asia::Kathmandu, 0.25)]
    fn test_tick_offsets_off_hour_zones(#[case] timezone: Tz, #[case] first: f64) {
        let window = window();
        let ticks = tick_offsets(&window, timezone);
        assert_eq!(ticks.first(), Some(&first));
        assert_eq!(ticks.len(), 8);
        for tick in ticks {
            let local = window.time_at_offset(tick).with_timezone(&timezone);
            assert_eq!(local.minute(), 0);
            assert_eq!(local.hour() % TICK_HOURS, 0);
        }
    }

    #[test]
    fn test_ticks_across_dst_change() {
        // US clocks spring forward on 10 March 2024
        let window = TimeWindow::starting_at(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(), 24);
        let ticks = tick_offsets(&window, chrono_tz::US::Pacific);
        let hours: Vec<u32> = ticks
            .iter()
            .map(|t| window.time_at_offset(*t).with_timezone(&chrono_tz::US::Pacific).hour())
            .collect();
        assert_eq!(hours, vec![18, 21, 0, 3, 6, 9, 12, 15]);
    }

    #[test]
    fn test_time_axis_key_points_are_ticks() {
        let axis = TimeAxis::new(&window(), chrono_tz::Asia::Tokyo);
        assert_eq!(axis.range(), 0.0..24.0);
        assert_eq!(axis.key_points(10usize), tick_offsets(&window(), chrono_tz::Asia::Tokyo));
        assert_eq!(axis.map(&0.0, (0, 240)), 0);
        assert_eq!(axis.map(&12.0, (0, 240)), 120);
    }

    #[rstest]
    #[case(20, "12 Fri")]
    #[case(8, "| 12")]
    #[case(23, "3")]
    fn test_time_label(#[case] utc_hour: u32, #[case] expected: &str) {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, utc_hour, 0, 0).unwrap();
        assert_eq!(time_label(t, chrono_tz::US::Pacific), expected);
    }

    #[test]
    fn test_title_uses_hemispheres() {
        let location = Location::new(39.236, -120.026, chrono_tz::US::Pacific, 1980.0).unwrap();
        let title = title(&location);
        assert!(title.starts_with("Stargazing Forecast for ("));
        assert!(title.contains("N"));
        assert!(title.contains("W"));
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap();
        assert_eq!(local_date(now, chrono_tz::US::Pacific), "March 1, 2024");
    }

    #[test]
    fn test_local_extrema() {
        let (highs, lows) = local_extrema(&[1.0, 3.0, 2.0, 2.0, 0.0, 4.0]);
        assert_eq!(highs, vec![1]);
        assert_eq!(lows, vec![4]);
        assert_eq!(local_extrema(&[1.0, 2.0]), (vec![], vec![]));
    }

    #[test]
    fn test_upcoming_extrema_skip_past() {
        let start = window().start;
        let samples = [10.0, 20.0, 15.0, 5.0, 12.0, 8.0]
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::at(start + Duration::hours(i as i64), *v))
            .collect();
        let series = TimeSeries::new(Parameter::Temperature, Unit::Fahrenheit, DataSource::Nws, samples);
        let now = start + Duration::minutes(90);
        let marks = upcoming_extrema(&series, &window(), now);
        assert_eq!(marks, vec![(3.0, 5.0, false), (4.0, 12.0, true)]);
    }

    #[test]
    fn test_spans_below() {
        let start = window().start;
        let samples = [5.0, -1.0, -20.0, -19.0, 2.0, -3.0]
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::at(start + Duration::hours(i as i64), *v))
            .collect();
        let sun = TimeSeries::new(Parameter::SunAltitude, Unit::Degrees, DataSource::Ephemeris, samples);
        assert_eq!(spans_below(&sun, &window(), 0.0), vec![(1.0, 4.0), (5.0, 6.0)]);
        assert_eq!(spans_below(&sun, &window(), -18.0), vec![(2.0, 4.0)]);
    }
}
