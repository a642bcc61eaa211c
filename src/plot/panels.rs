//! The stacked forecast panels
//!
//! Every panel shares the x axis (hours since the window start) and draws a
//! dashed line at "now". Panels whose series are missing are left out.

use super::style::{
    ANNOTATION_SIZE, ASTRONOMICAL_NIGHT, AXES, DEWPOINT, FONT, GRID, GUST, INK, LABEL, LABEL_SIZE, MOON, NIGHT,
    PRECIPITATION, SUN, TICK_SIZE, cloud_color, kp_color, sky_quality_color,
};
use super::timeline::{self, TimeAxis};
use crate::bodies::{self, Body};
use crate::models::{Forecast, Parameter, Sample, TimeSeries, TimeWindow};
use crate::sources::kp::g_level;
use anyhow::Result;
use chrono::Duration;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

type PanelChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<TimeAxis, RangedCoordf64>>;

/// Width of the row label column on the left of each panel
const LABEL_WIDTH: u32 = 130;
const X_LABEL_HEIGHT: u32 = 34;
const Y_LABEL_WIDTH: u32 = 40;
/// Number of dashes in the "now" line
const NOW_DASHES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    CloudCover,
    Transparency,
    Seeing,
    Kp,
    Altitude,
    Temperature,
    Wind,
}

impl Panel {
    /// Top to bottom
    pub const ALL: [Panel; 7] = [
        Panel::CloudCover,
        Panel::Transparency,
        Panel::Seeing,
        Panel::Kp,
        Panel::Altitude,
        Panel::Temperature,
        Panel::Wind,
    ];

    fn parameters(self) -> &'static [Parameter] {
        match self {
            Panel::CloudCover => &[Parameter::CloudCover, Parameter::PrecipitationProbability],
            Panel::Transparency => &[Parameter::Transparency],
            Panel::Seeing => &[Parameter::Seeing],
            Panel::Kp => &[Parameter::KpIndex],
            Panel::Altitude => &[Parameter::SunAltitude, Parameter::MoonAltitude],
            Panel::Temperature => &[Parameter::Temperature, Parameter::Dewpoint],
            Panel::Wind => &[Parameter::WindSpeed, Parameter::WindGust],
        }
    }

    /// Whether any series this panel draws is present
    #[must_use]
    pub fn available(self, forecast: &Forecast) -> bool {
        self.parameters().iter().any(|p| forecast.has(*p))
    }

    #[must_use]
    pub fn label(self, forecast: &Forecast) -> String {
        match self {
            Panel::CloudCover => "Cloud cover".to_string(),
            Panel::Transparency => "Transparency".to_string(),
            Panel::Seeing => "Seeing".to_string(),
            Panel::Kp => "Kp".to_string(),
            Panel::Altitude => "Altitude".to_string(),
            Panel::Temperature => "Temp/Dewpoint".to_string(),
            Panel::Wind => {
                let unit = [Parameter::WindSpeed, Parameter::WindGust]
                    .iter()
                    .find_map(|p| forecast.get(*p).and_then(|s| s.unit.wind()));
                match unit {
                    Some(unit) => format!("Wind ({})", unit.label()),
                    None => "Wind".to_string(),
                }
            }
        }
    }

    /// Vertical extent of the panel
    #[must_use]
    pub fn y_range(self, forecast: &Forecast) -> Range<f64> {
        match self {
            Panel::CloudCover | Panel::Transparency | Panel::Seeing => 0.0..1.0,
            Panel::Kp => {
                let max = forecast.get(Parameter::KpIndex).and_then(TimeSeries::max_value).unwrap_or(0.0);
                0.0..max.max(9.0)
            }
            Panel::Altitude => -90.0..90.0,
            Panel::Temperature => {
                let values: Vec<f64> = [Parameter::Temperature, Parameter::Dewpoint]
                    .iter()
                    .filter_map(|p| forecast.get(*p))
                    .flat_map(TimeSeries::values)
                    .collect();
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if !min.is_finite() || !max.is_finite() {
                    return 0.0..1.0;
                }
                let pad = ((max - min) * 0.15).max(2.0);
                (min - pad)..(max + pad)
            }
            Panel::Wind => {
                let peak = [Parameter::WindGust, Parameter::WindSpeed]
                    .iter()
                    .find_map(|p| forecast.get(*p).and_then(TimeSeries::max_value))
                    .unwrap_or(0.0);
                0.0..(1.1 * peak).max(1.0)
            }
        }
    }

    fn shows_y_labels(self) -> bool {
        matches!(self, Panel::Temperature | Panel::Wind)
    }
}

/// Panels with data, in drawing order; the altitude panel is always drawn
#[must_use]
pub fn panels_for(forecast: &Forecast) -> Vec<Panel> {
    Panel::ALL
        .into_iter()
        .filter(|p| *p == Panel::Altitude || p.available(forecast))
        .collect()
}

fn hours(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 3600.0
}

/// Bar extent of a resampled sample in offset hours
fn bar_span(sample: &Sample, window: &TimeWindow) -> (f64, f64) {
    let start = window.offset_hours(sample.time);
    let width = sample.valid_for().map_or(1.0, hours);
    (start, (start + width).min(hours(window.duration())))
}

fn points(series: &TimeSeries, window: &TimeWindow) -> Vec<(f64, f64)> {
    series
        .samples()
        .iter()
        .map(|s| (window.offset_hours(s.time), s.value))
        .collect()
}

/// Draw one panel into `area`; the time axis labels only when `x_labels`
pub fn draw_panel<DB>(area: &DrawingArea<DB, Shift>, panel: Panel, forecast: &Forecast, x_labels: bool) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let window = forecast.window;
    let timezone = forecast.location.timezone;
    let span = hours(window.duration());
    let y_range = panel.y_range(forecast);

    let (label_area, plot_area) = area.split_horizontally(LABEL_WIDTH);
    let (_, height) = label_area.dim_in_pixel();
    let label_style = (FONT, LABEL_SIZE).into_font().color(&LABEL);
    let label_y = if x_labels { height.saturating_sub(X_LABEL_HEIGHT) / 2 } else { height / 2 };
    label_area.draw_text(&panel.label(forecast), &label_style, (8, label_y as i32 - LABEL_SIZE as i32 / 2))?;

    let mut chart = ChartBuilder::on(&plot_area)
        .margin_right(16)
        .x_label_area_size(if x_labels { X_LABEL_HEIGHT } else { 0 })
        .y_label_area_size(if panel.shows_y_labels() { Y_LABEL_WIDTH } else { 0 })
        .build_cartesian_2d(TimeAxis::new(&window, timezone), y_range.clone())?;
    chart.plotting_area().fill(&AXES)?;

    let formatter = |x: &f64| timeline::time_label(window.time_at_offset(*x), timezone);
    let no_label = |_: &f64| String::new();
    let y_formatter = |y: &f64| format!("{y:.0}");
    let mut mesh = chart.configure_mesh();
    mesh.disable_y_mesh()
        .bold_line_style(GRID)
        .light_line_style(TRANSPARENT)
        .axis_style(INK)
        .x_label_style((FONT, TICK_SIZE).into_font().color(&LABEL))
        .y_label_style((FONT, TICK_SIZE).into_font().color(&LABEL))
        .y_labels(if panel.shows_y_labels() { 4 } else { 0 })
        .y_label_formatter(&y_formatter);
    if x_labels {
        mesh.x_label_formatter(&formatter);
    } else {
        mesh.x_label_formatter(&no_label);
    }
    mesh.draw()?;

    match panel {
        Panel::CloudCover => draw_cloud_cover(&mut chart, forecast)?,
        Panel::Transparency => draw_sky_quality(&mut chart, forecast, Parameter::Transparency)?,
        Panel::Seeing => draw_sky_quality(&mut chart, forecast, Parameter::Seeing)?,
        Panel::Kp => draw_kp(&mut chart, forecast)?,
        Panel::Altitude => draw_altitude(&mut chart, forecast)?,
        Panel::Temperature => draw_temperature(&mut chart, forecast, &y_range)?,
        Panel::Wind => draw_wind(&mut chart, forecast)?,
    }

    let now = window.offset_hours(forecast.generated_at);
    if (0.0..=span).contains(&now) {
        draw_now_line(&mut chart, now, &y_range)?;
    }
    Ok(())
}

fn draw_now_line<DB>(chart: &mut PanelChart<'_, DB>, now: f64, y_range: &Range<f64>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let dash = (y_range.end - y_range.start) / (2 * NOW_DASHES) as f64;
    chart.draw_series((0..NOW_DASHES).map(|i| {
        let y0 = y_range.start + 2.0 * i as f64 * dash;
        PathElement::new(vec![(now, y0), (now, y0 + dash)], INK.stroke_width(2))
    }))?;
    Ok(())
}

fn draw_cloud_cover<DB>(chart: &mut PanelChart<'_, DB>, forecast: &Forecast) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let window = &forecast.window;
    if let Some(cloud) = forecast.get(Parameter::CloudCover) {
        chart.draw_series(cloud.samples().iter().map(|s| {
            let (x0, x1) = bar_span(s, window);
            Rectangle::new([(x0, 0.0), (x1, 1.0)], cloud_color(s.value).filled())
        }))?;
    }
    if let Some(precipitation) = forecast.get(Parameter::PrecipitationProbability) {
        let bars: Vec<((f64, f64), f64)> = precipitation
            .samples()
            .iter()
            .filter(|s| s.value > 0.0)
            .map(|s| (bar_span(s, window), (s.value / 100.0).clamp(0.0, 1.0)))
            .collect();
        chart.draw_series(
            bars.iter()
                .map(|((x0, x1), p)| Rectangle::new([(*x0, 0.0), (*x1, *p)], PRECIPITATION.filled())),
        )?;
        chart.draw_series(
            bars.iter()
                .map(|((x0, x1), p)| Rectangle::new([(*x0, 0.0), (*x1, *p)], INK.stroke_width(1))),
        )?;
    }
    Ok(())
}

fn draw_sky_quality<DB>(chart: &mut PanelChart<'_, DB>, forecast: &Forecast, parameter: Parameter) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let Some(series) = forecast.get(parameter) else {
        return Ok(());
    };
    let window = &forecast.window;
    chart.draw_series(series.samples().iter().map(|s| {
        let (x0, x1) = bar_span(s, window);
        Rectangle::new([(x0, 0.0), (x1, 1.0)], sky_quality_color(s.value).filled())
    }))?;
    Ok(())
}

/// Merge consecutive equal Kp grid samples back into their 3-hour bars
fn kp_bars(series: &TimeSeries, window: &TimeWindow) -> Vec<(f64, f64, f64)> {
    let mut bars: Vec<(f64, f64, f64)> = Vec::new();
    for sample in series.samples() {
        let (x0, x1) = bar_span(sample, window);
        match bars.last_mut() {
            Some(last) if (last.1 - x0).abs() < 1e-9 && (last.2 - sample.value).abs() < 1e-9 => last.1 = x1,
            _ => bars.push((x0, x1, sample.value)),
        }
    }
    bars
}

fn draw_kp<DB>(chart: &mut PanelChart<'_, DB>, forecast: &Forecast) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let Some(kp) = forecast.get(Parameter::KpIndex) else {
        return Ok(());
    };
    let bars = kp_bars(kp, &forecast.window);
    chart.draw_series(
        bars.iter()
            .map(|(x0, x1, k)| Rectangle::new([(*x0, 0.0), (*x1, *k)], kp_color(*k).filled())),
    )?;
    chart.draw_series(
        bars.iter()
            .map(|(x0, x1, k)| Rectangle::new([(*x0, 0.0), (*x1, *k)], INK.stroke_width(1))),
    )?;
    let style = (FONT, ANNOTATION_SIZE).into_font().color(&INK);
    chart.draw_series(bars.iter().filter_map(|(x0, x1, k)| {
        let level = g_level(*k);
        (!level.scale.is_empty())
            .then(|| Text::new(level.scale.to_string(), (x0 + (x1 - x0) / 4.0, 0.5), style.clone()))
    }))?;
    Ok(())
}

fn draw_altitude<DB>(chart: &mut PanelChart<'_, DB>, forecast: &Forecast) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let window = &forecast.window;
    let span = hours(window.duration());
    if let Some(sun) = forecast.get(Parameter::SunAltitude) {
        for (threshold, color) in [(0.0, NIGHT), (-18.0, ASTRONOMICAL_NIGHT)] {
            let spans = timeline::spans_below(sun, window, threshold);
            chart.draw_series(
                spans
                    .iter()
                    .map(|(x0, x1)| Rectangle::new([(*x0, -90.0), (*x1, 90.0)], color.filled())),
            )?;
        }
    }
    chart.draw_series(LineSeries::new(vec![(0.0, 0.0), (span, 0.0)], INK.stroke_width(1)))?;

    if let Some(sun) = forecast.get(Parameter::SunAltitude) {
        chart.draw_series(LineSeries::new(points(sun, window), SUN.stroke_width(2)))?;
    }
    if let Some(moon) = forecast.get(Parameter::MoonAltitude) {
        chart.draw_series(LineSeries::new(points(moon, window), MOON.stroke_width(2)))?;
    }

    let now = forecast.generated_at;
    let x = window.offset_hours(now);
    if (0.0..=span).contains(&x) {
        let location = &forecast.location;
        let sun_altitude = bodies::altitude(Body::Sun, now, location);
        let moon_altitude = bodies::altitude(Body::Moon, now, location);
        chart.draw_series(std::iter::once(Circle::new((x, sun_altitude), 8, SUN.filled())))?;

        // brighter disk for a fuller moon
        let shade = (40.0 + 200.0 * forecast.moon.illumination).round().clamp(0.0, 255.0) as u8;
        let disk = RGBColor(shade, shade, shade);
        chart.draw_series(std::iter::once(Circle::new((x, moon_altitude), 8, disk.filled())))?;
        chart.draw_series(std::iter::once(Circle::new((x, moon_altitude), 8, INK.stroke_width(1))))?;
        let style = (FONT, ANNOTATION_SIZE)
            .into_font()
            .color(&INK)
            .pos(Pos::new(HPos::Left, VPos::Center));
        chart.draw_series(std::iter::once(Text::new(
            format!("{} {:.0}%", forecast.moon.phase, forecast.moon.illumination_percent()),
            (x + span / 80.0, moon_altitude),
            style,
        )))?;
    }
    Ok(())
}

fn draw_temperature<DB>(chart: &mut PanelChart<'_, DB>, forecast: &Forecast, y_range: &Range<f64>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let window = &forecast.window;
    if let Some(dewpoint) = forecast.get(Parameter::Dewpoint) {
        chart.draw_series(LineSeries::new(points(dewpoint, window), DEWPOINT.stroke_width(2)))?;
    }
    let Some(temperature) = forecast.get(Parameter::Temperature) else {
        return Ok(());
    };
    chart.draw_series(LineSeries::new(points(temperature, window), MOON.stroke_width(2)))?;

    let symbol = temperature.unit.temperature().map_or("", |u| u.symbol());
    let offset = (y_range.end - y_range.start) * 0.06;
    let base = (FONT, ANNOTATION_SIZE).into_font().color(&INK);
    let marks = timeline::upcoming_extrema(temperature, window, forecast.generated_at);
    chart.draw_series(marks.iter().map(|(x, value, high)| {
        let label = format!("{value:.0}°{symbol}");
        if *high {
            Text::new(label, (*x, value - offset), base.pos(Pos::new(HPos::Center, VPos::Top)))
        } else {
            Text::new(label, (*x, *value), base.pos(Pos::new(HPos::Center, VPos::Bottom)))
        }
    }))?;
    Ok(())
}

fn draw_wind<DB>(chart: &mut PanelChart<'_, DB>, forecast: &Forecast) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let window = &forecast.window;
    if let Some(speed) = forecast.get(Parameter::WindSpeed) {
        chart.draw_series(LineSeries::new(points(speed, window), MOON.stroke_width(2)))?;
    }
    if let Some(gust) = forecast.get(Parameter::WindGust) {
        chart.draw_series(
            points(gust, window)
                .into_iter()
                .map(|p| Circle::new(p, 2, GUST.filled())),
        )?;
    }
    Ok(())
}
