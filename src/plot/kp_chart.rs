//! Standalone planetary K-index bar chart

use super::style::{AXES, FONT, GRID, INK, LABEL_SIZE, TICK_SIZE, TITLE_SIZE, kp_color};
use crate::models::TimeSeries;
use crate::sources::kp::{G_THRESHOLDS, KP_BIN_HOURS};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;

/// Bars as (start offset hours, end offset hours, Kp) from the first bin
#[must_use]
pub fn kp_bars(series: &TimeSeries) -> Vec<(f64, f64, f64)> {
    let Some(first) = series.samples().first() else {
        return Vec::new();
    };
    let origin = first.time;
    series
        .samples()
        .iter()
        .map(|s| {
            let start = (s.time - origin).num_seconds() as f64 / 3600.0;
            let width = s.valid_for().unwrap_or_else(|| Duration::hours(KP_BIN_HOURS));
            (start, start + width.num_seconds() as f64 / 3600.0, s.value)
        })
        .collect()
}

/// Draw the Kp chart with G1..G5 reference lines
pub fn draw_kp_chart<DB>(root: &DrawingArea<DB, Shift>, series: &TimeSeries) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let bars = kp_bars(series);
    let first = series
        .samples()
        .first()
        .ok_or_else(|| anyhow!("no Kp values to plot"))?;
    let origin: DateTime<Utc> = first.time;
    let last_end = bars.last().map_or(0.0, |b| b.1);
    // room on the right for the G labels
    let x_end = last_end + 5.0 * KP_BIN_HOURS as f64;
    let y_end = series.max_value().unwrap_or(0.0).max(9.0);

    root.fill(&AXES)?;
    let mut chart = ChartBuilder::on(root)
        .caption("Planetary K-index", (FONT, TITLE_SIZE).into_font().color(&INK))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(0f64..x_end, 0f64..y_end)?;

    let formatter = |x: &f64| {
        let t = origin + Duration::seconds((*x * 3600.0) as i64);
        t.format("%b %d %H:%M").to_string()
    };
    chart
        .configure_mesh()
        .bold_line_style(GRID)
        .light_line_style(TRANSPARENT)
        .axis_style(INK)
        .x_desc("Time (UTC)")
        .y_desc("Kp")
        .x_labels(8)
        .x_label_formatter(&formatter)
        .label_style((FONT, TICK_SIZE).into_font().color(&INK))
        .axis_desc_style((FONT, LABEL_SIZE).into_font().color(&INK))
        .draw()?;

    chart.draw_series(
        bars.iter()
            .map(|(x0, x1, k)| Rectangle::new([(*x0, 0.0), (*x1, *k)], kp_color(*k).filled())),
    )?;
    chart.draw_series(
        bars.iter()
            .map(|(x0, x1, k)| Rectangle::new([(*x0, 0.0), (*x1, *k)], INK.stroke_width(1))),
    )?;

    let label_style = (FONT, TICK_SIZE).into_font().color(&INK);
    for (i, threshold) in G_THRESHOLDS.iter().enumerate() {
        let color = kp_color(*threshold);
        chart.draw_series(LineSeries::new(vec![(0.0, *threshold), (x_end, *threshold)], color.stroke_width(2)))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("G{}", i + 1),
            (last_end + KP_BIN_HOURS as f64 / 3.0, threshold + 0.05),
            label_style.clone(),
        )))?;
    }
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSource, Parameter, Sample};
    use crate::units::Unit;
    use chrono::TimeZone;

    #[test]
    fn test_kp_bars() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let samples = vec![
            Sample::interval(start, 2.33, Duration::hours(3)),
            Sample::interval(start + Duration::hours(3), 5.0, Duration::hours(3)),
        ];
        let series = TimeSeries::new(Parameter::KpIndex, Unit::Index, DataSource::Swpc, samples);
        assert_eq!(kp_bars(&series), vec![(0.0, 3.0, 2.33), (3.0, 6.0, 5.0)]);
    }

    #[test]
    fn test_kp_bars_empty() {
        let series = TimeSeries::new(Parameter::KpIndex, Unit::Index, DataSource::Swpc, vec![]);
        assert!(kp_bars(&series).is_empty());
    }
}
