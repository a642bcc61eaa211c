//! Forecast chart rendering with plotters
//!
//! The forecast is written twice from the same drawing code: a PNG image and
//! an SVG file that is opened in the system viewer.

pub mod kp_chart;
pub mod panels;
pub mod style;
pub mod timeline;

use crate::ForecastError;
use crate::models::{Forecast, TimeSeries};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::{debug, info};

pub use panels::{Panel, panels_for};

/// Height reserved for the two title lines
const TITLE_HEIGHT: u32 = 80;

fn render_error(path: &Path, e: impl std::fmt::Display) -> ForecastError {
    ForecastError::render(format!("{}: {e}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<(), ForecastError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

fn draw_forecast<DB>(root: &DrawingArea<DB, Shift>, forecast: &Forecast) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&style::BACKGROUND)?;
    let (header, body) = root.split_vertically(TITLE_HEIGHT);
    let (width, _) = header.dim_in_pixel();
    let centered = Pos::new(HPos::Center, VPos::Top);
    let title_style = (style::FONT, style::TITLE_SIZE)
        .into_font()
        .color(&style::LABEL)
        .pos(centered);
    let date_style = (style::FONT, style::LABEL_SIZE)
        .into_font()
        .color(&style::LABEL)
        .pos(centered);
    let center = (width / 2) as i32;
    header.draw_text(&timeline::title(&forecast.location), &title_style, (center, 12))?;
    header.draw_text(
        &timeline::local_date(forecast.generated_at, forecast.location.timezone),
        &date_style,
        (center, 16 + style::TITLE_SIZE as i32),
    )?;

    let panels = panels_for(forecast);
    let rows = body.split_evenly((panels.len(), 1));
    let last = panels.len().saturating_sub(1);
    for (i, (panel, area)) in panels.iter().zip(rows.iter()).enumerate() {
        debug!(panel = ?panel, "Drawing panel");
        panels::draw_panel(area, *panel, forecast, i == last)?;
    }
    root.present()?;
    Ok(())
}

/// Write the forecast chart as a PNG image
pub fn render_png(forecast: &Forecast, path: &Path, size: (u32, u32)) -> Result<(), ForecastError> {
    ensure_parent(path)?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    draw_forecast(&root, forecast).map_err(|e| render_error(path, e))?;
    info!(path = %path.display(), "Forecast image written");
    Ok(())
}

/// Write the forecast chart as an SVG document
pub fn render_svg(forecast: &Forecast, path: &Path, size: (u32, u32)) -> Result<(), ForecastError> {
    ensure_parent(path)?;
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_forecast(&root, forecast).map_err(|e| render_error(path, e))?;
    info!(path = %path.display(), "Forecast view written");
    Ok(())
}

/// Write the standalone Kp bar chart as a PNG image
pub fn render_kp_chart(series: &TimeSeries, path: &Path, size: (u32, u32)) -> Result<(), ForecastError> {
    ensure_parent(path)?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    kp_chart::draw_kp_chart(&root, series).map_err(|e| render_error(path, e))?;
    info!(path = %path.display(), "Kp chart written");
    Ok(())
}

/// Open a rendered file in the system viewer
pub fn show(path: &Path) -> Result<(), ForecastError> {
    open::that(path).map_err(|e| render_error(path, format!("could not open viewer: {e}")))
}
