//! Throughput vs. parallelism chart.
//!
//! `.svg` output goes through the SVG backend, anything else is rendered as
//! a bitmap sized from the figure dimensions and DPI.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::aggregate::SeriesStats;
use crate::config::PlotConfig;
use crate::error::{BenchError, Result};

/// One input size in the chart.
#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub label: String,
    pub stats: SeriesStats,
}

/// Legend text for an input of `atoms` atoms, e.g. `32.4k AT`.
pub fn atoms_label(atoms: u64) -> String {
    format!("{:.1}k AT", atoms as f64 / 1000.0)
}

pub fn pixel_size(config: &PlotConfig) -> (u32, u32) {
    let dpi = f64::from(config.dpi);
    (
        (config.width_in * dpi).round() as u32,
        (config.height_in * dpi).round() as u32,
    )
}

/// Closed outline of the ±σ band: upper edge left to right, then the lower
/// edge back.
pub fn band_polygon(stats: &SeriesStats) -> Vec<(f64, f64)> {
    let xs: Vec<f64> = stats.parallels.iter().map(|p| *p as f64).collect();
    let upper = stats.upper();
    let lower = stats.lower();
    xs.iter()
        .copied()
        .zip(upper)
        .chain(xs.iter().copied().zip(lower).rev())
        .collect()
}

/// Axis ranges covering every band with a little headroom.
pub fn axis_ranges(series: &[PlotSeries]) -> ((f64, f64), (f64, f64)) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for s in series {
        for (px, py) in band_polygon(&s.stats) {
            x = (x.0.min(px), x.1.max(px));
            y = (y.0.min(py), y.1.max(py));
        }
    }
    let x_pad = ((x.1 - x.0) * 0.05).max(0.5);
    let y_pad = ((y.1 - y.0) * 0.05).max(1.0);
    ((x.0 - x_pad, x.1 + x_pad), ((y.0 - y_pad).min(0.0), y.1 + y_pad))
}

pub fn render_chart(path: &Path, series: &[PlotSeries], config: &PlotConfig) -> Result<()> {
    if series.is_empty() || series.iter().any(|s| s.stats.parallels.is_empty()) {
        return Err(BenchError::Plot("nothing to plot".to_string()));
    }
    let size = pixel_size(config);
    let is_svg = path.extension().map(|e| e == "svg").unwrap_or(false);
    if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw(&root, series, config)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw(&root, series, config)?;
        root.present()?;
    }
    Ok(())
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &[PlotSeries],
    config: &PlotConfig,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    // fonts scale with resolution so 7pt stays 7pt
    let pt = |points: f64| (points * f64::from(config.dpi) / 72.0).max(1.0);
    let ((x_min, x_max), (y_min, y_max)) = axis_ranges(series);
    // integer axis so the ticks land exactly on the swept parallelism levels
    let x_range = (x_min.floor() as i32)..(x_max.ceil() as i32);
    let ticks: Vec<i32> = series
        .last()
        .map(|s| s.stats.parallels.iter().map(|p| *p as i32).collect())
        .unwrap_or_default();

    let mut chart = ChartBuilder::on(root)
        .margin(pt(4.0) as u32)
        .x_label_area_size(pt(20.0) as u32)
        .y_label_area_size(pt(28.0) as u32)
        .build_cartesian_2d(x_range.with_key_points(ticks), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(config.x_label.as_str())
        .y_desc(config.y_label.as_str())
        .label_style(("sans-serif", pt(8.0)))
        .axis_desc_style(("sans-serif", pt(9.0)))
        .draw()?;

    let marker = pt(2.0) as i32;
    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(i32, f64)> = s
            .stats
            .parallels
            .iter()
            .zip(&s.stats.mean)
            .map(|(p, m)| (*p as i32, *m))
            .collect();
        let band: Vec<(i32, f64)> = band_polygon(&s.stats)
            .into_iter()
            .map(|(x, y)| (x as i32, y))
            .collect();

        chart.draw_series(std::iter::once(Polygon::new(band, color.mix(0.5).filled())))?;
        chart.draw_series(LineSeries::new(
            points.iter().copied(),
            color.stroke_width(pt(1.0) as u32),
        ))?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|p| Circle::new(*p, marker, color.filled())),
            )?
            .label(s.label.as_str())
            .legend(move |(x, y)| Circle::new((x, y), marker, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", pt(7.0)))
        .background_style(WHITE.mix(0.0))
        .border_style(BLACK.mix(0.0))
        .draw()?;

    Ok(())
}
