//! Multi-axis time chart: concurrency (left), P95 latency (right), CPU (far right).
//!
//! - Output backend chosen by extension: `.svg` → SVG, anything else → bitmap (PNG).
//! - Absent bucket values break the line; nothing is interpolated across a gap.
//! - CPU axis and series are dropped entirely when no CPU sample was collected.
//!
//! Layout decisions live in [`ChartLayout`]; [`render_chart`] only draws them.

use std::{mem, ops::Range, path::Path};

use chrono::{Local, TimeZone};
use log::info;
use plotters::{coord::Shift, drawing::DrawingAreaErrorKind, prelude::*};

use crate::{
    analysis::bucketing::AlignedSeries,
    error::{AnalysisError, Result},
    ingest::environment::EnvironmentMetadata,
    report::ensure_parent_dir,
};

pub const CANVAS_SIZE: (u32, u32) = (1600, 900);
pub const CPU_AXIS_MARGIN: f64 = 20.0;
pub const NO_METADATA_CAPTION: &str = "Environment metadata unavailable";
pub const CHART_TITLE: &str = "Load test: concurrency, P95 latency and CPU over time";

const MARGIN: i32 = 15;
const X_LABEL_AREA: i32 = 50;
const Y_LABEL_AREA: i32 = 80;
const CPU_STRIP_PX: i32 = 90;
const HEADER_LINE_PX: i32 = 22;

const CONCURRENCY_COLOR: RGBColor = RGBColor(31, 119, 180);
const LATENCY_COLOR: RGBColor = RGBColor(214, 39, 40);
const CPU_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Everything the renderer decides before touching a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub title: String,
    pub header: Vec<String>,
    /// Bucket start times in epoch ms.
    pub x_range: Range<i64>,
    pub concurrency_upper: f64,
    pub latency_upper: f64,
    /// `None` when the run has no CPU data; the CPU axis is then omitted.
    pub cpu_upper: Option<f64>,
}

impl ChartLayout {
    pub fn new(series: &AlignedSeries, env: Option<&EnvironmentMetadata>) -> Self {
        let x_range = match (series.buckets.first(), series.buckets.last()) {
            (Some(&first), Some(&last)) => {
                series.bucket_start_ms(first)..series.bucket_start_ms(last) + series.width_ms
            }
            _ => 0..series.width_ms,
        };

        let cpu_upper = series
            .cpu_max
            .iter()
            .flatten()
            .copied()
            .reduce(f64::max)
            .map(cpu_axis_upper);

        Self {
            title: CHART_TITLE.to_string(),
            header: header_lines(env),
            x_range,
            concurrency_upper: padded_upper(&series.concurrency_max),
            latency_upper: padded_upper(&series.latency_p95),
            cpu_upper,
        }
    }
}

/// Observed max rounded up to the next hundred, plus a fixed visual margin.
pub fn cpu_axis_upper(observed_max: f64) -> f64 {
    (observed_max / 100.0).ceil() * 100.0 + CPU_AXIS_MARGIN
}

fn padded_upper(values: &[Option<f64>]) -> f64 {
    let max = values.iter().flatten().copied().fold(0.0, f64::max);
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

pub fn header_lines(env: Option<&EnvironmentMetadata>) -> Vec<String> {
    let Some(env) = env else {
        return vec![NO_METADATA_CAPTION.to_string()];
    };

    let lines: Vec<String> = [
        env.test_date_local.as_ref().map(|d| format!("Test date: {}", d)),
        env.describe_host(),
        env.describe_container(),
        env.describe_versions(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if lines.is_empty() {
        vec![NO_METADATA_CAPTION.to_string()]
    } else {
        lines
    }
}

/// Splits a series into runs of adjacent buckets with data.
///
/// A run ends at an absent value or at a hole in the bucket axis.
pub fn gap_segments(series: &AlignedSeries, values: &[Option<f64>]) -> Vec<Vec<(i64, f64)>> {
    let mut segments = Vec::new();
    let mut current: Vec<(i64, f64)> = Vec::new();
    let mut last_idx: Option<i64> = None;

    for (&idx, value) in series.buckets.iter().zip(values) {
        match value {
            Some(v) => {
                if !current.is_empty() && last_idx.is_some_and(|l| l + 1 != idx) {
                    segments.push(mem::take(&mut current));
                }
                current.push((series.bucket_start_ms(idx), *v));
                last_idx = Some(idx);
            }
            None => {
                if !current.is_empty() {
                    segments.push(mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

pub fn format_clock(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn render_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> AnalysisError {
    AnalysisError::Render(err.to_string())
}

/// Renders the chart to `path`; `.svg` selects the SVG backend, otherwise a bitmap is written.
pub fn render_chart(
    path: &Path,
    series: &AlignedSeries,
    env: Option<&EnvironmentMetadata>,
    size: (u32, u32),
) -> Result<()> {
    ensure_parent_dir(path)?;
    let layout = ChartLayout::new(series, env);

    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    if is_svg {
        draw(SVGBackend::new(path, size).into_drawing_area(), &layout, series)?;
    } else {
        draw(BitMapBackend::new(path, size).into_drawing_area(), &layout, series)?;
    }

    info!("Chart written to {:?}", path);
    Ok(())
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    layout: &ChartLayout,
    series: &AlignedSeries,
) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;

    let header_px = 56 + HEADER_LINE_PX * layout.header.len() as i32;
    let (header, body) = root.split_vertically(header_px);

    header
        .draw(&Text::new(
            layout.title.clone(),
            (20, 12),
            ("sans-serif", 26).into_font().color(&BLACK),
        ))
        .map_err(render_err)?;
    for (i, line) in layout.header.iter().enumerate() {
        header
            .draw(&Text::new(
                line.clone(),
                (20, 46 + i as i32 * HEADER_LINE_PX),
                ("sans-serif", 16).into_font().color(&BLACK),
            ))
            .map_err(render_err)?;
    }

    // Plotters has one secondary axis; CPU gets its own strip to the right of latency.
    let (plot_area, cpu_strip) = match layout.cpu_upper {
        Some(_) => {
            let (width, _) = body.dim_in_pixel();
            let (main, strip) = body.split_horizontally((width as i32 - CPU_STRIP_PX).max(0));
            (main, Some(strip))
        }
        None => (body, None),
    };

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .right_y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(layout.x_range.clone(), 0f64..layout.concurrency_upper)
        .map_err(render_err)?
        .set_secondary_coord(layout.x_range.clone(), 0f64..layout.latency_upper);

    chart
        .configure_mesh()
        .x_labels(10)
        .x_label_formatter(&|ms| format_clock(*ms))
        .x_desc("Time (bucket start, local)")
        .y_desc("Concurrency (VUs)")
        .y_label_style(("sans-serif", 14).into_font().color(&CONCURRENCY_COLOR))
        .draw()
        .map_err(render_err)?;

    chart
        .configure_secondary_axes()
        .y_desc("P95 latency (ms)")
        .label_style(("sans-serif", 14).into_font().color(&LATENCY_COLOR))
        .draw()
        .map_err(render_err)?;

    for (i, seg) in gap_segments(series, &series.concurrency_max).into_iter().enumerate() {
        chart
            .draw_series(seg.iter().map(|&p| Circle::new(p, 3, CONCURRENCY_COLOR.filled())))
            .map_err(render_err)?;
        let anno = chart
            .draw_series(LineSeries::new(seg, CONCURRENCY_COLOR.stroke_width(2)))
            .map_err(render_err)?;
        if i == 0 {
            anno.label("Concurrency (max VUs)").legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], CONCURRENCY_COLOR.stroke_width(2))
            });
        }
    }

    for (i, seg) in gap_segments(series, &series.latency_p95).into_iter().enumerate() {
        chart
            .draw_secondary_series(seg.iter().map(|&p| Circle::new(p, 3, LATENCY_COLOR.filled())))
            .map_err(render_err)?;
        let anno = chart
            .draw_secondary_series(LineSeries::new(seg, LATENCY_COLOR.stroke_width(2)))
            .map_err(render_err)?;
        if i == 0 {
            anno.label("P95 latency (ms)").legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], LATENCY_COLOR.stroke_width(2))
            });
        }
    }

    if let (Some(strip), Some(cpu_upper)) = (cpu_strip, layout.cpu_upper) {
        // CPU points are drawn in latency units, rescaled against the CPU axis.
        let scale = layout.latency_upper / cpu_upper;
        for (i, seg) in gap_segments(series, &series.cpu_max).into_iter().enumerate() {
            let scaled: Vec<(i64, f64)> = seg.iter().map(|&(x, y)| (x, y * scale)).collect();
            chart
                .draw_secondary_series(
                    scaled.iter().map(|&p| Circle::new(p, 3, CPU_COLOR.filled())),
                )
                .map_err(render_err)?;
            let anno = chart
                .draw_secondary_series(LineSeries::new(scaled, CPU_COLOR.stroke_width(2)))
                .map_err(render_err)?;
            if i == 0 {
                anno.label("CPU (max %, 100% = 1 core)").legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], CPU_COLOR.stroke_width(2))
                });
            }
        }

        let mut cpu_axis = ChartBuilder::on(&strip)
            .margin_top(MARGIN)
            .margin_bottom(MARGIN)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(CPU_STRIP_PX - 10)
            .build_cartesian_2d(0i32..1i32, 0f64..cpu_upper)
            .map_err(render_err)?;
        cpu_axis
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .disable_x_axis()
            .axis_style(&CPU_COLOR)
            .y_label_style(("sans-serif", 14).into_font().color(&CPU_COLOR))
            .y_desc("CPU (%)")
            .draw()
            .map_err(render_err)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}
