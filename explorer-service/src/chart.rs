//! Chart renderer.
//!
//! Turns an x and a y column into a PNG. Every call draws into its own RGB
//! buffer; the only process-wide state is the embedded font, registered with
//! plotters on first use.

use std::sync::OnceLock;

use common::errors::{AppError, AppResult};
use common::models::PlotKind;
use plotters::prelude::*;
use plotters::style::register_font;
use serde_json::Value;

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

static FONT: OnceLock<Result<(), String>> = OnceLock::new();

/// What to draw and how big.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: PlotKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

/// The x axis after classification.
#[derive(Debug, PartialEq)]
enum Axis {
    /// Every x is a number.
    Numeric(Vec<(f64, f64)>),
    /// Category labels in first-appearance order; points are (slot, y).
    Categorical {
        labels: Vec<String>,
        points: Vec<(usize, f64)>,
    },
}

/// Renders `x` against `y` and returns the PNG bytes.
///
/// # Errors
/// `AppError::InvalidPlotData` when the columns differ in length, a y value
/// is not numeric or the values span too wide a range, `AppError::Chart` when drawing or encoding fails.
pub fn render(x: &[Value], y: &[Value], spec: &ChartSpec) -> AppResult<Vec<u8>> {
    if x.len() != y.len() {
        return Err(AppError::InvalidPlotData(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if spec.width == 0 || spec.height == 0 {
        return Err(AppError::InvalidPlotData(format!(
            "chart size {}x{} is empty",
            spec.width, spec.height
        )));
    }

    let axis = classify_axis(x, y, spec.kind)?;
    let bounds = axis_bounds(&axis, spec.kind)?;
    ensure_font()?;

    let mut buffer = vec![0u8; spec.width as usize * spec.height as usize * 3];
    draw(&mut buffer, &axis, bounds, spec).map_err(|e| {
        tracing::error!(kind = %spec.kind, error = %e, "chart drawing failed");
        e
    })?;

    lodepng::encode24(buffer.as_slice(), spec.width as usize, spec.height as usize)
        .map_err(|e| AppError::Chart(format!("png encoding failed: {}", e)))
}

fn ensure_font() -> AppResult<()> {
    FONT.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES)
            .map_err(|_| "embedded font could not be parsed".to_string())
    })
    .clone()
    .map_err(AppError::Chart)
}

/// Pairs up the columns, drops pairs with a null y and decides the x axis.
fn classify_axis(x: &[Value], y: &[Value], kind: PlotKind) -> AppResult<Axis> {
    let mut pairs = Vec::with_capacity(x.len());
    for (row, (xv, yv)) in x.iter().zip(y).enumerate() {
        if yv.is_null() {
            continue;
        }
        let yf = numeric(yv).ok_or_else(|| {
            AppError::InvalidPlotData(format!("y value {} in row {} is not numeric", yv, row))
        })?;
        pairs.push((xv, yf));
    }

    let numeric_x = kind != PlotKind::Bar
        && pairs.iter().all(|(xv, _)| xv.is_null() || xv.is_number());

    if numeric_x {
        let points = pairs
            .into_iter()
            .filter_map(|(xv, yf)| xv.as_f64().map(|xf| (xf, yf)))
            .collect();
        return Ok(Axis::Numeric(points));
    }

    let mut labels: Vec<String> = Vec::new();
    let mut points = Vec::with_capacity(pairs.len());
    for (xv, yf) in pairs {
        let label = match xv {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let slot = match labels.iter().position(|l| *l == label) {
            Some(slot) => slot,
            None => {
                labels.push(label);
                labels.len() - 1
            }
        };
        points.push((slot, yf));
    }
    Ok(Axis::Categorical { labels, points })
}

/// Numbers, numeric strings and booleans (as 0/1).
fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Widest axis span handed to plotters; its tick search overflows beyond this.
const MAX_AXIS_SPAN: f64 = f64::MAX / 100.0;

/// Axis bounds with 5% padding; empty input gets a unit range.
///
/// # Errors
/// `AppError::InvalidPlotData` when the padded span is not finite or exceeds
/// `MAX_AXIS_SPAN`.
fn padded_range(axis: &str, values: impl Iterator<Item = f64>) -> AppResult<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (lo, hi) = if lo > hi {
        (0.0, 1.0)
    } else if lo == hi {
        let pad = (lo.abs() * 0.05).max(1.0);
        (lo - pad, hi + pad)
    } else {
        let pad = (hi / 2.0 - lo / 2.0) * 0.1;
        (lo - pad, hi + pad)
    };

    let span = hi - lo;
    if !(lo.is_finite() && hi.is_finite() && span.is_finite()) || span > MAX_AXIS_SPAN {
        return Err(AppError::InvalidPlotData(format!(
            "{} values span too wide a range to plot ({:e} to {:e})",
            axis, lo, hi
        )));
    }
    Ok((lo, hi))
}

type Bounds = ((f64, f64), (f64, f64));

/// x and y ranges of the plot area.
fn axis_bounds(axis: &Axis, kind: PlotKind) -> AppResult<Bounds> {
    match axis {
        Axis::Numeric(points) => Ok((
            padded_range("x", points.iter().map(|p| p.0))?,
            padded_range("y", points.iter().map(|p| p.1))?,
        )),
        Axis::Categorical { labels, points } => {
            let ys = points.iter().map(|p| p.1);
            let y_range = if kind == PlotKind::Bar {
                padded_range("y", ys.chain([0.0]))?
            } else {
                padded_range("y", ys)?
            };
            let x_range = if labels.is_empty() {
                (0.0, 1.0)
            } else {
                (-0.5, labels.len() as f64 - 0.5)
            };
            Ok((x_range, y_range))
        }
    }
}

fn chart_error<E: std::fmt::Display>(error: E) -> AppError {
    AppError::Chart(error.to_string())
}

fn draw(buffer: &mut [u8], axis: &Axis, bounds: Bounds, spec: &ChartSpec) -> AppResult<()> {
    let root = BitMapBackend::with_buffer(buffer, (spec.width, spec.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let (x_range, y_range) = bounds;
    let labels = match axis {
        Axis::Numeric(_) => None,
        Axis::Categorical { labels, .. } => Some(labels.as_slice()),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, (FONT_FAMILY, 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
        .map_err(chart_error)?;

    let category = |v: &f64| -> String {
        let slot = v.round();
        match labels {
            Some(labels) if (v - slot).abs() < 1e-6 && slot >= 0.0 => labels
                .get(slot as usize)
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .label_style((FONT_FAMILY, 14))
        .axis_desc_style((FONT_FAMILY, 16));
    if let Some(labels) = labels {
        mesh.x_labels(labels.len().max(1))
            .x_label_formatter(&category)
            .disable_x_mesh();
    }
    mesh.draw().map_err(chart_error)?;

    let points: Vec<(f64, f64)> = match axis {
        Axis::Numeric(points) => points.clone(),
        Axis::Categorical { points, .. } => points.iter().map(|&(i, y)| (i as f64, y)).collect(),
    };

    match spec.kind {
        PlotKind::Line => {
            chart
                .draw_series(LineSeries::new(points, BLUE.stroke_width(2)))
                .map_err(chart_error)?;
        }
        PlotKind::Scatter => {
            chart
                .draw_series(points.into_iter().map(|p| Circle::new(p, 4, BLUE.filled())))
                .map_err(chart_error)?;
        }
        PlotKind::Bar => {
            chart
                .draw_series(points.into_iter().map(|(x, y)| {
                    Rectangle::new([(x - 0.4, 0.0), (x + 0.4, y)], BLUE.mix(0.7).filled())
                }))
                .map_err(chart_error)?;
        }
    }

    root.present().map_err(chart_error)?;
    Ok(())
}
