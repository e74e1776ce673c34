//! Chart descriptions and the `trueno_viz` SVG back end that draws them.
//!
//! [`line_chart`] and [`bar_chart`] turn comparison rows into plain data;
//! a [`ChartBackend`] decides how that data ends up in a file.

use super::ComparisonRow;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use trueno_viz::color::Rgba;
use trueno_viz::output::{SvgEncoder, TextAnchor};

pub const LINE_CHART_NAME: &str = "runtime_vs_matrix_size";
pub const BAR_CHART_NAME: &str = "runtime_comparison_bars";

const SERIAL_COLOR: &str = "#d62728";
const THREADED_COLOR: &str = "#1f77b4";

/// One line of X/Y points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: &'static str,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// One bar per category, all in the same colour.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub label: String,
    pub color: &'static str,
    pub values: Vec<f64>,
}

/// Grouped bars: `series[i].values[j]` is drawn in group `categories[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
}

/// Average total time against matrix size, one line per implementation.
pub fn line_chart(rows: &[ComparisonRow]) -> LineChart {
    let points = |pick: fn(&ComparisonRow) -> f64| {
        rows.iter()
            .map(|r| (r.matrix_size as f64, pick(r)))
            .collect::<Vec<_>>()
    };

    LineChart {
        title: "Runtime vs Matrix Size".to_string(),
        x_label: "Matrix Size".to_string(),
        y_label: "Average Execution Time (seconds)".to_string(),
        series: vec![
            Series {
                label: "Serial".to_string(),
                color: SERIAL_COLOR,
                points: points(|r| r.serial_time),
            },
            Series {
                label: "Threaded".to_string(),
                color: THREADED_COLOR,
                points: points(|r| r.threaded_time),
            },
        ],
    }
}

/// Same data as grouped bars, labelled by matrix size.
pub fn bar_chart(rows: &[ComparisonRow]) -> BarChart {
    BarChart {
        title: "Runtime Comparison: Serial vs Threaded Implementation".to_string(),
        x_label: "Matrix Size".to_string(),
        y_label: "Average Execution Time (seconds)".to_string(),
        categories: rows.iter().map(|r| r.matrix_size.to_string()).collect(),
        series: vec![
            BarSeries {
                label: "Serial".to_string(),
                color: SERIAL_COLOR,
                values: rows.iter().map(|r| r.serial_time).collect(),
            },
            BarSeries {
                label: "Threaded".to_string(),
                color: THREADED_COLOR,
                values: rows.iter().map(|r| r.threaded_time).collect(),
            },
        ],
    }
}

/// Turns chart descriptions into image files.
pub trait ChartBackend {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn draw_line(&self, chart: &LineChart, path: &Path) -> Result<()>;

    fn draw_bars(&self, chart: &BarChart, path: &Path) -> Result<()>;
}

/// Render both comparison charts into `images_dir`, creating it if needed.
///
/// Returns the written paths, line chart first.
pub fn render_charts(
    rows: &[ComparisonRow],
    images_dir: &Path,
    backend: &dyn ChartBackend,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(images_dir).map_err(|e| Error::io(images_dir, e))?;

    let line_path = images_dir.join(format!("{}.{}", LINE_CHART_NAME, backend.extension()));
    backend.draw_line(&line_chart(rows), &line_path)?;
    log::info!("wrote {}", line_path.display());

    let bar_path = images_dir.join(format!("{}.{}", BAR_CHART_NAME, backend.extension()));
    backend.draw_bars(&bar_chart(rows), &bar_path)?;
    log::info!("wrote {}", bar_path.display());

    Ok(vec![line_path, bar_path])
}

/// Writes charts as SVG documents through `trueno_viz`.
#[derive(Debug, Clone, Copy)]
pub struct SvgBackend {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgBackend {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
        }
    }
}

const MARGIN_LEFT: f32 = 100.0;
const MARGIN_RIGHT: f32 = 40.0;
const MARGIN_TOP: f32 = 70.0;
const MARGIN_BOTTOM: f32 = 80.0;
const Y_TICKS: usize = 5;

/// Pixel area inside the axes and the value range mapped onto it.
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    y_max: f64,
}

impl Frame {
    fn new(width: u32, height: u32, y_max: f64) -> Self {
        // headroom above the tallest value; empty charts still get an axis
        let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
        Self {
            left: MARGIN_LEFT,
            right: width as f32 - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: height as f32 - MARGIN_BOTTOM,
            y_max,
        }
    }

    fn y(&self, value: f64) -> f32 {
        self.bottom - (value / self.y_max) as f32 * (self.bottom - self.top)
    }
}

/// Maps X values onto the frame; a single distinct value sits mid-axis.
#[derive(Debug, Clone, Copy)]
struct XScale {
    min: f64,
    max: f64,
}

impl XScale {
    fn fit(xs: &[f64]) -> Self {
        let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        match (min.is_finite(), max > min) {
            (true, true) => Self { min, max },
            (true, false) => Self {
                min: min - 1.0,
                max: min + 1.0,
            },
            _ => Self { min: 0.0, max: 1.0 },
        }
    }

    fn x(&self, frame: &Frame, value: f64) -> f32 {
        frame.left + ((value - self.min) / (self.max - self.min)) as f32 * (frame.right - frame.left)
    }
}

fn ink() -> Rgba {
    Rgba::rgb(51, 51, 51)
}

fn muted() -> Rgba {
    Rgba::rgb(102, 102, 102)
}

/// `#rrggbb` channels, or `None` for anything else.
fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').filter(|d| d.len() == 6)?;
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn rgba(hex: &str) -> Rgba {
    match hex_rgb(hex) {
        Some((r, g, b)) => Rgba::rgb(r, g, b),
        None => ink(),
    }
}

impl SvgBackend {
    pub fn line_svg(&self, chart: &LineChart) -> String {
        let y_max = chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .fold(0.0, f64::max);
        let frame = Frame::new(self.width, self.height, y_max);

        let mut ticks: Vec<f64> = chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .collect();
        let scale = XScale::fit(&ticks);

        let mut encoder = self.axes(&chart.title, &chart.x_label, &chart.y_label, &frame);

        // x ticks at every distinct matrix size
        ticks.sort_by(f64::total_cmp);
        ticks.dedup();
        for t in ticks {
            encoder = encoder.text_anchored(
                scale.x(&frame, t),
                frame.bottom + 20.0,
                &t.to_string(),
                12.0,
                muted(),
                TextAnchor::Middle,
            );
        }

        for series in &chart.series {
            let color = rgba(series.color);
            for pair in series.points.windows(2) {
                let (x1, y1) = pair[0];
                let (x2, y2) = pair[1];
                encoder = encoder.line(
                    scale.x(&frame, x1),
                    frame.y(y1),
                    scale.x(&frame, x2),
                    frame.y(y2),
                    color,
                    2.0,
                );
            }
            for &(px, py) in &series.points {
                encoder = encoder.circle(scale.x(&frame, px), frame.y(py), 4.0, color);
            }
        }

        let legend: Vec<(&str, &str)> = chart
            .series
            .iter()
            .map(|s| (s.label.as_str(), s.color))
            .collect();
        legend_onto(encoder, &frame, &legend).render()
    }

    pub fn bars_svg(&self, chart: &BarChart) -> String {
        let y_max = chart
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max);
        let frame = Frame::new(self.width, self.height, y_max);
        let mut encoder = self.axes(&chart.title, &chart.x_label, &chart.y_label, &frame);

        let groups = chart.categories.len().max(1) as f32;
        let group_width = (frame.right - frame.left) / groups;
        let bar_width = (group_width * 0.7) / chart.series.len().max(1) as f32;

        for (j, category) in chart.categories.iter().enumerate() {
            let group_left = frame.left + j as f32 * group_width + group_width * 0.15;
            for (i, series) in chart.series.iter().enumerate() {
                let Some(&value) = series.values.get(j) else {
                    continue;
                };
                let top = frame.y(value.max(0.0));
                encoder = encoder.rect(
                    group_left + i as f32 * bar_width,
                    top,
                    bar_width,
                    frame.bottom - top,
                    rgba(series.color),
                );
            }
            encoder = encoder.text_anchored(
                frame.left + (j as f32 + 0.5) * group_width,
                frame.bottom + 20.0,
                category,
                12.0,
                muted(),
                TextAnchor::Middle,
            );
        }

        let legend: Vec<(&str, &str)> = chart
            .series
            .iter()
            .map(|s| (s.label.as_str(), s.color))
            .collect();
        legend_onto(encoder, &frame, &legend).render()
    }

    /// Background, title, gridlines with y ticks, axes and axis labels.
    fn axes(&self, title: &str, x_label: &str, y_label: &str, frame: &Frame) -> SvgEncoder {
        let mut encoder = SvgEncoder::new(self.width, self.height)
            .background(Some(Rgba::rgb(255, 255, 255)))
            .text_anchored(
                self.width as f32 / 2.0,
                35.0,
                title,
                20.0,
                ink(),
                TextAnchor::Middle,
            );

        for i in 0..=Y_TICKS {
            let value = frame.y_max * i as f64 / Y_TICKS as f64;
            let y = frame.y(value);
            encoder = encoder
                .line(frame.left, y, frame.right, y, Rgba::rgb(229, 229, 229), 1.0)
                .text_anchored(
                    frame.left - 30.0,
                    y + 4.0,
                    &format!("{:.3}", value),
                    12.0,
                    muted(),
                    TextAnchor::Middle,
                );
        }

        encoder
            .line(frame.left, frame.bottom, frame.right, frame.bottom, ink(), 1.0)
            .line(frame.left, frame.top, frame.left, frame.bottom, ink(), 1.0)
            .text_anchored(
                (frame.left + frame.right) / 2.0,
                frame.bottom + 50.0,
                x_label,
                14.0,
                ink(),
                TextAnchor::Middle,
            )
            .text(frame.left, frame.top - 15.0, y_label, 14.0, ink())
    }
}

/// Legend swatches in the top-left corner of the plot area.
fn legend_onto(mut encoder: SvgEncoder, frame: &Frame, legend: &[(&str, &str)]) -> SvgEncoder {
    for (i, (label, color)) in legend.iter().enumerate() {
        let y = frame.top + 10.0 + i as f32 * 22.0;
        encoder = encoder
            .rect(frame.left + 12.0, y, 14.0, 14.0, rgba(color))
            .text(frame.left + 32.0, y + 12.0, label, 14.0, ink());
    }
    encoder
}

impl ChartBackend for SvgBackend {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn draw_line(&self, chart: &LineChart, path: &Path) -> Result<()> {
        fs::write(path, self.line_svg(chart)).map_err(|e| Error::io(path, e))
    }

    fn draw_bars(&self, chart: &BarChart, path: &Path) -> Result<()> {
        fs::write(path, self.bars_svg(chart)).map_err(|e| Error::io(path, e))
    }
}
