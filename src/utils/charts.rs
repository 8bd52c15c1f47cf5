//! SVG Chart Generator for Training Curves
//!
//! Renders loss and accuracy curves from a [`TrainingHistory`] as standalone
//! SVG files that open in any browser.

use std::fs;
use std::path::Path;

use crate::training::history::TrainingHistory;
use crate::utils::error::{ClassifierError, Result};

/// Chart styling constants
const PANEL_WIDTH: f64 = 700.0;
const CHART_HEIGHT: f64 = 480.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 70.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

const COLOR_TRAIN: &str = "#3498db";
const COLOR_VAL: &str = "#e74c3c";
const COLOR_TRAIN_ACC: &str = "#2ecc71";
const COLOR_VAL_ACC: &str = "#f39c12";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// A data series for charts
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub color: String,
    pub dashed: bool,
}

impl DataSeries {
    fn new(name: &str, values: &[f64], color: &str) -> Self {
        Self {
            name: name.to_string(),
            values: values.to_vec(),
            color: color.to_string(),
            dashed: false,
        }
    }

    fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }
}

/// Vertical axis of a panel
#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    percent: bool,
}

impl Axis {
    fn loss(series: &[DataSeries]) -> Self {
        let max = series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0f64, f64::max);
        Self {
            min: 0.0,
            max: if max > 0.0 { max * 1.1 } else { 1.0 },
            percent: false,
        }
    }

    fn accuracy() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            percent: true,
        }
    }

    fn label(&self, value: f64) -> String {
        if self.percent {
            format!("{:.0}%", value)
        } else {
            format!("{:.2}", value)
        }
    }

    fn project(&self, value: f64, plot_height: f64) -> f64 {
        let span = (self.max - self.min).max(f64::EPSILON);
        let clamped = value.clamp(self.min, self.max);
        MARGIN_TOP + plot_height - ((clamped - self.min) / span) * plot_height
    }
}

/// Loss and accuracy panels side by side (train vs validation)
pub fn plot_training_curves(history: &TrainingHistory, output_path: &Path) -> Result<()> {
    ensure_not_empty(history)?;

    let loss = [
        DataSeries::new("Train", &history.train_loss, COLOR_TRAIN),
        DataSeries::new("Validation", &history.val_loss, COLOR_VAL),
    ];
    let accuracy = [
        DataSeries::new("Train", &history.train_accuracy, COLOR_TRAIN),
        DataSeries::new("Validation", &history.val_accuracy, COLOR_VAL),
    ];

    let width = PANEL_WIDTH * 2.0;
    let mut svg = svg_header(width);

    render_panel(
        &mut svg,
        0.0,
        "Loss per Epoch",
        "Loss",
        &loss,
        Axis::loss(&loss),
    );
    render_panel(
        &mut svg,
        PANEL_WIDTH,
        "Accuracy per Epoch",
        "Accuracy (%)",
        &accuracy,
        Axis::accuracy(),
    );

    svg.push_str("</svg>");
    write_svg(output_path, &svg)
}

/// Loss (left axis) and accuracy (right axis, 0..100) on one chart
pub fn plot_combined_curves(history: &TrainingHistory, output_path: &Path) -> Result<()> {
    ensure_not_empty(history)?;

    let loss = [
        DataSeries::new("Train loss", &history.train_loss, COLOR_TRAIN),
        DataSeries::new("Validation loss", &history.val_loss, COLOR_VAL),
    ];
    let accuracy = [
        DataSeries::new("Train acc", &history.train_accuracy, COLOR_TRAIN_ACC).dashed(),
        DataSeries::new("Validation acc", &history.val_accuracy, COLOR_VAL_ACC).dashed(),
    ];

    let mut svg = svg_header(PANEL_WIDTH);
    let loss_axis = Axis::loss(&loss);
    render_panel(
        &mut svg,
        0.0,
        "Training Progress",
        "Loss",
        &loss,
        loss_axis,
    );

    // Right-hand axis for accuracy
    let plot_width = PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let acc_axis = Axis::accuracy();
    let right = MARGIN_LEFT + plot_width;

    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        right, MARGIN_TOP, right, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    for i in 0..=5 {
        let value = acc_axis.min + (i as f64 / 5.0) * (acc_axis.max - acc_axis.min);
        let y = acc_axis.project(value, plot_height);
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="start" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            right + 8.0, y + 4.0, COLOR_TEXT, acc_axis.label(value)
        ));
    }
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(90 {} {})">Accuracy (%)</text>"#,
        PANEL_WIDTH - 15.0, CHART_HEIGHT / 2.0, COLOR_TEXT, PANEL_WIDTH - 15.0, CHART_HEIGHT / 2.0
    ));

    for series in &accuracy {
        render_series(&mut svg, 0.0, series, acc_axis, plot_width, plot_height);
    }
    render_legend(&mut svg, 0.0, &accuracy, loss.len());

    svg.push_str("</svg>");
    write_svg(output_path, &svg)
}

fn ensure_not_empty(history: &TrainingHistory) -> Result<()> {
    if history.epochs() == 0 {
        return Err(ClassifierError::InvalidInput(
            "training history has no epochs to plot".to_string(),
        ));
    }
    Ok(())
}

fn write_svg(output_path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, svg)?;
    tracing::info!("Chart saved to {:?}", output_path);
    Ok(())
}

fn svg_header(width: f64) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        width, CHART_HEIGHT, width, CHART_HEIGHT
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        width, CHART_HEIGHT
    ));
    svg
}

/// Title, grid, axes, epoch ticks, series and legend for one panel
fn render_panel(
    svg: &mut String,
    offset_x: f64,
    title: &str,
    y_label: &str,
    series: &[DataSeries],
    axis: Axis,
) {
    let plot_width = PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let left = offset_x + MARGIN_LEFT;

    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        offset_x + PANEL_WIDTH / 2.0, COLOR_TEXT, escape_xml(title)
    ));

    for i in 0..=5 {
        let value = axis.min + (i as f64 / 5.0) * (axis.max - axis.min);
        let y = axis.project(value, plot_height);

        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            left, y, left + plot_width, y, COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            left - 10.0, y + 4.0, COLOR_TEXT, axis.label(value)
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        left, MARGIN_TOP + plot_height, left + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        left, MARGIN_TOP, left, MARGIN_TOP + plot_height, COLOR_AXIS
    ));

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">Epoch</text>"#,
        left + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT
    ));
    let label_x = offset_x + 20.0;
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 {} {})">{}</text>"#,
        label_x, CHART_HEIGHT / 2.0, COLOR_TEXT, label_x, CHART_HEIGHT / 2.0, escape_xml(y_label)
    ));

    // Epoch ticks, thinned to at most ~10 labels
    let epochs = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let step = (epochs / 10).max(1);
    for epoch in (0..epochs).step_by(step) {
        let x = epoch_x(offset_x, epoch, epochs, plot_width);
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{}</text>"#,
            x, MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, epoch + 1
        ));
    }

    for s in series {
        render_series(svg, offset_x, s, axis, plot_width, plot_height);
    }
    render_legend(svg, offset_x, series, 0);
}

fn epoch_x(offset_x: f64, epoch: usize, epochs: usize, plot_width: f64) -> f64 {
    let left = offset_x + MARGIN_LEFT;
    if epochs <= 1 {
        left + plot_width / 2.0
    } else {
        left + (epoch as f64 / (epochs - 1) as f64) * plot_width
    }
}

fn render_series(
    svg: &mut String,
    offset_x: f64,
    series: &DataSeries,
    axis: Axis,
    plot_width: f64,
    plot_height: f64,
) {
    let epochs = series.values.len();
    if epochs == 0 {
        return;
    }

    let points: Vec<(f64, f64)> = series
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| {
            (
                epoch_x(offset_x, i, epochs, plot_width),
                axis.project(v, plot_height),
            )
        })
        .collect();

    let mut path = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        if i == 0 {
            path.push_str(&format!("M {:.2} {:.2}", x, y));
        } else {
            path.push_str(&format!(" L {:.2} {:.2}", x, y));
        }
    }

    let dash = if series.dashed {
        r#" stroke-dasharray="8 4""#
    } else {
        ""
    };
    svg.push_str(&format!(
        r#"<path d="{}" fill="none" stroke="{}" stroke-width="2.5"{}/>"#,
        path, series.color, dash
    ));

    // Markers only when the curve is short enough to read them
    if points.len() <= 60 {
        for (x, y) in &points {
            svg.push_str(&format!(
                r#"<circle cx="{:.2}" cy="{:.2}" r="3.5" fill="{}" stroke="white" stroke-width="1.5"/>"#,
                x, y, series.color
            ));
        }
    }
}

fn render_legend(svg: &mut String, offset_x: f64, series: &[DataSeries], slot_offset: usize) {
    let mut legend_y = MARGIN_TOP + 10.0 + slot_offset as f64 * 22.0;
    let legend_x = offset_x + PANEL_WIDTH - MARGIN_RIGHT - 140.0;
    for s in series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            legend_x, legend_y, s.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            legend_x + 20.0, legend_y + 12.0, COLOR_TEXT, escape_xml(&s.name)
        ));
        legend_y += 22.0;
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
