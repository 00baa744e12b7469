//! Box statistics of bootstrapped performance metrics
//!
//! One column of panels per bootstrap result and one row per metric. Boxes
//! span the 25th to 75th percentile with the median, whiskers the 10th to
//! 90th percentile; the mean is marked by a cross and the 5th and 95th
//! percentiles by dots.

use super::{category_label, family_color, gray, padded_range, render, technique_family, DrawResult, FONT};
use crate::errors::Result;
use crate::scenario::{Scenario, TimeOfDay};
use crate::statistics::bootstrap::BootstrapResult;
use crate::statistics::operations::{max_finite, mean, min_finite, percentile, Metric};
use plotters::prelude::*;
use std::path::Path;

const BOX_HALF_WIDTH: f64 = 0.3;
const PIXELS_PER_BOX: u32 = 28;
const ROW_HEIGHT: u32 = 330;

/// One column of the chart
#[derive(Debug, Clone, Copy)]
pub struct BootPanel<'a> {
    pub result: &'a BootstrapResult,
    pub scenario: Scenario,
    pub time_of_day: TimeOfDay,
}

struct BoxStats {
    p05: f64,
    p10: f64,
    p25: f64,
    median: f64,
    p75: f64,
    p90: f64,
    p95: f64,
    mean: f64,
}

impl BoxStats {
    fn new(values: &[f64]) -> Self {
        Self {
            p05: percentile(values, 5.0),
            p10: percentile(values, 10.0),
            p25: percentile(values, 25.0),
            median: percentile(values, 50.0),
            p75: percentile(values, 75.0),
            p90: percentile(values, 90.0),
            p95: percentile(values, 95.0),
            mean: mean(values),
        }
    }
}

/// Plot box statistics of Bias, SDev and R² for every technique
///
/// Axis limits of a metric are shared by all panels.
///
/// # Errors
///
/// Returns an error if the chart cannot be written.
pub fn plot_bootstats(panels: &[BootPanel<'_>], gas: &str, unit: &str, path: &Path) -> Result<()> {
    render(path, |p| draw_bootstats(panels, gas, unit, p))
}

fn metric_range(panels: &[BootPanel<'_>], metric: Metric) -> (f64, f64) {
    let values: Vec<f64> = panels
        .iter()
        .flat_map(|panel| {
            (0..panel.result.techniques.len())
                .flat_map(move |t| panel.result.metric_values(metric, t))
        })
        .collect();
    let (min, max) = (min_finite(&values), max_finite(&values));
    match metric {
        Metric::Bias => {
            let lim = min.abs().max(max.abs());
            padded_range(-lim, lim, 0.01)
        }
        Metric::SDev => padded_range(min, max, 0.01),
        Metric::R2 => (-0.02, 1.02),
    }
}

fn metric_desc(metric: Metric, unit: &str) -> String {
    match metric {
        Metric::R2 => "R-squared".to_string(),
        _ => format!("{} ({})", metric.as_str(), unit),
    }
}

fn draw_bootstats(panels: &[BootPanel<'_>], gas: &str, unit: &str, path: &Path) -> DrawResult {
    let num_boxes = panels
        .iter()
        .map(|p| p.result.techniques.len())
        .max()
        .unwrap_or(0)
        .max(1);
    let width = (num_boxes as u32 * PIXELS_PER_BOX + 120) * panels.len().max(1) as u32;
    let height = ROW_HEIGHT * Metric::ALL.len() as u32 + 160;

    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&format!("Bootstrapping performances for {gas}"), (FONT, 24))?;
    let cells = root.split_evenly((Metric::ALL.len(), panels.len().max(1)));

    for (row, metric) in Metric::ALL.into_iter().enumerate() {
        let (y0, y1) = metric_range(panels, metric);
        for (col, panel) in panels.iter().enumerate() {
            let area = &cells[row * panels.len() + col];
            let labels: Vec<&str> = panel
                .result
                .techniques
                .iter()
                .map(|t| panel.scenario.technique_of(t).unwrap_or(t))
                .collect();
            let n = labels.len().max(1);
            let last_row = row + 1 == Metric::ALL.len();

            let mut builder = ChartBuilder::on(area);
            builder
                .margin(8)
                .x_label_area_size(if last_row { 90 } else { 10 })
                .y_label_area_size(if col == 0 { 70 } else { 40 });
            let title = format!("{} ({})", panel.scenario, panel.time_of_day.label());
            if row == 0 {
                builder.caption(&title, (FONT, 16));
            }
            let mut chart = builder.build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y0..y1)?;

            let x_formatter = |x: &f64| {
                if last_row {
                    category_label(labels.as_slice(), *x)
                } else {
                    String::new()
                }
            };
            let y_desc = metric_desc(metric, unit);
            let mut mesh = chart.configure_mesh();
            mesh.disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&x_formatter)
                .x_label_style((FONT, 12).into_font().transform(FontTransform::Rotate90))
                .light_line_style(WHITE);
            if col == 0 {
                mesh.y_desc(y_desc);
            }
            mesh.draw()?;

            chart.draw_series(std::iter::once(PathElement::new(
                vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
                BLACK.stroke_width(1),
            )))?;

            for (t, technique) in labels.iter().enumerate() {
                let stats = BoxStats::new(&panel.result.metric_values(metric, t));
                let x = t as f64;
                let color = family_color(technique_family(technique));
                chart.draw_series([
                    PathElement::new(vec![(x, stats.p10), (x, stats.p25)], BLACK.stroke_width(1)),
                    PathElement::new(vec![(x, stats.p75), (x, stats.p90)], BLACK.stroke_width(1)),
                    PathElement::new(
                        vec![(x - BOX_HALF_WIDTH / 2.0, stats.p10), (x + BOX_HALF_WIDTH / 2.0, stats.p10)],
                        BLACK.stroke_width(1),
                    ),
                    PathElement::new(
                        vec![(x - BOX_HALF_WIDTH / 2.0, stats.p90), (x + BOX_HALF_WIDTH / 2.0, stats.p90)],
                        BLACK.stroke_width(1),
                    ),
                ])?;
                chart.draw_series([
                    Rectangle::new(
                        [(x - BOX_HALF_WIDTH, stats.p25), (x + BOX_HALF_WIDTH, stats.p75)],
                        color.filled(),
                    ),
                    Rectangle::new(
                        [(x - BOX_HALF_WIDTH, stats.p25), (x + BOX_HALF_WIDTH, stats.p75)],
                        BLACK.stroke_width(1),
                    ),
                ])?;
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(x - BOX_HALF_WIDTH, stats.median), (x + BOX_HALF_WIDTH, stats.median)],
                    BLACK.stroke_width(2),
                )))?;
                chart.draw_series(std::iter::once(Cross::new((x, stats.mean), 4, BLACK.stroke_width(1))))?;
                chart.draw_series([
                    Circle::new((x, stats.p05), 2, gray(0.0).filled()),
                    Circle::new((x, stats.p95), 2, gray(0.0).filled()),
                ])?;
            }
        }
    }

    root.present()?;
    Ok(())
}
