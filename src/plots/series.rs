//! Time series of observed and predicted fluxes and their cumulative sums

use super::{family_color, padded_range, render, technique_family, used_families, DrawResult, FONT};
use crate::config::Settings;
use crate::errors::Result;
use crate::scenario::Scenario;
use crate::series::FluxTable;
use crate::statistics::bootstrap::{eligible_positions, scenario_columns};
use chrono::NaiveDateTime;
use plotters::prelude::*;
use std::path::Path;

const WIDTH: u32 = 1500;
const HEIGHT: u32 = 1500;

/// Content of a time-series chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Fluxes and residuals at artificial gaps filled by every technique
    FluxesComplete,
    /// Fluxes at all positions and predictions at real gaps
    FluxesReal,
    /// Cumulative sums of fluxes and residuals at complete artificial gaps
    CumsComplete,
}

impl SeriesKind {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::FluxesComplete => "fluxes_cplt",
            Self::FluxesReal => "fluxes_real",
            Self::CumsComplete => "cums_cplt",
        }
    }
}

type Points = Vec<(f64, f64)>;

struct SeriesPanel {
    caption: &'static str,
    observed: Points,
    predicted: Vec<(String, Points)>,
}

/// Values at the kept positions as (position, value) points
fn points(values: &[f64], keep: impl Fn(usize) -> bool) -> Points {
    values
        .iter()
        .enumerate()
        .filter(|&(i, v)| keep(i) && v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Running sum of `factor` times the kept values, other positions add nothing
fn cumulative_points(values: &[f64], keep: &[bool], factor: f64) -> Points {
    let mut sum = 0.0;
    values
        .iter()
        .zip(keep)
        .enumerate()
        .map(|(i, (&v, &k))| {
            if k && v.is_finite() {
                sum += v * factor;
            }
            (i as f64, sum)
        })
        .collect()
}

fn residuals(predicted: &[f64], observed: &[f64]) -> Vec<f64> {
    predicted.iter().zip(observed).map(|(p, o)| p - o).collect()
}

/// Plot two stacked time-series panels of a scenario
///
/// Observed fluxes are blue, every technique is coloured by its family.
///
/// # Errors
///
/// Returns an error if a column is missing or the chart cannot be written.
pub fn plot_series(
    table: &FluxTable,
    settings: &Settings,
    scenario: Scenario,
    kind: SeriesKind,
    path: &Path,
) -> Result<()> {
    let flux_name = settings.flux_name();
    let observed = table.column(&flux_name)?;
    let complete = eligible_positions(table, &flux_name, scenario)?;
    let mut techniques = Vec::new();
    for name in scenario_columns(table, scenario) {
        let technique = scenario.technique_of(&name).unwrap_or(name.as_str()).to_string();
        techniques.push((technique, table.column(&name)?));
    }
    let zeros = vec![0.0; observed.len()];
    let factor = settings.conv_factor;

    let (top, bottom) = match kind {
        SeriesKind::FluxesComplete => (
            SeriesPanel {
                caption: "Observed and predicted fluxes at artificial gaps",
                observed: points(observed, |i| complete[i]),
                predicted: techniques
                    .iter()
                    .map(|(t, v)| (t.clone(), points(v, |i| complete[i])))
                    .collect(),
            },
            SeriesPanel {
                caption: "Residuals of fluxes at artificial gaps",
                observed: points(&zeros, |i| complete[i]),
                predicted: techniques
                    .iter()
                    .map(|(t, v)| (t.clone(), points(&residuals(v, observed), |i| complete[i])))
                    .collect(),
            },
        ),
        SeriesKind::FluxesReal => (
            SeriesPanel {
                caption: "Observed and predicted fluxes at all data points",
                observed: points(observed, |_| true),
                predicted: techniques
                    .iter()
                    .map(|(t, v)| (t.clone(), points(v, |_| true)))
                    .collect(),
            },
            SeriesPanel {
                caption: "Predicted fluxes at real gaps",
                observed: Vec::new(),
                predicted: techniques
                    .iter()
                    .map(|(t, v)| (t.clone(), points(v, |i| observed[i].is_nan())))
                    .collect(),
            },
        ),
        SeriesKind::CumsComplete => (
            SeriesPanel {
                caption: "Cumulative observed and predicted fluxes at artificial gaps",
                observed: cumulative_points(observed, &complete, factor),
                predicted: techniques
                    .iter()
                    .map(|(t, v)| (t.clone(), cumulative_points(v, &complete, factor)))
                    .collect(),
            },
            SeriesPanel {
                caption: "Cumulative sums of residuals at artificial gaps",
                observed: cumulative_points(&zeros, &complete, factor),
                predicted: techniques
                    .iter()
                    .map(|(t, v)| (t.clone(), cumulative_points(&residuals(v, observed), &complete, factor)))
                    .collect(),
            },
        ),
    };

    let y_desc = match kind {
        SeriesKind::CumsComplete => settings.sums_label(),
        _ => format!("{} ({})", settings.flux_gas, settings.flux_unit),
    };
    let title = match kind {
        SeriesKind::FluxesReal => format!("Time series plots of artificial '{scenario}' scenarios and real gaps"),
        _ => format!(
            "Time series plots of artificial '{scenario}' scenarios (only artificial gaps filled with complete suite of techniques)"
        ),
    };
    let lines = kind == SeriesKind::CumsComplete;

    render(path, |p| {
        draw_series(&[top, bottom], table.index(), lines, &title, &y_desc, p)
    })
}

fn draw_series(
    panels: &[SeriesPanel; 2],
    index: &[NaiveDateTime],
    lines: bool,
    title: &str,
    y_desc: &str,
    path: &Path,
) -> DrawResult {
    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, (FONT, 20))?;
    let areas = root.split_evenly((2, 1));

    let x_range = -0.5f64..(index.len().max(1) as f64 - 0.5);
    let date_label = |x: &f64| {
        let i = x.round();
        if i < 0.0 {
            return String::new();
        }
        index
            .get(i as usize)
            .map(|stamp| stamp.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    for (area, panel) in areas.iter().zip(panels) {
        let all = panel
            .observed
            .iter()
            .chain(panel.predicted.iter().flat_map(|(_, p)| p.iter()))
            .map(|&(_, y)| y);
        let (min, max) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let (y0, y1) = padded_range(min, max, 0.05);

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .caption(panel.caption, (FONT, 16))
            .build_cartesian_2d(x_range.clone(), y0..y1)?;
        chart
            .configure_mesh()
            .x_label_formatter(&date_label)
            .x_desc("Time (half-hours)")
            .y_desc(y_desc)
            .draw()?;

        for (technique, values) in &panel.predicted {
            let color = family_color(technique_family(technique));
            if lines {
                chart.draw_series(LineSeries::new(values.iter().copied(), color.stroke_width(1)))?;
            } else {
                chart.draw_series(
                    values
                        .iter()
                        .map(|&point| Cross::new(point, 2, color.stroke_width(1))),
                )?;
            }
        }
        if lines {
            chart.draw_series(LineSeries::new(
                panel.observed.iter().copied(),
                BLUE.stroke_width(3),
            ))?;
        } else {
            chart.draw_series(
                panel
                    .observed
                    .iter()
                    .map(|&point| Circle::new(point, 2, BLUE.filled())),
            )?;
        }

        let techniques: Vec<&str> = panel.predicted.iter().map(|(t, _)| t.as_str()).collect();
        for family in used_families(techniques.as_slice()) {
            let color = family_color(&family);
            chart
                .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?
                .label(family)
                .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
