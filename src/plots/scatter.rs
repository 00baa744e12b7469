//! Scatter plots of predicted against observed fluxes at artificial gaps

use super::{gray, padded_range, render, DrawResult, FONT};
use crate::config::Settings;
use crate::errors::Result;
use crate::scenario::Scenario;
use crate::series::FluxTable;
use crate::statistics::bootstrap::scenario_columns;
use crate::statistics::operations::r_squared;
use plotters::prelude::*;
use std::path::Path;

const PANEL_SIZE: u32 = 300;

/// One panel: technique and its (x, y) points
struct ScatterPanel {
    technique: String,
    points: Vec<(f64, f64)>,
    r2: f64,
}

/// Number of panel columns for `count` techniques
#[must_use]
pub fn scatter_columns(count: usize) -> usize {
    if count <= 12 {
        3
    } else {
        5
    }
}

/// Scatter plots of every technique of a scenario at the measured fluxes
///
/// Predicted fluxes are on the x axis and observed fluxes on the y axis,
/// with the red 1:1 line. With `residuals` the observed fluxes are on the x
/// axis and predicted minus observed on the y axis, with the zero line and
/// symmetric limits. Each panel shows the R² of the technique.
///
/// # Errors
///
/// Returns an error if a column is missing or the chart cannot be written.
pub fn plot_scatter(
    table: &FluxTable,
    settings: &Settings,
    scenario: Scenario,
    residuals: bool,
    path: &Path,
) -> Result<()> {
    let observed = table.column(&settings.flux_name())?;
    let mut panels = Vec::new();
    for name in scenario_columns(table, scenario) {
        let predicted = table.column(&name)?;
        let points: Vec<(f64, f64)> = predicted
            .iter()
            .zip(observed)
            .filter(|(p, o)| p.is_finite() && o.is_finite())
            .map(|(&p, &o)| if residuals { (o, p - o) } else { (p, o) })
            .collect();
        panels.push(ScatterPanel {
            technique: scenario.technique_of(&name).unwrap_or(name.as_str()).to_string(),
            r2: r_squared(predicted, observed),
            points,
        });
    }

    let values = panels
        .iter()
        .flat_map(|panel| panel.points.iter().flat_map(|&(x, y)| [x, y]));
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (lo, hi) = if residuals {
        let bound = min.abs().max(max.abs());
        padded_range(-bound, bound, 0.02)
    } else {
        padded_range(min, max, 0.02)
    };

    let unit = format!("{} ({})", settings.flux_gas, settings.flux_unit);
    let (x_desc, y_desc) = if residuals {
        (
            format!("Observed fluxes for {unit}"),
            format!("Residuals of predicted fluxes for {unit}"),
        )
    } else {
        (
            format!("Predicted fluxes for {unit}"),
            format!("Observed fluxes for {unit}"),
        )
    };
    let title = format!("Scatterplots of artificial '{scenario}' scenarios");

    render(path, |p| {
        draw_scatter(&panels, (lo, hi), residuals, &title, (&x_desc, &y_desc), p)
    })
}

fn draw_scatter(
    panels: &[ScatterPanel],
    (lo, hi): (f64, f64),
    residuals: bool,
    title: &str,
    (x_desc, y_desc): (&str, &str),
    path: &Path,
) -> DrawResult {
    let cols = scatter_columns(panels.len());
    let rows = panels.len().div_ceil(cols).max(1);
    let size = (cols as u32 * PANEL_SIZE + 60, rows as u32 * PANEL_SIZE + 100);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, (FONT, 22))?;
    let (body, bottom) = root.split_vertically(root.dim_in_pixel().1.saturating_sub(40));
    bottom.draw_text(
        x_desc,
        &(FONT, 14).into_text_style(&bottom),
        (size.0 as i32 / 3, 20),
    )?;
    let (left, grid) = body.split_horizontally(30);
    left.draw_text(
        y_desc,
        &(FONT, 14)
            .into_font()
            .transform(FontTransform::Rotate270)
            .into_text_style(&left),
        (5, left.dim_in_pixel().1 as i32 / 2 + 150),
    )?;

    let line = if residuals {
        [(lo, 0.0), (hi, 0.0)]
    } else {
        [(lo, lo), (hi, hi)]
    };
    let point_color = gray(0.3).mix(0.5);

    for (area, panel) in grid.split_evenly((rows, cols)).iter().zip(panels) {
        let mut chart = ChartBuilder::on(area)
            .margin(5)
            .x_label_area_size(25)
            .y_label_area_size(40)
            .build_cartesian_2d(lo..hi, lo..hi)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(4)
            .y_labels(4)
            .label_style((FONT, 10))
            .draw()?;
        chart.draw_series(LineSeries::new(line, RED.stroke_width(1)))?;
        chart.draw_series(
            panel
                .points
                .iter()
                .map(|&point| Circle::new(point, 2, point_color.filled())),
        )?;

        let span = hi - lo;
        let label_style = (FONT, 13).into_font().style(FontStyle::Bold);
        chart.draw_series(std::iter::once(Text::new(
            panel.technique.clone(),
            (lo + 0.35 * span, lo + 0.12 * span),
            label_style,
        )))?;
        let r2 = if panel.r2.is_finite() {
            format!("R2={:04.2}", panel.r2)
        } else {
            "R2=NA".to_string()
        };
        chart.draw_series(std::iter::once(Text::new(
            r2,
            (lo + 0.05 * span, lo + 0.95 * span),
            (FONT, 12),
        )))?;
    }

    root.present()?;
    Ok(())
}
