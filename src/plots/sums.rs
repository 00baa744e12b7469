//! Period sums with error bars per technique

use super::{
    category_label, family_color, gray, padded_range, render, technique_family, used_families,
    DrawResult, FONT,
};
use crate::config::Settings;
use crate::errors::Result;
use crate::statistics::operations::{max_finite, min_finite};
use crate::statistics::sums::{EnsembleStats, FluxSum};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const PIXELS_PER_DOT: u32 = 50;
const MIN_WIDTH: u32 = 480;
const HEIGHT: u32 = 560;

/// Outer (confidence interval) and inner (total sum) spread of an ensemble
#[derive(Debug, Clone, Copy)]
struct EnsembleBox {
    outer: (f64, f64),
    inner: (f64, f64),
}

impl EnsembleBox {
    fn from_sums(sums: &[FluxSum]) -> Self {
        let lower: Vec<f64> = sums.iter().map(|s| s.lower_ci).collect();
        let upper: Vec<f64> = sums.iter().map(|s| s.upper_ci).collect();
        let totals: Vec<f64> = sums.iter().map(|s| s.sum_total).collect();
        Self {
            outer: (min_finite(&lower), max_finite(&upper)),
            inner: (min_finite(&totals), max_finite(&totals)),
        }
    }

    fn from_stats(stats: &EnsembleStats) -> Self {
        Self {
            outer: (stats.lower_ci, stats.upper_ci),
            inner: (stats.lower_tot, stats.upper_tot),
        }
    }
}

struct SumsPanel<'a> {
    sums: &'a [FluxSum],
    y_desc: Option<&'a str>,
    caption: Option<&'a str>,
    legend: bool,
    baseline: bool,
    ensemble: Option<EnsembleBox>,
    y_range: (f64, f64),
}

/// Plot the total sum of every technique with its errors
///
/// Error bars show the total error (gray) and the bias error (black); the
/// dashed line is the sum of the observed fluxes. With `ensemble` the spread
/// of the confidence intervals and of the total sums is drawn as boxes and
/// the legend is left out.
///
/// # Errors
///
/// Returns an error if the chart cannot be written.
pub fn plot_sums(sums: &[FluxSum], settings: &Settings, path: &Path, ensemble: bool) -> Result<()> {
    let label = settings.sums_label();
    render(path, |p| {
        let width = (sums.len() as u32 * PIXELS_PER_DOT + 160).max(MIN_WIDTH);
        let root = SVGBackend::new(p, (width, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        draw_panel(
            &root,
            &SumsPanel {
                sums,
                y_desc: Some(&label),
                caption: Some("Aggregated fluxes (sums)"),
                legend: !ensemble,
                baseline: true,
                ensemble: ensemble.then(|| EnsembleBox::from_sums(sums)),
                y_range: sums_range(sums, true),
            },
        )?;
        root.present()?;
        Ok(())
    })
}

/// Plot the sums of all techniques (left) next to the ensemble (right)
///
/// # Errors
///
/// Returns an error if the chart cannot be written.
pub fn plot_sums_ens(
    all: &[FluxSum],
    ensemble: &[FluxSum],
    stats: &EnsembleStats,
    settings: &Settings,
    path: &Path,
) -> Result<()> {
    let label = settings.sums_label();
    render(path, |p| {
        let left_width = all.len() as u32 * PIXELS_PER_DOT + 120;
        let right_width = ensemble.len() as u32 * PIXELS_PER_DOT + 100;
        let root = SVGBackend::new(p, (left_width + right_width, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let (left, right) = root.split_horizontally(left_width);
        draw_panel(
            &left,
            &SumsPanel {
                sums: all,
                y_desc: Some(&label),
                caption: None,
                legend: true,
                baseline: true,
                ensemble: None,
                y_range: sums_range(all, true),
            },
        )?;
        draw_panel(
            &right,
            &SumsPanel {
                sums: ensemble,
                y_desc: None,
                caption: None,
                legend: false,
                baseline: false,
                ensemble: Some(EnsembleBox::from_stats(stats)),
                y_range: sums_range(ensemble, false),
            },
        )?;
        root.present()?;
        Ok(())
    })
}

/// Y range over the error bars (and the observed sums), padded by 5 %
fn sums_range(sums: &[FluxSum], with_observed: bool) -> (f64, f64) {
    let mut lows: Vec<f64> = sums.iter().map(|s| s.sum_total - s.error_total).collect();
    let mut highs: Vec<f64> = sums.iter().map(|s| s.sum_total + s.error_total).collect();
    if with_observed {
        lows.extend(sums.iter().map(|s| s.sum_obs));
        highs.extend(sums.iter().map(|s| s.sum_obs));
    }
    padded_range(min_finite(&lows), max_finite(&highs), 0.05)
}

fn draw_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, panel: &SumsPanel<'_>) -> DrawResult {
    let num_dots = panel.sums.len().max(1);
    let labels: Vec<&str> = panel.sums.iter().map(|s| s.technique.as_str()).collect();
    let x_range = -0.5f64..(num_dots as f64 - 0.5);

    let mut builder = ChartBuilder::on(area);
    builder.margin(15).x_label_area_size(110).y_label_area_size(70);
    if let Some(caption) = panel.caption {
        builder.caption(caption, (FONT, 20));
    }
    let mut chart = builder.build_cartesian_2d(x_range, panel.y_range.0..panel.y_range.1)?;

    let x_formatter = |x: &f64| category_label(labels.as_slice(), *x);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(num_dots)
        .x_label_formatter(&x_formatter)
        .x_label_style(
            (FONT, 13)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_desc("Gap filling techniques")
        .light_line_style(WHITE);
    if let Some(y_desc) = panel.y_desc {
        mesh.y_desc(y_desc);
    }
    mesh.draw()?;

    let right = num_dots as f64 - 0.5;
    if let Some(ensemble) = panel.ensemble {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(-0.5, ensemble.outer.0), (right, ensemble.outer.1)],
            gray(0.95).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(-0.5, ensemble.inner.0), (right, ensemble.inner.1)],
            gray(0.85).filled(),
        )))?;
    }

    if panel.baseline && !panel.sums.is_empty() {
        let observed: Vec<f64> = panel.sums.iter().map(|s| s.sum_obs).collect();
        chart.draw_series(DashedLineSeries::new(
            vec![(-0.5, min_finite(&observed)), (right, max_finite(&observed))],
            8,
            4,
            BLUE.stroke_width(2),
        ))?;
    }

    for (i, sum) in panel.sums.iter().enumerate() {
        let x = i as f64;
        let y = sum.sum_total;
        chart.draw_series(std::iter::once(ErrorBar::new_vertical(
            x,
            y - sum.error_total,
            y,
            y + sum.error_total,
            gray(0.4).stroke_width(1),
            8,
        )))?;
        chart.draw_series(std::iter::once(ErrorBar::new_vertical(
            x,
            y - sum.bias_gaps,
            y,
            y + sum.bias_gaps,
            BLACK.stroke_width(1),
            8,
        )))?;
        let color = family_color(technique_family(&sum.technique));
        chart.draw_series([
            Circle::new((x, y), 6, color.filled()),
            Circle::new((x, y), 6, BLACK.stroke_width(1)),
        ])?;
    }

    if panel.legend {
        for family in used_families(labels.as_slice()) {
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
    Ok(())
}
