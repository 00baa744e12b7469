//! Daily sums of observed fluxes and filled real gaps

use super::{family_color, padded_range, render, technique_family, used_families, DrawResult, FONT};
use crate::config::{Settings, HALF_HOURS_PER_DAY};
use crate::errors::Result;
use crate::scenario::REAL_SUFFIX;
use crate::series::FluxTable;
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::path::Path;

const WIDTH: u32 = 1500;
const HEIGHT: u32 = 1200;

/// Daily sums of a column times `factor`, days without values sum to zero
#[must_use]
pub fn daily_sums(values: &[f64], factor: f64) -> Vec<f64> {
    values
        .chunks(HALF_HOURS_PER_DAY)
        .map(|day| day.iter().filter(|v| v.is_finite()).sum::<f64>() * factor)
        .collect()
}

fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Plot daily sums (top) and their cumulative sums (bottom)
///
/// Blue bars and the thick blue line show the observed fluxes, markers and
/// thin lines every `real` column coloured by technique family.
///
/// # Errors
///
/// Returns an error if the flux column is missing or the chart cannot be
/// written.
pub fn plot_daily(table: &FluxTable, settings: &Settings, path: &Path) -> Result<()> {
    let factor = settings.conv_factor;
    let observed = daily_sums(table.column(&settings.flux_name())?, factor);
    let filled: Vec<(String, Vec<f64>)> = table
        .column_names()
        .into_iter()
        .filter_map(|name| {
            let technique = name.strip_suffix(REAL_SUFFIX)?.strip_suffix('_')?;
            let values = table.column(name).ok()?;
            Some((technique.to_string(), daily_sums(values, factor)))
        })
        .collect();
    let first_day = table
        .index()
        .first()
        .map(|stamp| (*stamp - Duration::minutes(15)).date());
    let day_label = settings.conv_sums.replace("period", "day");

    render(path, |p| {
        draw_daily(
            &observed,
            &filled,
            first_day,
            &format!("{} ({})", settings.flux_gas, day_label),
            &settings.sums_label(),
            p,
        )
    })
}

fn draw_daily(
    observed: &[f64],
    filled: &[(String, Vec<f64>)],
    first_day: Option<NaiveDate>,
    daily_desc: &str,
    cumulative_desc: &str,
    path: &Path,
) -> DrawResult {
    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Time series plots of daily sums", (FONT, 24))?;
    let panels = root.split_evenly((2, 1));

    let num_days = observed.len().max(1);
    let x_range = -0.5f64..(num_days as f64 - 0.5);
    let date_label = |x: &f64| match first_day {
        Some(day) if *x >= 0.0 => (day + Duration::days(x.round() as i64))
            .format("%Y-%m-%d")
            .to_string(),
        _ => String::new(),
    };

    let all_daily = observed.iter().chain(filled.iter().flat_map(|(_, v)| v.iter()));
    let (min_daily, max_daily) = all_daily.fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let (y0, y1) = padded_range(min_daily, max_daily, 0.05);

    let mut daily = ChartBuilder::on(&panels[0])
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .caption("Daily sums of observed fluxes (blue bars) plus filled real gaps", (FONT, 16))
        .build_cartesian_2d(x_range.clone(), y0..y1)?;
    daily
        .configure_mesh()
        .x_label_formatter(&date_label)
        .y_desc(daily_desc)
        .draw()?;
    daily.draw_series(observed.iter().enumerate().map(|(i, &v)| {
        let x = i as f64;
        Rectangle::new([(x - 0.25, 0.0), (x + 0.25, v)], BLUE.stroke_width(1))
    }))?;
    for (technique, values) in filled {
        let color = family_color(technique_family(technique));
        daily.draw_series(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| Cross::new((i as f64, v), 3, color.stroke_width(1))),
        )?;
    }

    let observed_cum = cumulative(observed);
    let filled_cum: Vec<(&str, Vec<f64>)> = filled
        .iter()
        .map(|(t, v)| (t.as_str(), cumulative(v)))
        .collect();
    let all_cum = observed_cum
        .iter()
        .chain(filled_cum.iter().flat_map(|(_, v)| v.iter()));
    let (min_cum, max_cum) = all_cum.fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let (c0, c1) = padded_range(min_cum, max_cum, 0.05);

    let mut cum = ChartBuilder::on(&panels[1])
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .caption("Cumulative sum of observed fluxes (blue line) plus filled real gaps", (FONT, 16))
        .build_cartesian_2d(x_range, c0..c1)?;
    cum.configure_mesh()
        .x_label_formatter(&date_label)
        .x_desc("Time (days)")
        .y_desc(cumulative_desc)
        .draw()?;
    for (technique, values) in &filled_cum {
        let color = family_color(technique_family(technique));
        cum.draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
            color.stroke_width(1),
        ))?;
    }
    cum.draw_series(LineSeries::new(
        observed_cum.iter().enumerate().map(|(i, &v)| (i as f64, v)),
        BLUE.stroke_width(3),
    ))?;

    let techniques: Vec<&str> = filled.iter().map(|(t, _)| t.as_str()).collect();
    for family in used_families(techniques.as_slice()) {
        let color = family_color(&family);
        cum.draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?
            .label(family)
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }
    cum.configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
