//! Gap distribution chart
//!
//! Gray bars give the number of gaps per gap length (left axis). Red bars
//! give the percent of all half-hours in gaps of that length and the dotted
//! step line with dash markers their cumulative percent (right axis).

use super::{category_label, gray, render, DrawResult, FONT};
use crate::config::Settings;
use crate::errors::Result;
use crate::gaps::GapDistribution;
use crate::series::FluxTable;
use plotters::prelude::*;
use std::path::Path;

const BAR_WIDTH: f64 = 0.35;
const PIXELS_PER_BAR: u32 = 50;
const MIN_WIDTH: u32 = 640;
const HEIGHT: u32 = 500;

/// Plot the gap distribution of `column`
///
/// # Errors
///
/// Returns an error if the column is missing or the chart cannot be written.
pub fn plot_gaps(table: &FluxTable, settings: &Settings, column: &str, path: &Path) -> Result<()> {
    let distribution = GapDistribution::from_values(table.column(column)?);
    render(path, |p| draw_gaps(&distribution, &settings.flux_gas, p))
}

fn draw_gaps(distribution: &GapDistribution, gas: &str, path: &Path) -> DrawResult {
    let num_bars = distribution.classes.len();
    let width = (num_bars as u32 * PIXELS_PER_BAR).max(MIN_WIDTH);
    let root = SVGBackend::new(path, (width, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<String> = distribution
        .classes
        .iter()
        .map(|c| c.length.to_string())
        .collect();
    let freq_max = distribution
        .classes
        .iter()
        .map(|c| c.freq)
        .fold(0.0f64, f64::max)
        .max(1.0)
        * 1.05;
    let x_range = -0.5f64..(num_bars.max(1) as f64 - 0.5);

    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), 0.0f64..freq_max)?
        .set_secondary_coord(x_range, 0.0f64..105.0f64);

    let x_formatter = |x: &f64| category_label(labels.as_slice(), *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_bars.max(1))
        .x_label_formatter(&x_formatter)
        .x_desc("Length of gaps (hh)")
        .y_desc("Gap frequency")
        .axis_desc_style((FONT, 16).into_font().style(FontStyle::Bold))
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("Gap amount (%)")
        .draw()?;

    chart.draw_series(distribution.classes.iter().enumerate().map(|(i, class)| {
        let x = i as f64;
        Rectangle::new([(x - BAR_WIDTH, 0.0), (x, class.freq)], gray(0.5).filled())
    }))?;

    let steps: Vec<(f64, f64)> = distribution
        .classes
        .iter()
        .enumerate()
        .flat_map(|(i, class)| {
            let x = i as f64;
            let y = class.perc_data_sums;
            [(x - BAR_WIDTH, y), (x, y), (x + BAR_WIDTH, y)]
        })
        .collect();
    chart.draw_secondary_series(DashedLineSeries::new(steps, 2, 3, BLACK.stroke_width(1)))?;
    chart.draw_secondary_series(distribution.classes.iter().enumerate().map(|(i, class)| {
        let x = i as f64;
        PathElement::new(
            vec![(x - BAR_WIDTH / 2.0, class.perc_data_sums), (x + BAR_WIDTH / 2.0, class.perc_data_sums)],
            BLACK.stroke_width(2),
        )
    }))?;
    chart.draw_secondary_series(distribution.classes.iter().enumerate().map(|(i, class)| {
        let x = i as f64;
        Rectangle::new([(x, 0.0), (x + BAR_WIDTH, class.perc_data)], RED.filled())
    }))?;

    let lines = [
        format!("Gap distribution for {gas}"),
        format!("# of fluxes:  {}", distribution.measured),
        format!("# of gaps:    {}", distribution.gaps),
        format!("# in total:   {}", distribution.total),
    ];
    let (x0, y0) = ((width as f64 * 0.35) as i32, 30);
    let line_height = 20;
    root.draw(&Rectangle::new(
        [(x0 - 8, y0 - 8), (x0 + 230, y0 + line_height * lines.len() as i32 + 4)],
        WHITE.mix(0.5).filled(),
    ))?;
    root.draw(&Rectangle::new(
        [(x0 - 8, y0 - 8), (x0 + 230, y0 + line_height * lines.len() as i32 + 4)],
        BLACK.stroke_width(1),
    ))?;
    for (i, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.as_str(),
            (x0, y0 + line_height * i as i32),
            (FONT, 16).into_font(),
        ))?;
    }

    root.present()?;
    Ok(())
}
