//! Bootstrapping of technique performance on artificial gaps
//!
//! Each repetition draws a sample of positions and evaluates every technique
//! of a scenario on it. Only positions with a measured flux that every
//! technique of the scenario filled take part, so all techniques are compared
//! on identical data.

use super::operations::{mean, population_std, Metric};
use super::parallel::{complete_positions, parallel_metrics};
use crate::config::{BootstrapSettings, HALF_HOURS_PER_DAY};
use crate::errors::{MgfError, Result};
use crate::scenario::Scenario;
use crate::series::{format_value, parse_value, FluxTable};
use ndarray::{s, Array3, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::{info, warn};

const METRIC_HEADER: &str = "Metric";
const REPETITION_HEADER: &str = "Repetition";

/// Metrics per repetition and technique
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapResult {
    /// Scenario column names, e.g. `MDC_d7_hhs`
    pub techniques: Vec<String>,
    /// Shape `(metrics, repetitions, techniques)`
    pub values: Array3<f64>,
}

impl BootstrapResult {
    #[must_use]
    pub fn repetitions(&self) -> usize {
        self.values.shape()[1]
    }

    #[must_use]
    pub fn technique_index(&self, technique: &str) -> Option<usize> {
        self.techniques.iter().position(|t| t == technique)
    }

    /// All repetitions of one metric for one technique
    #[must_use]
    pub fn metric(&self, metric: Metric, technique: usize) -> ArrayView1<'_, f64> {
        self.values.slice(s![metric.index(), .., technique])
    }

    /// Repetitions of one metric as an owned vector
    #[must_use]
    pub fn metric_values(&self, metric: Metric, technique: usize) -> Vec<f64> {
        self.metric(metric, technique).to_vec()
    }

    /// Log mean and standard deviation of every metric per technique
    pub fn log_summary(&self, percent: f64) {
        for (i, technique) in self.techniques.iter().enumerate() {
            let summary: Vec<String> = Metric::ALL
                .iter()
                .map(|&metric| {
                    let values = self.metric_values(metric, i);
                    format!(
                        "{}: {:.2} {:.2}",
                        metric.as_str(),
                        mean(&values),
                        population_std(&values)
                    )
                })
                .collect();
            info!(
                "{} {} {} {}",
                technique,
                self.repetitions(),
                percent,
                summary.join(", ")
            );
        }
    }

    /// Save with one row per metric and repetition
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![METRIC_HEADER.to_string(), REPETITION_HEADER.to_string()];
        header.extend(self.techniques.iter().cloned());
        writer.write_record(&header)?;

        for metric in Metric::ALL {
            for rep in 0..self.repetitions() {
                let mut record = vec![metric.as_str().to_string(), rep.to_string()];
                record.extend(
                    (0..self.techniques.len())
                        .map(|t| format_value(self.values[[metric.index(), rep, t]])),
                );
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a table written by [`BootstrapResult::save_csv`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has an unknown metric.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let techniques: Vec<String> = reader.headers()?.iter().skip(2).map(str::to_string).collect();

        let mut rows: Vec<(Metric, usize, Vec<f64>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let name = record.get(0).unwrap_or_default();
            let metric = Metric::from_name(name).ok_or_else(|| {
                MgfError::Generic(format!("Unknown metric '{}' in {}", name, path.display()))
            })?;
            let rep_text = record.get(1).unwrap_or_default();
            let rep = rep_text.parse::<usize>().map_err(|_| {
                MgfError::Generic(format!(
                    "Invalid repetition '{}' in {}",
                    rep_text,
                    path.display()
                ))
            })?;
            let values = record.iter().skip(2).map(parse_value).collect();
            rows.push((metric, rep, values));
        }

        let repetitions = rows.iter().map(|(_, rep, _)| rep + 1).max().unwrap_or(0);
        let mut values = Array3::from_elem(
            (Metric::ALL.len(), repetitions, techniques.len()),
            f64::NAN,
        );
        for (metric, rep, row) in rows {
            for (t, value) in row.into_iter().take(techniques.len()).enumerate() {
                values[[metric.index(), rep, t]] = value;
            }
        }
        Ok(Self { techniques, values })
    }
}

/// Scenario columns of a table in column order
#[must_use]
pub fn scenario_columns(table: &FluxTable, scenario: Scenario) -> Vec<String> {
    table
        .column_names()
        .into_iter()
        .filter(|name| scenario.technique_of(name).is_some())
        .map(str::to_string)
        .collect()
}

/// Positions with a measured flux filled by every technique of the scenario
///
/// # Errors
///
/// Returns an error if the flux column is missing.
pub fn eligible_positions(
    table: &FluxTable,
    flux_column: &str,
    scenario: Scenario,
) -> Result<Vec<bool>> {
    let observed = table.column(flux_column)?;
    let names = scenario_columns(table, scenario);
    let predicted = names
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>>>()?;
    Ok(complete_positions(observed, &predicted))
}

/// Draw the positions of one repetition
///
/// `hhs` draws half of the half-hours with replacement; `days` draws half of
/// the complete days with replacement and takes all their half-hours.
/// Positions not in `eligible` are dropped, duplicates are kept.
pub fn draw_sample<R: Rng>(
    rng: &mut R,
    eligible: &[bool],
    scenario: Scenario,
    percent: f64,
) -> Vec<usize> {
    let len = eligible.len();
    let positions: Vec<usize> = match scenario {
        Scenario::Hhs => {
            let num_set = (len as f64 * percent / 100.0) as usize;
            if len == 0 {
                Vec::new()
            } else {
                (0..num_set).map(|_| rng.gen_range(0..len)).collect()
            }
        }
        Scenario::Days => {
            let num_days = len / HALF_HOURS_PER_DAY;
            let num_set = (len as f64 / HALF_HOURS_PER_DAY as f64 * percent / 100.0) as usize;
            if num_days == 0 {
                Vec::new()
            } else {
                (0..num_set)
                    .flat_map(|_| {
                        let day = rng.gen_range(0..num_days);
                        day * HALF_HOURS_PER_DAY..(day + 1) * HALF_HOURS_PER_DAY
                    })
                    .collect()
            }
        }
    };
    positions.into_iter().filter(|&i| eligible[i]).collect()
}

/// Bootstrap the performance of every technique of a scenario
///
/// Random draws come from one seeded generator in repetition order, so the
/// result does not depend on the number of threads.
///
/// # Errors
///
/// Returns an error if the flux column is missing or the scenario has no
/// technique columns.
pub fn bootstrap_artificial(
    table: &FluxTable,
    flux_column: &str,
    scenario: Scenario,
    settings: &BootstrapSettings,
) -> Result<BootstrapResult> {
    let techniques = scenario_columns(table, scenario);
    if techniques.is_empty() {
        return Err(MgfError::Generic(format!(
            "No technique columns for scenario '{scenario}'"
        )));
    }
    let observed = table.column(flux_column)?;
    let predicted = techniques
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>>>()?;
    let eligible = complete_positions(observed, &predicted);

    let measured = observed.iter().filter(|v| v.is_finite()).count();
    let used = eligible.iter().filter(|&&e| e).count();
    info!(
        "Number of artificial gaps used for bootstrapping '{}': {}",
        scenario, used
    );
    if measured > used {
        warn!(
            "Missing artificial gaps due to (partially) incomplete techniques: {}",
            measured - used
        );
    }
    info!(
        "Settings for bootstrapping: repetitions = {}, percent of data = {}, seed = {}",
        settings.repetitions, settings.percent, settings.seed
    );

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut values = Array3::from_elem(
        (Metric::ALL.len(), settings.repetitions, techniques.len()),
        f64::NAN,
    );
    for rep in 0..settings.repetitions {
        let sample = draw_sample(&mut rng, &eligible, scenario, settings.percent);
        let metrics = parallel_metrics(observed, &predicted, &sample);
        values.slice_mut(s![.., rep, ..]).assign(&metrics);
    }

    let result = BootstrapResult { techniques, values };
    result.log_summary(settings.percent);
    Ok(result)
}
