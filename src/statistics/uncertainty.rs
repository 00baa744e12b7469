//! Error estimates derived from bootstrap results

use super::bootstrap::BootstrapResult;
use super::operations::{mean, percentile, population_std, round_to, Metric};
use crate::errors::{MgfError, Result};
use crate::scenario::TimeOfDay;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Decimals kept in error estimates
const ERROR_DIGITS: i32 = 6;

/// Error estimate of one scenario column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEstimate {
    #[serde(rename = "Technique")]
    pub technique: String,
    /// 10th percentile of the bootstrapped bias
    #[serde(rename = "Bias_10")]
    pub bias_10: f64,
    #[serde(rename = "Bias_90")]
    pub bias_90: f64,
    #[serde(rename = "SDev")]
    pub sdev: f64,
    #[serde(rename = "SDev_SD")]
    pub sdev_sd: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
    #[serde(rename = "R2_SD")]
    pub r2_sd: f64,
}

impl ErrorEstimate {
    fn from_bootstrap(result: &BootstrapResult, technique: usize) -> Self {
        let bias = result.metric_values(Metric::Bias, technique);
        let sdev = result.metric_values(Metric::SDev, technique);
        let r2 = result.metric_values(Metric::R2, technique);
        let round = |value: f64| round_to(value, ERROR_DIGITS);
        Self {
            technique: result.techniques[technique].clone(),
            bias_10: round(percentile(&bias, 10.0)),
            bias_90: round(percentile(&bias, 90.0)),
            sdev: round(mean(&sdev)),
            sdev_sd: round(population_std(&sdev)),
            r2: round(mean(&r2)),
            r2_sd: round(population_std(&r2)),
        }
    }

    /// Largest absolute bias percentile
    #[must_use]
    pub fn bias_bound(&self) -> f64 {
        self.bias_10.abs().max(self.bias_90.abs())
    }
}

/// Error estimates of `hhs` columns followed by `days` columns
#[must_use]
pub fn calc_errors(hhs: &BootstrapResult, days: &BootstrapResult) -> Vec<ErrorEstimate> {
    [hhs, days]
        .into_iter()
        .flat_map(|result| {
            (0..result.techniques.len()).map(move |t| ErrorEstimate::from_bootstrap(result, t))
        })
        .collect()
}

/// Look up the estimate of a scenario column
///
/// # Errors
///
/// Returns `ColumnNotFound` if there is no estimate for the column.
pub fn find_error<'a>(errors: &'a [ErrorEstimate], technique: &str) -> Result<&'a ErrorEstimate> {
    errors
        .iter()
        .find(|e| e.technique == technique)
        .ok_or_else(|| MgfError::ColumnNotFound {
            column: technique.to_string(),
        })
}

/// Save error estimates, one row per scenario column
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_errors(errors: &[ErrorEstimate], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for estimate in errors {
        writer.serialize(estimate)?;
    }
    writer.flush()?;
    info!("Results saved to {}", path.display());
    Ok(())
}

/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_errors(path: &Path) -> Result<Vec<ErrorEstimate>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut errors = Vec::new();
    for row in reader.deserialize() {
        errors.push(row?);
    }
    Ok(errors)
}

/// Error estimate rendered as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedError {
    pub technique: String,
    pub time_base: String,
    /// `(b10, b90)`
    pub bias: String,
    /// `sdev ±sd`
    pub sdev: String,
    /// `r2 ±sd`
    pub r2: String,
}

/// Render estimates with four decimals
#[must_use]
pub fn format_errors(errors: &[ErrorEstimate], time_of_day: TimeOfDay) -> Vec<FormattedError> {
    errors
        .iter()
        .map(|e| FormattedError {
            technique: e.technique.clone(),
            time_base: time_of_day.short().to_string(),
            bias: format!("({:.4}, {:.4})", e.bias_10, e.bias_90),
            sdev: format!("{:.4} ±{:.4}", e.sdev, e.sdev_sd),
            r2: format!("{:.4} ±{:.4}", e.r2, e.r2_sd),
        })
        .collect()
}

/// Combine full-time, day-time and night-time errors
///
/// Rows are grouped per technique in the order of the full-time estimates.
#[must_use]
pub fn make_error_table(
    ft: &[ErrorEstimate],
    dt: &[ErrorEstimate],
    nt: &[ErrorEstimate],
) -> Vec<FormattedError> {
    let formatted = [
        format_errors(ft, TimeOfDay::Full),
        format_errors(dt, TimeOfDay::Day),
        format_errors(nt, TimeOfDay::Night),
    ];

    let mut order: Vec<&str> = Vec::new();
    for row in formatted.iter().flatten() {
        if !order.contains(&row.technique.as_str()) {
            order.push(&row.technique);
        }
    }

    order
        .iter()
        .flat_map(|technique| {
            formatted
                .iter()
                .filter_map(move |rows| rows.iter().find(|r| r.technique == *technique))
        })
        .cloned()
        .collect()
}

/// Save the formatted error table with the flux label as first header
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_error_table(rows: &[FormattedError], label: &str, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([label, "TimeBase", "Bias", "SDev", "R2"])?;
    for row in rows {
        writer.write_record([
            row.technique.as_str(),
            row.time_base.as_str(),
            row.bias.as_str(),
            row.sdev.as_str(),
            row.r2.as_str(),
        ])?;
    }
    writer.flush()?;
    info!("Results saved to {}", path.display());
    Ok(())
}
