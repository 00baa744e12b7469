//! Period sums of filled fluxes with uncertainty
//!
//! Random errors come from the `hhs` scenario for every half-hour, bias
//! errors from `hhs` for short real gaps and from `days` for long ones.

use super::operations::{max_finite, min_finite, round_to};
use super::uncertainty::{find_error, ErrorEstimate};
use crate::config::Settings;
use crate::errors::Result;
use crate::gaps::split_short_long;
use crate::scenario::{Scenario, REAL_SUFFIX};
use crate::series::{format_value, parse_value, FluxTable};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;
use tracing::info;

const SUM_DIGITS: i32 = 4;
const ENSEMBLE_DIGITS: i32 = 1;

const SUM_HEADERS: [&str; 9] = [
    "SumObs",
    "SumFillReal",
    "SumTotal",
    "MissFillReal",
    "RandomAll",
    "BiasGaps",
    "ErrorTotal",
    "LowerCI",
    "UpperCI",
];

/// Period sum of one technique
#[derive(Debug, Clone, PartialEq)]
pub struct FluxSum {
    pub technique: String,
    /// Sum over all measured fluxes
    pub sum_obs: f64,
    /// Sum over all filled real gaps
    pub sum_fill_real: f64,
    pub sum_total: f64,
    /// Real gaps the technique could not fill
    pub miss_fill_real: usize,
    pub random_all: f64,
    pub bias_gaps: f64,
    pub error_total: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
}

impl FluxSum {
    fn values(&self) -> [f64; 9] {
        [
            self.sum_obs,
            self.sum_fill_real,
            self.sum_total,
            self.miss_fill_real as f64,
            self.random_all,
            self.bias_gaps,
            self.error_total,
            self.lower_ci,
            self.upper_ci,
        ]
    }
}

/// Techniques with columns for both scenarios, in `days` column order
#[must_use]
pub fn techniques_in_both(table: &FluxTable) -> Vec<String> {
    let names = table.column_names();
    let hhs: Vec<&str> = names
        .iter()
        .filter_map(|name| Scenario::Hhs.technique_of(name))
        .collect();
    names
        .iter()
        .filter_map(|name| Scenario::Days.technique_of(name))
        .filter(|tech| hhs.contains(tech))
        .map(str::to_string)
        .collect()
}

/// Sums with errors for every technique present in both scenarios
///
/// `table` holds the flux column, the scenario columns and the `real`
/// columns; `errors_ft` the full-time error estimates.
///
/// # Errors
///
/// Returns an error if a column or an error estimate is missing.
pub fn calc_sums(
    table: &FluxTable,
    settings: &Settings,
    errors_ft: &[ErrorEstimate],
) -> Result<Vec<FluxSum>> {
    let flux = table.column(&settings.flux_name())?;
    let factor = settings.conv_factor;
    let round = |value: f64| round_to(value, SUM_DIGITS);

    let nansum = |values: &[f64]| values.iter().filter(|v| v.is_finite()).sum::<f64>();
    let sum_obs = round(nansum(flux) * factor);
    let (short, long) = split_short_long(flux);

    techniques_in_both(table)
        .into_iter()
        .map(|tech| {
            let real = table.column(&format!("{tech}_{REAL_SUFFIX}"))?;
            let hhs_name = Scenario::Hhs.column_name(&tech);
            let hhs = table.column(&hhs_name)?;
            let err_hhs = find_error(errors_ft, &hhs_name)?;
            let err_days = find_error(errors_ft, &Scenario::Days.column_name(&tech))?;

            let sum_fill_real = round(nansum(real) * factor - sum_obs);
            let sum_total = round(sum_obs + sum_fill_real);
            let miss_fill_real = flux
                .iter()
                .zip(hhs)
                .filter(|(f, h)| f.is_nan() && h.is_nan())
                .count();
            let random_all =
                round((flux.len() as f64 * err_hhs.sdev.powi(2)).sqrt() * factor);
            let bias_gaps = round(
                (short as f64 * err_hhs.bias_bound() + long as f64 * err_days.bias_bound())
                    * factor,
            );
            let error_total = round(random_all + bias_gaps);

            Ok(FluxSum {
                technique: tech,
                sum_obs,
                sum_fill_real,
                sum_total,
                miss_fill_real,
                random_all,
                bias_gaps,
                error_total,
                lower_ci: round(sum_total - error_total),
                upper_ci: round(sum_total + error_total),
            })
        })
        .collect()
}

/// Save sums with the sums label as index header
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_sums(sums: &[FluxSum], label: &str, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![label.to_string()];
    header.extend(SUM_HEADERS.iter().map(|h| (*h).to_string()));
    writer.write_record(&header)?;
    for sum in sums {
        let mut record = vec![sum.technique.clone()];
        record.extend(sum.values().iter().map(|&v| format_value(v)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!("Results saved to {}", path.display());
    Ok(())
}

/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_sums(path: &Path) -> Result<Vec<FluxSum>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut sums = Vec::new();
    for record in reader.records() {
        let record = record?;
        let value = |i: usize| record.get(i).map_or(f64::NAN, parse_value);
        sums.push(FluxSum {
            technique: record.get(0).unwrap_or_default().to_string(),
            sum_obs: value(1),
            sum_fill_real: value(2),
            sum_total: value(3),
            miss_fill_real: value(4).max(0.0) as usize,
            random_all: value(5),
            bias_gaps: value(6),
            error_total: value(7),
            lower_ci: value(8),
            upper_ci: value(9),
        });
    }
    Ok(sums)
}

/// Console table of sums
#[must_use]
pub fn sums_table(sums: &[FluxSum], label: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![label.to_string()];
    header.extend(SUM_HEADERS.iter().map(|h| (*h).to_string()));
    table.set_header(header);
    for sum in sums {
        let mut row = vec![sum.technique.clone()];
        row.extend(sum.values().iter().map(|v| format!("{v:.2}")));
        table.add_row(row);
    }
    table
}

/// Spread of an ensemble of sums
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleStats {
    pub upper_ci: f64,
    pub upper_unc: f64,
    pub upper_tot: f64,
    pub delta: f64,
    pub lower_tot: f64,
    pub lower_unc: f64,
    pub lower_ci: f64,
    pub total_ci: f64,
}

impl EnsembleStats {
    /// Named values in output order
    #[must_use]
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("UpperCI", self.upper_ci),
            ("UpperUnc", self.upper_unc),
            ("UpperTot", self.upper_tot),
            ("Delta", self.delta),
            ("LowerTot", self.lower_tot),
            ("LowerUnc", self.lower_unc),
            ("LowerCI", self.lower_ci),
            ("TotalCI", self.total_ci),
        ]
    }

    /// Save as `EnsStats,<label>` table
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, label: &str, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["EnsStats", label])?;
        for (name, value) in self.entries() {
            writer.write_record([name.to_string(), format_value(value)])?;
        }
        writer.flush()?;
        info!("Results saved to {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn table(&self, label: &str) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["EnsStats", label]);
        for (name, value) in self.entries() {
            table.add_row(vec![name.to_string(), format!("{value:.1}")]);
        }
        table
    }
}

/// Ensemble statistics over the sums of several techniques
#[must_use]
pub fn calc_ensemble(sums: &[FluxSum]) -> EnsembleStats {
    let totals: Vec<f64> = sums.iter().map(|s| s.sum_total).collect();
    let uppers: Vec<f64> = sums.iter().map(|s| s.upper_ci).collect();
    let lowers: Vec<f64> = sums.iter().map(|s| s.lower_ci).collect();
    let (max_total, min_total) = (max_finite(&totals), min_finite(&totals));
    let (max_upper, min_lower) = (max_finite(&uppers), min_finite(&lowers));
    let round = |value: f64| round_to(value, ENSEMBLE_DIGITS);

    EnsembleStats {
        upper_ci: round(max_upper),
        upper_unc: round(max_upper - max_total),
        upper_tot: round(max_total),
        delta: round(max_total - min_total),
        lower_tot: round(min_total),
        lower_unc: round(min_lower - min_total),
        lower_ci: round(min_lower),
        total_ci: round(max_upper - min_lower),
    }
}
