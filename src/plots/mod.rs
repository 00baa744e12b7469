//! SVG charts of gap distributions, sums, scatter plots, time series and
//! bootstrap statistics
//!
//! Drawing functions return `Box<dyn Error>` as plotters does; the public
//! entry points convert failures into [`MgfError::PlotError`].
//!
//! # Organization
//!
//! - [`gap_distribution`]: gap frequency and cumulative gap amount
//! - [`sums`]: period sums with errors, optionally with an ensemble box
//! - [`daily`]: daily and cumulative sums of filled real gaps
//! - [`scatter`]: predicted against observed fluxes and residuals
//! - [`series`]: time series of fluxes at artificial and real gaps
//! - [`bootstats`]: box statistics of bootstrapped metrics

pub mod bootstats;
pub mod daily;
pub mod gap_distribution;
pub mod scatter;
pub mod series;
pub mod sums;

pub use bootstats::{plot_bootstats, BootPanel};
pub use daily::plot_daily;
pub use gap_distribution::plot_gaps;
pub use scatter::plot_scatter;
pub use series::{plot_series, SeriesKind};
pub use sums::{plot_sums, plot_sums_ens};

use crate::errors::{MgfError, Result};
use plotters::style::{HSLColor, RGBColor};
use std::error::Error;
use std::path::Path;
use tracing::info;

pub(crate) type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// Extension of all chart files
pub const PLOT_EXTENSION: &str = "svg";

/// Number of colours of the rainbow palette
const NUM_COLORS: usize = 20;

pub(crate) const FONT: &str = "sans-serif";

/// Technique families with their position in the rainbow palette
const FAMILIES: [(&str, usize); 8] = [
    ("IP", 1),
    ("WDM", 3),
    ("FDA", 5),
    ("MDA", 8),
    ("MDC", 11),
    ("LUT", 12),
    ("ANN", 17),
    ("Model", 19),
];
const DEFAULT_SLOT: usize = 19;

/// Run a drawing function and report the written file
pub(crate) fn render<F>(path: &Path, draw: F) -> Result<()>
where
    F: FnOnce(&Path) -> DrawResult,
{
    draw(path).map_err(|e| MgfError::PlotError(format!("{}: {}", path.display(), e)))?;
    info!("Plot saved to: {}", path.display());
    Ok(())
}

/// Family of a technique name, the part before the first underscore
#[must_use]
pub fn technique_family(technique: &str) -> &str {
    technique.split('_').next().unwrap_or(technique)
}

/// Colour of a technique family, unknown families share the default colour
#[must_use]
pub fn family_color(family: &str) -> HSLColor {
    let slot = FAMILIES
        .iter()
        .find(|(name, _)| *name == family)
        .map_or(DEFAULT_SLOT, |(_, slot)| *slot);
    rainbow(slot)
}

/// Colour `slot` of a rainbow palette running from red to magenta
#[must_use]
pub fn rainbow(slot: usize) -> HSLColor {
    HSLColor(slot as f64 / NUM_COLORS as f64 * 0.83, 1.0, 0.5)
}

/// Families of the labels in order of first appearance
#[must_use]
pub fn used_families<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut families: Vec<String> = Vec::new();
    for label in labels {
        let family = technique_family(label.as_ref());
        if !families.iter().any(|f| f == family) {
            families.push(family.to_string());
        }
    }
    families
}

/// Gray level as in `0.0` (black) to `1.0` (white)
pub(crate) fn gray(level: f64) -> RGBColor {
    let v = (level.clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBColor(v, v, v)
}

/// Label of category `x` if it lies on an integer position
pub(crate) fn category_label<S: AsRef<str>>(labels: &[S], x: f64) -> String {
    let rounded = x.round();
    if rounded < 0.0 || (x - rounded).abs() > 1e-6 {
        return String::new();
    }
    labels
        .get(rounded as usize)
        .map(|l| l.as_ref().to_string())
        .unwrap_or_default()
}

/// Range padded by `fraction` of its span, widened if empty or invalid
pub(crate) fn padded_range(min: f64, max: f64, fraction: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= 0.0 {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        return (min - pad, max + pad);
    }
    (min - fraction * span, max + fraction * span)
}

/// File name of a chart, e.g. `pgd_NH3_202201011200_real.svg`
#[must_use]
pub fn plot_file_name(kind: &str, gas: &str, run_number: &str, suffix: &str) -> String {
    let mut name = format!("{kind}_{gas}_{run_number}");
    if !suffix.is_empty() {
        name.push('_');
        name.push_str(suffix);
    }
    format!("{name}.{PLOT_EXTENSION}")
}
