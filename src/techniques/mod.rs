//! Gap-filling techniques
//!
//! Every technique fills a complete column for one artificial gap scenario:
//! each position in turn is treated as a gap (a single half-hour for `hhs`,
//! its whole day for `days`) and estimated from the remaining data. Filling
//! real gaps is therefore part of the `hhs` scenario.
//!
//! # Organization
//!
//! - [`lookup`]: look-up tables, including the diurnal techniques WDM, FDA,
//!   MDA and MDC which are look-up tables with trivial conditions
//! - [`interpolation`]: linear and moving-average interpolation

pub mod interpolation;
pub mod lookup;

pub use interpolation::Interpolation;
pub use lookup::{define_lookup_tables, define_mds_table, Condition, LookupTable};

use crate::config::Settings;
use crate::errors::Result;
use crate::scenario::Scenario;
use crate::series::FluxTable;

/// A technique that fills every position of a flux column
pub trait GapFillingTechnique: Send + Sync {
    /// Technique name without scenario suffix, e.g. `MDC_d7`
    fn name(&self) -> &str;

    /// Fill all positions of `flux_column` under the given scenario
    ///
    /// Positions that cannot be filled stay `NaN`.
    ///
    /// # Errors
    ///
    /// Returns an error if a column the technique depends on is missing.
    fn fill(&self, table: &FluxTable, flux_column: &str, scenario: Scenario) -> Result<Vec<f64>>;
}

/// All techniques configured by the settings, interpolations first
#[must_use]
pub fn catalogue(settings: &Settings) -> Vec<Box<dyn GapFillingTechnique>> {
    let mut techniques: Vec<Box<dyn GapFillingTechnique>> = vec![
        Box::new(Interpolation::Linear),
        Box::new(Interpolation::Moving),
    ];
    for table in define_lookup_tables(settings)
        .into_iter()
        .chain(define_mds_table(settings))
    {
        techniques.push(Box::new(table));
    }
    techniques
}
