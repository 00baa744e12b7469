//! Performance statistics, error estimates and period sums
//!
//! # Organization
//!
//! - [`operations`]: metrics and basic statistics
//! - [`parallel`]: parallel evaluation of metrics across techniques
//! - [`bootstrap`]: bootstrapping performance on artificial gaps
//! - [`uncertainty`]: error estimates from bootstrap results
//! - [`sums`]: period sums with uncertainty and ensemble statistics
//! - [`describe`]: description of a filled run

pub mod bootstrap;
pub mod describe;
pub mod operations;
pub mod parallel;
pub mod sums;
pub mod uncertainty;

pub use bootstrap::{bootstrap_artificial, scenario_columns, BootstrapResult};
pub use describe::{describe, Description};
pub use operations::{mean, percentile, population_std, round_to, Metric};
pub use parallel::parallel_metrics;
pub use sums::{calc_ensemble, calc_sums, EnsembleStats, FluxSum};
pub use uncertainty::{calc_errors, format_errors, make_error_table, ErrorEstimate, FormattedError};
