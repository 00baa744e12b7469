//! multi_gap_fill: multiple gap-filling of eddy-covariance flux time series
//!
//! Gaps in half-hourly trace-gas fluxes are filled with several techniques
//! (interpolations and look-up tables). Every technique is evaluated on
//! artificial gaps, a single half-hour (`hhs`) or a whole day (`days`) at a
//! time, and its performance is bootstrapped. The bootstrap errors give the
//! uncertainty of the aggregated flux sums, and a picked ensemble of good
//! techniques gives the final sum with its spread.
//!
//! ## Module Organization
//!
//! - [`config`]: run settings from the ini file
//! - [`series`]: half-hourly flux tables and their checks
//! - [`gaps`]: gap lengths and gap distributions
//! - [`window`]: index windows around a gap
//! - [`techniques`]: gap-filling techniques
//! - [`statistics`]: bootstrapping, errors, sums and descriptions
//! - [`plots`]: SVG charts
//! - [`pipeline`]: the stages of a run
//! - [`parallel`]: parallel processing configuration
//! - [`logging`]: console and run log output
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use multi_gap_fill::prelude::*;
//! use std::path::Path;
//!
//! let site = Path::new("DE-BaF");
//! let run = run_gft(site, "tNr_BaF_2016.ini").unwrap();
//! inspect_ff(site, &run).unwrap();
//! bootstrap_ff(site, &run, &BootstrapSettings::default()).unwrap();
//! analyse_bs(site, &run).unwrap();
//! let stats = pick_ge(site, &run, Some("MDA_hh5|MDC_d7|LUT_V1V2_d7")).unwrap();
//! println!("Ensemble sum between {} and {}", stats.lower_ci, stats.upper_ci);
//! ```

pub mod config;
pub mod errors;
pub mod gaps;
pub mod logging;
pub mod parallel;
pub mod pipeline;
pub mod plots;
pub mod scenario;
pub mod series;
pub mod statistics;
pub mod techniques;
pub mod window;

pub use errors::*;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{BootstrapSettings, Settings};
    pub use crate::errors::{MgfError, Result};
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{analyse_bs, bootstrap_ff, inspect_ff, pick_ge, run_all, run_gft, RunLayout};
    pub use crate::scenario::{Scenario, TimeOfDay};
    pub use crate::series::FluxTable;
    pub use crate::statistics::{BootstrapResult, EnsembleStats, FluxSum};
    pub use crate::techniques::GapFillingTechnique;
}
