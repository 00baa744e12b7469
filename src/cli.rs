//! Defines command-line interface options using `clap` for the mgf application.

use clap::{Args as ClapArgs, Parser, Subcommand};
use multi_gap_fill::config::BootstrapSettings;
use std::path::PathBuf;

/// Multiple gap-filling of eddy-covariance flux time series
#[derive(Parser, Debug)]
#[command(
    version,
    name = "mgf",
    about = "Fill gaps in half-hourly flux series with multiple techniques and aggregate ensemble sums"
)]
pub struct Args {
    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new run: fill both artificial gap scenarios with all techniques
    Run(NewRun),

    /// Fill real gaps, join model results, describe the run and plot
    Inspect(ExistingRun),

    /// Bootstrap the performance of all techniques
    Bootstrap {
        #[command(flatten)]
        run: ExistingRun,
        #[command(flatten)]
        boot: BootOptions,
    },

    /// Derive errors from the bootstrap results and compute sums
    Analyse(ExistingRun),

    /// Compute ensemble sums of good techniques
    Pick {
        #[command(flatten)]
        run: ExistingRun,

        /// Name fragments of the good techniques separated by '|', e.g. 'MDA_hh5|MDC_d7'
        #[arg(short, long)]
        good: Option<String>,
    },

    /// Run, inspect, bootstrap and analyse in sequence
    All {
        #[command(flatten)]
        run: NewRun,
        #[command(flatten)]
        boot: BootOptions,
    },

    /// Plot the gap distribution of the raw data
    Gaps(NewRun),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct NewRun {
    /// Site directory holding the ini file and the data files
    #[arg(short, long)]
    pub site: PathBuf,

    /// Name of the ini file in the site directory
    #[arg(short, long)]
    pub ini: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExistingRun {
    /// Site directory holding the run directories
    #[arg(short, long)]
    pub site: PathBuf,

    /// Run number, formatted as YYYYMMDDHHMM
    #[arg(short, long, value_parser = parse_run_number)]
    pub run: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BootOptions {
    /// Number of bootstrap repetitions
    #[arg(long, default_value_t = BootstrapSettings::default().repetitions)]
    pub repetitions: usize,

    /// Seed of the random draws
    #[arg(long, default_value_t = BootstrapSettings::default().seed)]
    pub seed: u64,
}

impl BootOptions {
    pub fn settings(&self) -> BootstrapSettings {
        BootstrapSettings {
            repetitions: self.repetitions,
            seed: self.seed,
            ..BootstrapSettings::default()
        }
    }
}

fn parse_run_number(s: &str) -> Result<String, String> {
    if s.len() == 12 && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err("Invalid format: Expected run number 'YYYYMMDDHHMM'.".to_string())
    }
}
