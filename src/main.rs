//! Entry point for the mgf application.
//! Handles CLI parsing, logging and thread pool setup, and dispatches the run stages.

use clap::Parser;
use multi_gap_fill::logging::init_logging;
use multi_gap_fill::parallel::{ParallelConfig, ParallelInfo};
use multi_gap_fill::pipeline;
use tracing::{error, info};

mod cli;

use cli::{Args, Command};

fn main() {
    let args = Args::parse();

    println!(
        r#"
------------------------------------------------------------------
                 __  __   ____   _____
                |  \/  | / ___| |  ___|
                | |\/| || |  _  | |_
                | |  | || |_| | |  _|
                |_|  |_| \____| |_|
          Multiple gap-filling of eddy-covariance fluxes
------------------------------------------------------------------
                        "#
    );

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> multi_gap_fill::Result<()> {
    let parallel = match args.threads {
        Some(threads) => ParallelConfig::with_threads(threads),
        None => ParallelConfig::all_cores(),
    };
    parallel.setup_global_pool()?;
    ParallelInfo::collect().log();

    match args.command {
        Command::Run(new_run) => {
            let run_number = pipeline::run_gft(&new_run.site, &new_run.ini)?;
            info!("Finished run {}", run_number);
        }
        Command::Inspect(run) => pipeline::inspect_ff(&run.site, &run.run)?,
        Command::Bootstrap { run, boot } => {
            pipeline::bootstrap_ff(&run.site, &run.run, &boot.settings())?;
        }
        Command::Analyse(run) => {
            pipeline::analyse_bs(&run.site, &run.run)?;
        }
        Command::Pick { run, good } => {
            pipeline::pick_ge(&run.site, &run.run, good.as_deref())?;
        }
        Command::All { run, boot } => {
            let run_number = pipeline::run_all(&run.site, &run.ini, &boot.settings())?;
            info!("Finished run {}; pick an ensemble with 'mgf pick --run {}'", run_number, run_number);
        }
        Command::Gaps(new_run) => {
            pipeline::gap_report(&new_run.site, &new_run.ini)?;
        }
    }
    Ok(())
}
