//! Stages of a multiple gap-filling run
//!
//! A run lives in `<site>/<run_number>/` and is processed in the order
//! [`run_gft`], [`inspect_ff`], [`bootstrap_ff`], [`analyse_bs`] and
//! [`pick_ge`]. Each stage reads the files written by the previous ones, so
//! stages can be repeated individually. All stages append their log to
//! `log_<run_number>.log`.

use crate::config::{BootstrapSettings, Settings, CODE_VERSION};
use crate::errors::{MgfError, Result};
use crate::gaps::GapDistribution;
use crate::logging::RunLog;
use crate::plots::{
    plot_bootstats, plot_daily, plot_file_name, plot_gaps, plot_scatter, plot_series, plot_sums,
    plot_sums_ens, BootPanel, SeriesKind,
};
use crate::scenario::{Scenario, TimeOfDay, REAL_SUFFIX};
use crate::series::FluxTable;
use crate::statistics::bootstrap::{bootstrap_artificial, scenario_columns, BootstrapResult};
use crate::statistics::describe::describe;
use crate::statistics::sums::{calc_ensemble, calc_sums, save_sums, sums_table, EnsembleStats, FluxSum};
use crate::statistics::uncertainty::{
    calc_errors, load_errors, make_error_table, save_error_table, save_errors, ErrorEstimate,
};
use crate::techniques::catalogue;
use chrono::Local;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ensemble picked for NH3 when no techniques are given
pub const DEFAULT_NH3_ENSEMBLE: &str = "IP|WDM|FDA|MDA|LUT_V1_d7|LUT_V1V2_d7|LUT_V1V2V3_d7|ANN";

/// Output folder of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    /// Copies of the input files
    Input,
    /// Intermediate tables
    Mgf,
    /// Result tables
    Results,
    /// Charts
    Plots,
}

impl Folder {
    pub const ALL: [Folder; 4] = [Folder::Input, Folder::Mgf, Folder::Results, Folder::Plots];

    pub const fn dir_name(self) -> &'static str {
        match self {
            Folder::Input => "_in",
            Folder::Mgf => "_mgf",
            Folder::Results => "_res",
            Folder::Plots => "_plots",
        }
    }
}

/// Directory layout of one run below the site directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    site_dir: PathBuf,
    run_number: String,
}

impl RunLayout {
    pub fn new(site_dir: &Path, run_number: &str) -> Self {
        Self {
            site_dir: site_dir.to_path_buf(),
            run_number: run_number.to_string(),
        }
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    pub fn run_number(&self) -> &str {
        &self.run_number
    }

    pub fn run_dir(&self) -> PathBuf {
        self.site_dir.join(&self.run_number)
    }

    pub fn folder(&self, folder: Folder) -> PathBuf {
        self.run_dir().join(folder.dir_name())
    }

    pub fn log_file(&self) -> PathBuf {
        self.run_dir().join(format!("log_{}.log", self.run_number))
    }

    /// Saved settings of the run
    pub fn settings_file(&self) -> PathBuf {
        self.folder(Folder::Mgf).join(format!("ini_{}.ini", self.run_number))
    }

    /// Table file `<prefix>_<gas>_<run>[_<suffix>].csv`
    pub fn table_file(&self, folder: Folder, prefix: &str, gas: &str, suffix: &str) -> PathBuf {
        self.folder(folder)
            .join(result_name(prefix, gas, &self.run_number, suffix, "csv"))
    }

    /// Chart file in the plots folder
    pub fn plot_file(&self, kind: &str, gas: &str, suffix: &str) -> PathBuf {
        self.folder(Folder::Plots)
            .join(plot_file_name(kind, gas, &self.run_number, suffix))
    }

    /// Create the run directory with all folders
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create(&self) -> Result<()> {
        for folder in Folder::ALL {
            fs::create_dir_all(self.folder(folder))?;
        }
        Ok(())
    }
}

fn result_name(prefix: &str, gas: &str, run_number: &str, suffix: &str, extension: &str) -> String {
    if suffix.is_empty() {
        format!("{prefix}_{gas}_{run_number}.{extension}")
    } else {
        format!("{prefix}_{gas}_{run_number}_{suffix}.{extension}")
    }
}

/// Run number from the local time, `YYYYMMDDHHMM`
#[must_use]
pub fn new_run_number() -> String {
    Local::now().format("%Y%m%d%H%M").to_string()
}

/// Layout, settings and open log of a stage working on an existing run
struct Stage {
    layout: RunLayout,
    settings: Settings,
    _log: RunLog,
}

impl Stage {
    fn open(site_dir: &Path, run_number: &str) -> Result<Self> {
        let layout = RunLayout::new(site_dir, run_number);
        if !layout.run_dir().is_dir() {
            return Err(MgfError::Generic(format!(
                "Run directory {} does not exist",
                layout.run_dir().display()
            )));
        }
        let log = RunLog::open(&layout.log_file())?;
        let settings = Settings::load(&layout.settings_file())?;
        info!("Reloaded settings of run {} for {}", run_number, settings.flux_gas);
        Ok(Self {
            layout,
            settings,
            _log: log,
        })
    }

    fn table(&self, folder: Folder, prefix: &str, suffix: &str) -> PathBuf {
        self.layout
            .table_file(folder, prefix, &self.settings.flux_gas, suffix)
    }

    fn plot(&self, kind: &str, suffix: &str) -> PathBuf {
        self.layout.plot_file(kind, &self.settings.flux_gas, suffix)
    }

    fn load_all_data(&self) -> Result<FluxTable> {
        FluxTable::read_csv(&self.table(Folder::Mgf, "mgf_AllData", ""), b',')
    }

    fn bootstrap_file(&self, time_of_day: TimeOfDay, scenario: Scenario) -> PathBuf {
        self.table(
            Folder::Mgf,
            "boot",
            &format!("{}_{}", time_of_day.short(), scenario.suffix()),
        )
    }

    fn errors_file(&self, time_of_day: TimeOfDay) -> PathBuf {
        self.table(Folder::Mgf, "berr", time_of_day.short())
    }
}

/// Fill both scenarios with all techniques in a new run
///
/// Returns the run number.
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, a series check fails or a
/// technique cannot be applied.
pub fn run_gft(site_dir: &Path, ini_name: &str) -> Result<String> {
    run_gft_numbered(site_dir, ini_name, &new_run_number())
}

/// [`run_gft`] with a given run number
///
/// # Errors
///
/// See [`run_gft`].
pub fn run_gft_numbered(site_dir: &Path, ini_name: &str, run_number: &str) -> Result<String> {
    info!("Gap-filling run {} in {}", run_number, site_dir.display());
    let ini_path = site_dir.join(ini_name);
    let mut settings = Settings::load(&ini_path)?;
    let data_path = site_dir.join(&settings.file_data);
    let mut data = FluxTable::read_csv(&data_path, settings.file_separator)?;
    info!("Loaded {} with {} columns", data_path.display(), data.columns().len());

    let checks = data.prepare_flux_column(&settings)?;
    if !checks.all_passed() {
        let failed = checks.failed();
        for check in &failed {
            warn!("Check failed: {}", check);
        }
        return Err(MgfError::ValidationFailed { failed });
    }
    info!("All file checks passed");

    let layout = RunLayout::new(site_dir, run_number);
    layout.create()?;
    let _log = RunLog::open(&layout.log_file())?;
    info!("Created run directory {}", layout.run_dir().display());

    let input_dir = layout.folder(Folder::Input);
    let mut inputs = vec![ini_name.to_string(), settings.file_data.clone()];
    inputs.extend(settings.file_models.clone());
    for input in &inputs {
        let source = site_dir.join(input);
        let name = source.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(input));
        fs::copy(&source, input_dir.join(name))?;
    }

    settings.set("FileIni", ini_name);
    settings.set("RunNumber", run_number);
    settings.set("CodeVersion", CODE_VERSION);
    settings.save(&layout.settings_file())?;

    let gas = settings.flux_gas.clone();
    data.write_csv(&layout.table_file(Folder::Mgf, "gf_FluxData", &gas, ""))?;

    let flux_name = settings.flux_name();
    let techniques = catalogue(&settings);
    let names: Vec<&str> = techniques.iter().map(|t| t.name()).collect();
    info!("The following techniques will be applied: {}", names.join(", "));

    let started = Local::now();
    for scenario in Scenario::ALL {
        for technique in &techniques {
            let filled = technique.fill(&data, &flux_name, scenario)?;
            data.push_column(&scenario.column_name(technique.name()), filled)?;
        }
        info!(
            "Scenario '{}' filled in {:.1} s",
            scenario,
            (Local::now() - started).num_milliseconds() as f64 / 1000.0
        );
    }

    data.write_csv(&layout.table_file(Folder::Mgf, "mgf_Scenarios", &gas, ""))?;
    info!(
        "Gap filling of scenarios with several techniques finished for {}, run number: {}",
        gas, run_number
    );
    Ok(run_number.to_string())
}

/// Fill the real gaps from the `hhs` scenarios
///
/// The result keeps every column except the `days` scenarios; each `hhs`
/// column becomes a `real` column holding the measured flux where available,
/// else the technique's value, else the value of the default technique.
///
/// # Errors
///
/// Returns an error if the flux column or the default technique is missing.
pub fn fill_real_gaps(data: &FluxTable, settings: &Settings) -> Result<FluxTable> {
    let flux = data.column(&settings.flux_name())?;
    let default = match &settings.default_gft {
        Some(name) if data.contains(name) => Some(data.column(name)?),
        Some(name) => Some(data.column(&Scenario::Hhs.column_name(name))?),
        None => None,
    };

    let mut filled = FluxTable::new(data.index().to_vec());
    for column in data.columns() {
        if Scenario::Days.technique_of(&column.name).is_some() {
            continue;
        }
        let Some(technique) = Scenario::Hhs.technique_of(&column.name) else {
            filled.push_column(&column.name, column.values.clone())?;
            continue;
        };

        let values: Vec<f64> = column
            .values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                if !flux[i].is_nan() {
                    flux[i]
                } else if !value.is_nan() {
                    value
                } else {
                    default.map_or(f64::NAN, |d| d[i])
                }
            })
            .collect();
        let missing = values.iter().filter(|v| v.is_nan()).count();
        if missing > 0 {
            warn!("{} real gaps not filled by {}", missing, technique);
        }
        filled.push_column(&format!("{technique}_{REAL_SUFFIX}"), values)?;
    }
    Ok(filled)
}

/// Fill the real gaps, join model results, describe and plot the run
///
/// # Errors
///
/// Returns an error if a table cannot be read or written or a chart fails.
pub fn inspect_ff(site_dir: &Path, run_number: &str) -> Result<()> {
    let stage = Stage::open(site_dir, run_number)?;
    let settings = &stage.settings;
    let flux_name = settings.flux_name();

    let mut data = FluxTable::read_csv(&stage.table(Folder::Mgf, "mgf_Scenarios", ""), b',')?;
    info!(
        "Loaded results of gap-filling scenarios for: {}",
        scenario_columns(&data, Scenario::Hhs).join(", ")
    );

    match &settings.file_models {
        Some(file_models) => {
            let models = FluxTable::read_csv(&site_dir.join(file_models), b',')?;
            if models.index() == data.index() {
                info!("Loaded model results with columns: {}", models.column_names().join(", "));
                models.write_csv(&stage.table(Folder::Mgf, "mgf_Models", ""))?;
                data.join(&models)?;
            } else {
                warn!(
                    "Timestamp indices of flux data ({} rows) and model data ({} rows) are not equal",
                    data.len(),
                    models.len()
                );
                warn!("Model data will not be loaded");
            }
        }
        None => info!("No model results to load"),
    }

    let filled = fill_real_gaps(&data, settings)?;
    filled.write_csv(&stage.table(Folder::Results, "mgf_FilledReal", ""))?;

    let mut all = data;
    all.join(&filled.select(|name| name.ends_with(REAL_SUFFIX)))?;
    all.write_csv(&stage.table(Folder::Mgf, "mgf_AllData", ""))?;
    info!("All data (fluxes, models, scenarios, filled real gaps) saved");

    describe(&all, settings)?.save(&stage.table(Folder::Results, "descr", "ini"))?;

    plot_gaps(&all, settings, &flux_name, &stage.plot("pgd", REAL_SUFFIX))?;
    for scenario in Scenario::ALL {
        let suffix = scenario.suffix();
        plot_scatter(&all, settings, scenario, false, &stage.plot("psc", suffix))?;
        plot_scatter(&all, settings, scenario, true, &stage.plot("psc", &format!("{suffix}_resid")))?;
    }
    for (scenario, kind) in [
        (Scenario::Hhs, SeriesKind::FluxesComplete),
        (Scenario::Days, SeriesKind::FluxesComplete),
        (Scenario::Hhs, SeriesKind::FluxesReal),
        (Scenario::Hhs, SeriesKind::CumsComplete),
        (Scenario::Days, SeriesKind::CumsComplete),
    ] {
        let suffix = format!("{}_{}", kind.suffix(), scenario.suffix());
        plot_series(&all, settings, scenario, kind, &stage.plot("pts", &suffix))?;
    }
    plot_daily(&all, settings, &stage.plot("pds", "daily_real"))?;
    Ok(())
}

/// Bootstrap both scenarios for full-time, day-time and night-time
///
/// # Errors
///
/// Returns an error if the data cannot be read, the light setting is missing
/// or a result cannot be written.
pub fn bootstrap_ff(site_dir: &Path, run_number: &str, boot: &BootstrapSettings) -> Result<()> {
    let stage = Stage::open(site_dir, run_number)?;
    let settings = &stage.settings;
    let flux_name = settings.flux_name();
    let data = stage.load_all_data()?;

    for time_of_day in TimeOfDay::ALL {
        info!(">>> Bootstrapping {}", time_of_day.label());
        let subset = data.mask_time_of_day(settings, time_of_day)?;
        for scenario in Scenario::ALL {
            let result = bootstrap_artificial(&subset, &flux_name, scenario, boot)?;
            result.save_csv(&stage.bootstrap_file(time_of_day, scenario))?;
        }
    }
    Ok(())
}

/// Plot bootstrap statistics, derive errors and compute the sums
///
/// Returns the sums of all techniques.
///
/// # Errors
///
/// Returns an error if a bootstrap table is missing or an output fails.
pub fn analyse_bs(site_dir: &Path, run_number: &str) -> Result<Vec<FluxSum>> {
    let stage = Stage::open(site_dir, run_number)?;
    let settings = &stage.settings;
    let gas = &settings.flux_gas;

    let load = |time_of_day, scenario| BootstrapResult::load_csv(&stage.bootstrap_file(time_of_day, scenario));
    let hhs = [
        load(TimeOfDay::Full, Scenario::Hhs)?,
        load(TimeOfDay::Day, Scenario::Hhs)?,
        load(TimeOfDay::Night, Scenario::Hhs)?,
    ];
    let days = [
        load(TimeOfDay::Full, Scenario::Days)?,
        load(TimeOfDay::Day, Scenario::Days)?,
        load(TimeOfDay::Night, Scenario::Days)?,
    ];

    let panel = |result, scenario, time_of_day| BootPanel {
        result,
        scenario,
        time_of_day,
    };
    plot_bootstats(
        &[
            panel(&hhs[0], Scenario::Hhs, TimeOfDay::Full),
            panel(&days[0], Scenario::Days, TimeOfDay::Full),
        ],
        gas,
        &settings.flux_unit,
        &stage.plot("pba", "double_both_ft"),
    )?;
    for (results, scenario) in [(&hhs, Scenario::Hhs), (&days, Scenario::Days)] {
        let panels: Vec<BootPanel<'_>> = TimeOfDay::ALL
            .into_iter()
            .zip(results.iter())
            .map(|(time_of_day, result)| panel(result, scenario, time_of_day))
            .collect();
        plot_bootstats(
            &panels,
            gas,
            &settings.flux_unit,
            &stage.plot("pba", &format!("triple_{}_fdn", scenario.suffix())),
        )?;
    }

    let mut errors: Vec<Vec<ErrorEstimate>> = Vec::with_capacity(TimeOfDay::ALL.len());
    for (i, time_of_day) in TimeOfDay::ALL.into_iter().enumerate() {
        let estimates = calc_errors(&hhs[i], &days[i]);
        save_errors(&estimates, &stage.errors_file(time_of_day))?;
        errors.push(estimates);
    }
    let rows = make_error_table(&errors[0], &errors[1], &errors[2]);
    save_error_table(&rows, &settings.flux_name(), &stage.table(Folder::Results, "errors", ""))?;

    let data = stage.load_all_data()?;
    let sums = calc_sums(&data, settings, &errors[0])?;
    write_sums(&stage, &sums, "all")?;
    plot_sums(&sums, settings, &stage.plot("pse", REAL_SUFFIX), false)?;
    Ok(sums)
}

/// Save sums as CSV and as text table and log the table
fn write_sums(stage: &Stage, sums: &[FluxSum], suffix: &str) -> Result<()> {
    let label = stage.settings.sums_label();
    save_sums(sums, &label, &stage.table(Folder::Results, "sums", suffix))?;
    let table = sums_table(sums, &label);
    info!("Aggregated fluxes ({}):\n{}", suffix, table);
    let text_file = stage
        .layout
        .folder(Folder::Results)
        .join(result_name("sums", &stage.settings.flux_gas, stage.layout.run_number(), suffix, "txt"));
    fs::write(&text_file, format!("{table}\n"))?;
    info!("Table saved to {}", text_file.display());
    Ok(())
}

/// Pattern selecting the flux column and the ensemble, `None` for all techniques
fn ensemble_pattern(good: Option<&str>, gas: &str, flux_name: &str) -> Result<Option<Regex>> {
    let good = match good.map(str::trim).filter(|g| !g.is_empty()) {
        Some(good) => good,
        None if gas == "NH3" => DEFAULT_NH3_ENSEMBLE,
        None => return Ok(None),
    };
    let pattern = format!("{}|{}", regex::escape(flux_name), good);
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| MgfError::InvalidSetting {
            key: "ensemble".to_string(),
            value: format!("{good} ({e})"),
        })
}

/// Sums and spread of an ensemble of good techniques
///
/// `good` is a regular expression such as `MDA_hh5|MDC_d7|LUT_V1.*_d7`; a
/// technique belongs to the ensemble if its name contains a match.
///
/// # Errors
///
/// Returns an error if no technique matches or an input or output fails.
pub fn pick_ge(site_dir: &Path, run_number: &str, good: Option<&str>) -> Result<EnsembleStats> {
    let stage = Stage::open(site_dir, run_number)?;
    let settings = &stage.settings;
    let flux_name = settings.flux_name();

    let data = stage.load_all_data()?;
    let data_ens = match ensemble_pattern(good, &settings.flux_gas, &flux_name)? {
        Some(pattern) => {
            info!("Ensemble of columns matching: {}", pattern);
            data.select(|name| pattern.is_match(name))
        }
        None => {
            info!("Ensemble of all techniques");
            data.clone()
        }
    };
    let errors_ft = load_errors(&stage.errors_file(TimeOfDay::Full))?;

    let sums = calc_sums(&data, settings, &errors_ft)?;
    let sums_ens = calc_sums(&data_ens, settings, &errors_ft)?;
    if sums_ens.is_empty() {
        return Err(MgfError::Generic(
            "No technique of the run matches the ensemble".to_string(),
        ));
    }
    write_sums(&stage, &sums_ens, "ens")?;

    let label = settings.sums_label();
    let stats = calc_ensemble(&sums_ens);
    stats.save(&label, &stage.table(Folder::Results, "res", "ens"))?;

    plot_sums(&sums_ens, settings, &stage.plot("pse", "real_ens"), true)?;
    plot_sums_ens(&sums, &sums_ens, &stats, settings, &stage.plot("pse", "double_real_ens"))?;
    plot_daily(&data_ens, settings, &stage.plot("pds", "daily_real_ens"))?;
    info!("Ensemble results of the aggregated fluxes:\n{}", stats.table(&label));
    Ok(stats)
}

/// Run, inspect, bootstrap and analyse in sequence
///
/// # Errors
///
/// Returns the error of the first failing stage.
pub fn run_all(site_dir: &Path, ini_name: &str, boot: &BootstrapSettings) -> Result<String> {
    let run_number = run_gft(site_dir, ini_name)?;
    inspect_ff(site_dir, &run_number)?;
    bootstrap_ff(site_dir, &run_number, boot)?;
    analyse_bs(site_dir, &run_number)?;
    Ok(run_number)
}

/// Gap distribution of the raw data, written next to the settings file
///
/// # Errors
///
/// Returns an error if the inputs cannot be read or the chart fails.
pub fn gap_report(site_dir: &Path, ini_name: &str) -> Result<GapDistribution> {
    let settings = Settings::load(&site_dir.join(ini_name))?;
    let mut data = FluxTable::read_csv(&site_dir.join(&settings.file_data), settings.file_separator)?;
    let flux_name = settings.flux_name();
    if !data.contains(&flux_name) {
        data.generate_flux_column(&settings)?;
    }

    let distribution = GapDistribution::from_values(data.column(&flux_name)?);
    info!(
        "{}: {} fluxes, {} gaps, {} in total",
        flux_name, distribution.measured, distribution.gaps, distribution.total
    );
    let path = site_dir.join(format!("pgd_{}_raw.svg", settings.flux_gas));
    plot_gaps(&data, &settings, &flux_name, &path)?;
    Ok(distribution)
}
