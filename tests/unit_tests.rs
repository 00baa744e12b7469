//! Unit tests for the gap-filling modules
//!
//! These tests cover settings, flux tables, gap statistics, windows,
//! techniques and the statistics behind bootstrapping and sums.

use approx::assert_abs_diff_eq;
use chrono::{NaiveDate, NaiveDateTime};
use multi_gap_fill::{
    config::{BootstrapSettings, Driver, Settings, HALF_HOURS_PER_DAY},
    errors::MgfError,
    gaps::{count_gaps, gap_length_at, gap_lengths, split_short_long, GapDistribution},
    parallel::{ParallelConfig, ParallelInfo},
    pipeline::{fill_real_gaps, Folder, RunLayout},
    plots::{
        family_color, plot_file_name, plot_scatter, plot_series, scatter::scatter_columns,
        technique_family, used_families, SeriesKind,
    },
    scenario::{Scenario, TimeOfDay},
    series::{parse_timestamp, FluxTable},
    statistics::{
        bootstrap::{bootstrap_artificial, draw_sample, BootstrapResult},
        calc_ensemble, calc_errors, calc_sums,
        describe::describe,
        operations::{percentile, population_std, r_squared, round_to, sdev_laplace},
        uncertainty::{format_errors, make_error_table},
        FluxSum, Metric,
    },
    techniques::{
        catalogue, define_lookup_tables,
        interpolation::{centred_mean_at, interpolate_limited},
        Condition, GapFillingTechnique, Interpolation, LookupTable,
    },
    window::{window_indices, WindowShape},
};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn base_entries() -> Vec<(String, String)> {
    entries(&[
        ("FluxGas", "NH3"),
        ("FluxUnit", "ng m-2 s-1"),
        ("FileData", "data.csv"),
        ("FileModels", "none"),
        ("FluxColumn", "NH3_flux"),
        ("FluxFlag", "none"),
        ("LUTVar_1", "Ta"),
        ("LUTRange_1", "2.5"),
        ("LUTVar_2", "Rg"),
        ("LUTRange_2", "50"),
        ("LUTVar_3", "none"),
        ("LUTRange_3", "none"),
        ("LUT2Var_1", "Rg"),
        ("LUT2Range_1", "50"),
        ("LUT2Var_2", "none"),
        ("LUT2Range_2", "none"),
        ("LightVar", "Rg"),
        ("LightThres", "10"),
        ("DefGFT", "MDC_d7"),
        ("ConvFactor", "0.0018"),
        ("ConvSums", "kg N ha-1 period-1"),
    ])
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 30, 0))
        .expect("valid start")
}

/// Table with a flux column that only depends on the half-hour slot
fn periodic_table(days: usize) -> FluxTable {
    let len = days * HALF_HOURS_PER_DAY;
    let mut table = FluxTable::half_hourly(start(), len);
    let flux: Vec<f64> = (0..len)
        .map(|i| 10.0 + (i % HALF_HOURS_PER_DAY) as f64 * 0.5)
        .collect();
    table.push_column("FluX_NH3", flux).expect("new column");
    table
}

#[test]
fn test_error_types() {
    let missing = MgfError::MissingSetting {
        key: "FluxGas".to_string(),
    };
    assert!(format!("{}", missing).contains("Setting 'FluxGas' not found"));

    let column = MgfError::ColumnNotFound {
        column: "Ta".to_string(),
    };
    assert!(format!("{}", column).contains("Column 'Ta' not found"));

    let failed = MgfError::ValidationFailed {
        failed: vec!["a".to_string(), "b".to_string()],
    };
    assert!(format!("{}", failed).ends_with("a, b"));

    let generic = MgfError::Generic("Test error".to_string());
    assert_eq!(format!("{}", generic), "Test error");
}

#[test]
fn test_parallel_config() {
    let default_config = ParallelConfig::default();
    assert!(default_config.num_threads.is_none());

    let config_4 = ParallelConfig::with_threads(4);
    assert_eq!(config_4.num_threads, Some(4));

    let all_cores = ParallelConfig::all_cores();
    assert!(all_cores.num_threads.unwrap() > 0);

    assert!(ParallelConfig::with_threads(0).setup_global_pool().is_err());

    let info = ParallelInfo::collect();
    assert!(info.current_threads > 0);
    assert!(info.available_cores > 0);
    info.log();
}

#[test]
fn test_settings_from_entries() {
    let settings = Settings::from_entries(base_entries()).unwrap();
    assert_eq!(settings.flux_name(), "FluX_NH3");
    assert_eq!(settings.file_separator, b',');
    assert!(settings.file_models.is_none());
    assert!(settings.flux_flag.is_none());
    assert_eq!(settings.lut_drivers.len(), 2);
    assert_eq!(settings.lut_drivers[1].variable, "Rg");
    assert_abs_diff_eq!(settings.lut_drivers[0].range, 2.5);
    // a single MDS driver does not define the MDS table
    assert!(settings.mds_drivers.is_empty());
    assert_eq!(settings.light.as_ref().unwrap().variable, "Rg");
    assert_eq!(settings.sums_label(), "NH3 (kg N ha-1 period-1)");

    let mut without_gas = base_entries();
    without_gas.retain(|(k, _)| k != "FluxGas");
    assert!(matches!(
        Settings::from_entries(without_gas),
        Err(MgfError::MissingSetting { key }) if key == "FluxGas"
    ));

    let mut bad_factor = base_entries();
    bad_factor.push(("ConvFactor".to_string(), "x".to_string()));
    bad_factor.retain(|(k, v)| !(k == "ConvFactor" && v == "0.0018"));
    assert!(matches!(
        Settings::from_entries(bad_factor),
        Err(MgfError::InvalidSetting { .. })
    ));

    let mut tab = base_entries();
    tab.push(("FileSeparator".to_string(), "tab".to_string()));
    assert_eq!(Settings::from_entries(tab).unwrap().file_separator, b'\t');
}

#[test]
fn test_settings_mds_drivers() {
    let with_mds = |third: (&str, &str)| {
        let mut pairs = base_entries();
        pairs.retain(|(k, _)| !k.starts_with("LUT2"));
        pairs.extend(entries(&[
            ("LUT2Var_1", "Rg"),
            ("LUT2Range_1", "50"),
            ("LUT2Var_2", "Ta"),
            ("LUT2Range_2", "2.5"),
            ("LUT2Var_3", third.0),
            ("LUT2Range_3", third.1),
        ]));
        Settings::from_entries(pairs).unwrap().mds_drivers
    };

    assert_eq!(with_mds(("VPD", "5")).len(), 3);
    // two drivers only when the third variable is unset
    let two = with_mds(("none", "none"));
    assert_eq!(two.len(), 2);
    assert_eq!(two[1].variable, "Ta");
    // a third variable without a usable range defines no MDS table
    assert!(with_mds(("VPD", "none")).is_empty());
    assert!(with_mds(("VPD", "x")).is_empty());

    // an unparsable LUT range ends the chain instead of failing
    let mut bad_range = base_entries();
    bad_range.retain(|(k, _)| k != "LUTRange_2");
    bad_range.push(("LUTRange_2".to_string(), "abc".to_string()));
    let settings = Settings::from_entries(bad_range).unwrap();
    assert_eq!(settings.lut_drivers.len(), 1);
    assert_eq!(settings.lut_drivers[0].variable, "Ta");
}

#[test]
fn test_settings_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.ini");

    let mut settings = Settings::from_entries(base_entries()).unwrap();
    settings.set("RunNumber", "201601010000");
    settings.set("FluxUnit", "ug m-2 s-1");
    settings.save(&path).unwrap();

    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded.get("RunNumber"), Some("201601010000"));
    assert_eq!(loaded.get("FluxUnit"), Some("ug m-2 s-1"));
    assert_eq!(loaded.get("FileModels"), None);
    assert_eq!(loaded.entries().len(), settings.entries().len());
}

#[test]
fn test_flux_table_columns() {
    let mut table = FluxTable::half_hourly(start(), 4);
    table.push_column("a", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    table.insert_front("b", vec![0.0; 4]).unwrap();
    assert_eq!(table.column_names(), vec!["b", "a"]);

    assert!(matches!(
        table.push_column("a", vec![0.0; 4]),
        Err(MgfError::DuplicateColumn { .. })
    ));
    assert!(table.push_column("c", vec![0.0; 3]).is_err());
    assert!(matches!(
        table.column("missing"),
        Err(MgfError::ColumnNotFound { .. })
    ));

    let selected = table.select(|name| name == "a");
    assert_eq!(selected.column_names(), vec!["a"]);

    let mut other = FluxTable::half_hourly(start(), 4);
    other.push_column("c", vec![5.0; 4]).unwrap();
    table.join(&other).unwrap();
    assert_eq!(table.column("c").unwrap()[3], 5.0);

    let shorter = FluxTable::half_hourly(start(), 3);
    assert!(matches!(
        table.join(&shorter),
        Err(MgfError::IndexMismatch { .. })
    ));
}

#[test]
fn test_flux_table_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(
        &path,
        "DateTime;NH3_flux;Ta\n01.01.2016 00:30;1.5;NA\n01.01.2016 01:00;;3\n01.01.2016 01:30;-9999;x\n",
    )
    .unwrap();

    let table = FluxTable::read_csv(&path, b';').unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.index()[1], parse_timestamp("2016-01-01 01:00:00").unwrap());
    let flux = table.column("NH3_flux").unwrap();
    assert_eq!(flux[0], 1.5);
    assert!(flux[1].is_nan());
    assert_eq!(flux[2], -9999.0);
    assert!(table.column("Ta").unwrap()[2].is_nan());

    let out = dir.path().join("out.csv");
    table.write_csv(&out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("DateTime,NH3_flux,Ta\n2016-01-01 00:30:00,1.5,NA\n"));

    assert!(matches!(
        parse_timestamp("yesterday"),
        Err(MgfError::TimestampError { .. })
    ));
}

#[test]
fn test_prepare_flux_column() {
    let settings = Settings::from_entries(base_entries()).unwrap();
    let len = 2 * HALF_HOURS_PER_DAY;
    let mut table = FluxTable::half_hourly(start(), len);
    let raw: Vec<f64> = (0..len).map(|i| if i % 10 == 0 { -9999.0 } else { 1.0 }).collect();
    table.push_column("NH3_flux", raw).unwrap();

    let checks = table.prepare_flux_column(&settings).unwrap();
    assert!(checks.all_passed(), "{:?}", checks.failed());
    assert_eq!(checks.longest_gap, 1);
    assert_eq!(table.column_names()[0], "FluX_NH3");
    assert!(table.column("FluX_NH3").unwrap()[0].is_nan());

    // flux column exists already and the series starts at midnight
    let late = start() - chrono::Duration::minutes(30);
    let mut shifted = FluxTable::half_hourly(late, len);
    shifted.push_column("NH3_flux", vec![1.0; len]).unwrap();
    shifted.push_column("FluX_NH3", vec![1.0; len]).unwrap();
    let checks = shifted.prepare_flux_column(&settings).unwrap();
    assert!(!checks.first_half_hour);
    assert!(!checks.flux_name_unique);
    assert_eq!(checks.failed().len(), 3);
}

#[test]
fn test_flagged_flux_and_time_of_day() {
    let mut pairs = base_entries();
    pairs.retain(|(k, _)| k != "FluxFlag");
    pairs.push(("FluxFlag".to_string(), "qc".to_string()));
    pairs.push(("FlagMax".to_string(), "1".to_string()));
    let settings = Settings::from_entries(pairs).unwrap();

    let mut table = FluxTable::half_hourly(start(), 4);
    table.push_column("NH3_flux", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    table.push_column("qc", vec![0.0, 1.0, 2.0, 0.0]).unwrap();
    table.push_column("Rg", vec![0.0, 100.0, 200.0, 5.0]).unwrap();
    table.generate_flux_column(&settings).unwrap();

    let flux = table.column("FluX_NH3").unwrap();
    assert_eq!(flux[1], 2.0);
    assert!(flux[2].is_nan());

    let day = table.mask_time_of_day(&settings, TimeOfDay::Day).unwrap();
    let day_flux = day.column("FluX_NH3").unwrap();
    assert!(day_flux[0].is_nan());
    assert_eq!(day_flux[1], 2.0);
    assert!(day_flux[3].is_nan());

    let night = table.mask_time_of_day(&settings, TimeOfDay::Night).unwrap();
    let night_flux = night.column("FluX_NH3").unwrap();
    assert_eq!(night_flux[0], 1.0);
    assert!(night_flux[1].is_nan());
    assert_eq!(night_flux[3], 4.0);

    let full = table.mask_time_of_day(&settings, TimeOfDay::Full).unwrap();
    assert_eq!(full.column("FluX_NH3").unwrap()[1], 2.0);
}

#[test]
fn test_gap_statistics() {
    let nan = f64::NAN;
    let values = [1.0, nan, nan, 2.0, nan, 3.0, nan, nan, nan];
    assert_eq!(count_gaps(&values), vec![0, 1, 2, 0, 1, 0, 1, 2, 3]);
    assert_eq!(gap_lengths(&values), vec![0, 2, 2, 0, 1, 0, 3, 3, 3]);
    assert_eq!(gap_length_at(&values, 7), 3);
    assert_eq!(gap_length_at(&values, 0), 0);

    let mut long = vec![1.0; 30];
    long[2..15].fill(nan);
    long[20] = nan;
    assert_eq!(split_short_long(&long), (1, 13));

    let distribution = GapDistribution::from_values(&values);
    assert_eq!(distribution.measured, 3);
    assert_eq!(distribution.gaps, 6);
    assert_eq!(distribution.total, 9);
    let lengths: Vec<usize> = distribution.classes.iter().map(|c| c.length).collect();
    assert_eq!(lengths, vec![1, 2, 3]);
    let last = distribution.classes.last().unwrap();
    assert_abs_diff_eq!(last.freq, 1.0);
    assert_eq!(last.sums, 6);
    assert_abs_diff_eq!(last.perc_gaps_sums, 100.0);
    assert_abs_diff_eq!(last.perc_data_sums, 6.0 / 9.0 * 100.0, epsilon = 1e-12);
}

#[test]
fn test_window_indices() {
    let len = 5 * HALF_HOURS_PER_DAY;
    let pos = 2 * HALF_HOURS_PER_DAY + 10;

    let full = window_indices(pos, len, 1, WindowShape::FullDays, None);
    assert_eq!(full.len(), 3 * HALF_HOURS_PER_DAY);
    assert_eq!(full[0], HALF_HOURS_PER_DAY);

    let without_gap = window_indices(pos, len, 1, WindowShape::FullDays, Some(Scenario::Hhs));
    assert_eq!(without_gap.len(), 3 * HALF_HOURS_PER_DAY - 1);
    assert!(!without_gap.contains(&pos));

    let without_day = window_indices(pos, len, 1, WindowShape::FullDays, Some(Scenario::Days));
    assert_eq!(without_day.len(), 2 * HALF_HOURS_PER_DAY);

    let block = window_indices(pos, len, 0, WindowShape::ThreeHour, None);
    assert_eq!(block, (2 * HALF_HOURS_PER_DAY + 6..2 * HALF_HOURS_PER_DAY + 12).collect::<Vec<_>>());

    let same_slot = window_indices(pos, len, 3, WindowShape::HalfHours(0), Some(Scenario::Hhs));
    assert_eq!(same_slot, vec![10, 58, 154, 202]);

    // clipped at the start of the series
    let edge = window_indices(0, len, 1, WindowShape::HalfHours(2), None);
    assert_eq!(edge, vec![0, 1, 2, 46, 47, 48, 49, 50]);
}

#[test]
fn test_interpolation_helpers() {
    let nan = f64::NAN;
    let filled = interpolate_limited(&[nan, 1.0, nan, nan, 4.0, nan], 12);
    for (value, expected) in filled.iter().zip([1.0, 1.0, 2.0, 3.0, 4.0, 4.0]) {
        assert_abs_diff_eq!(*value, expected, epsilon = 1e-12);
    }

    let mut long = vec![nan; 7];
    long[0] = 0.0;
    long[6] = 6.0;
    let limited = interpolate_limited(&long, 2);
    assert_abs_diff_eq!(limited[1], 1.0);
    assert_abs_diff_eq!(limited[2], 2.0);
    assert!(limited[3].is_nan());
    assert_abs_diff_eq!(limited[5], 5.0);

    let values = [1.0, 2.0, nan, 4.0, 5.0];
    assert_abs_diff_eq!(centred_mean_at(&values, 2, 3, 2), 3.0);
    assert_abs_diff_eq!(centred_mean_at(&values, 2, 5, 2), 3.0);
    assert!(centred_mean_at(&[nan, nan, 1.0], 0, 2, 2).is_nan());
}

#[test]
fn test_linear_interpolation_technique() {
    let len = 3 * HALF_HOURS_PER_DAY;
    let mut table = FluxTable::half_hourly(start(), len);
    let flux: Vec<f64> = (0..len).map(|i| i as f64).collect();
    table.push_column("FluX_NH3", flux).unwrap();

    let filled = Interpolation::Linear.fill(&table, "FluX_NH3", Scenario::Hhs).unwrap();
    assert_eq!(Interpolation::Linear.name(), "IP_lin");
    for pos in 1..len - 1 {
        assert_abs_diff_eq!(filled[pos], pos as f64, epsilon = 1e-9);
    }

    let moving = Interpolation::Moving.fill(&table, "FluX_NH3", Scenario::Hhs).unwrap();
    // symmetric window of width 5 without the gap itself
    assert_abs_diff_eq!(moving[50], 50.0, epsilon = 1e-9);

    // whole days removed: daily means of the neighbouring days
    let days = Interpolation::Linear.fill(&table, "FluX_NH3", Scenario::Days).unwrap();
    assert!(days.iter().all(|v| v.is_finite()));
    assert_abs_diff_eq!(days[HALF_HOURS_PER_DAY + 5], 71.5, epsilon = 1e-9);
}

#[test]
fn test_lookup_tables() {
    let table = periodic_table(10);
    let flux = table.column("FluX_NH3").unwrap().to_vec();

    let mdc = LookupTable::new("MDC_d3", 3, 3, WindowShape::HalfHours(0), Condition::Always);
    for scenario in Scenario::ALL {
        let filled = mdc.fill(&table, "FluX_NH3", scenario).unwrap();
        for (value, expected) in filled.iter().zip(&flux) {
            assert_abs_diff_eq!(*value, *expected, epsilon = 1e-9);
        }
    }

    let settings = Settings::from_entries(base_entries()).unwrap();
    let names: Vec<String> = define_lookup_tables(&settings)
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "WDM",
            "FDA_hh6",
            "MDA_hh5",
            "MDC_d3",
            "MDC_d7",
            "LUT_V1_d3",
            "LUT_V1_d7",
            "LUT_V1V2_d3",
            "LUT_V1V2_d7"
        ]
    );
    let all = catalogue(&settings);
    assert_eq!(all.len(), 11);
    assert_eq!(all[0].name(), "IP_lin");

    let missing_driver = LookupTable::new(
        "LUT_V1_d3",
        3,
        3,
        WindowShape::FullDays,
        Condition::Similar(settings.lut_drivers.clone()),
    );
    assert!(matches!(
        missing_driver.fill(&table, "FluX_NH3", Scenario::Hhs),
        Err(MgfError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_lookup_counts_entries_with_gaps() {
    let mut table = periodic_table(3);
    let mut flux = table.column("FluX_NH3").unwrap().to_vec();
    flux[2 * HALF_HOURS_PER_DAY + 5] = f64::NAN;
    table.set_column("FluX_NH3", flux).unwrap();

    // two entries in the window, one of them measured
    let mdc = LookupTable::new("MDC_d1", 1, 1, WindowShape::HalfHours(0), Condition::Always);
    let filled = mdc.fill(&table, "FluX_NH3", Scenario::Hhs).unwrap();
    assert_abs_diff_eq!(filled[HALF_HOURS_PER_DAY + 5], 12.5, epsilon = 1e-9);

    // a single entry meeting the condition is not enough
    let ta: Vec<f64> = (0..table.len())
        .map(|i| if i / HALF_HOURS_PER_DAY == 2 { 20.0 } else { 5.0 })
        .collect();
    table.push_column("Ta", ta).unwrap();
    let lut = LookupTable::new(
        "LUT_V1_d1",
        1,
        1,
        WindowShape::HalfHours(0),
        Condition::Similar(vec![Driver {
            variable: "Ta".to_string(),
            range: 2.5,
        }]),
    );
    let filled = lut.fill(&table, "FluX_NH3", Scenario::Hhs).unwrap();
    assert!(filled[5].is_nan());
    assert!(filled[HALF_HOURS_PER_DAY + 5].is_nan());
}

#[test]
fn test_lookup_gives_up_on_too_few_values() {
    let mut table = periodic_table(4);
    let mut flux = table.column("FluX_NH3").unwrap().to_vec();
    flux.iter_mut().skip(1).for_each(|v| *v = f64::NAN);
    table.set_column("FluX_NH3", flux).unwrap();

    let fda = LookupTable::new("FDA_hh6", 0, 1, WindowShape::ThreeHour, Condition::Always);
    let filled = fda.fill(&table, "FluX_NH3", Scenario::Hhs).unwrap();
    // the only measured value fills its own block on the first pass
    assert!(filled[1..6].iter().all(|v| (*v - 10.0).abs() < 1e-9));
    // grown windows reach the same block of the next two days
    assert_abs_diff_eq!(filled[2 * HALF_HOURS_PER_DAY + 3], 10.0, epsilon = 1e-9);
    // its own position, other blocks and days beyond the window stay empty
    assert!(filled[0].is_nan());
    assert!(filled[6].is_nan());
    assert!(filled[3 * HALF_HOURS_PER_DAY + 3].is_nan());
}

#[test]
fn test_operations() {
    let values = [1.0, 2.0, 3.0, 4.0, f64::NAN];
    assert_abs_diff_eq!(percentile(&values, 10.0), 1.3, epsilon = 1e-12);
    assert_abs_diff_eq!(percentile(&values, 50.0), 2.5, epsilon = 1e-12);
    assert_abs_diff_eq!(population_std(&values), 1.25f64.sqrt(), epsilon = 1e-12);
    assert!(percentile(&[f64::NAN], 50.0).is_nan());

    assert_eq!(round_to(1.23456, 2), 1.23);
    assert_eq!(round_to(26.001999999, 3), 26.002);
    assert!(round_to(f64::NAN, 2).is_nan());

    let observed = [1.0, 2.0, 3.0, 4.0];
    let predicted = [2.0, 4.0, 6.0, 8.0];
    assert_abs_diff_eq!(r_squared(&predicted, &observed), 1.0, epsilon = 1e-12);
    assert!(r_squared(&[1.0; 4], &observed).is_nan());
    assert_abs_diff_eq!(
        sdev_laplace(&[2.0, 1.0], &[1.0, 2.0]),
        std::f64::consts::SQRT_2,
        epsilon = 1e-12
    );
    assert_eq!(Metric::from_name("SDev"), Some(Metric::SDev));
    assert_eq!(Metric::R2.index(), 2);
}

#[test]
fn test_draw_sample() {
    let eligible: Vec<bool> = (0..96).map(|i| i % 2 == 0).collect();
    let mut rng = StdRng::seed_from_u64(99);

    let hhs = draw_sample(&mut rng, &vec![true; 96], Scenario::Hhs, 50.0);
    assert_eq!(hhs.len(), 48);
    assert!(hhs.iter().all(|&i| i < 96));

    let filtered = draw_sample(&mut rng, &eligible, Scenario::Hhs, 50.0);
    assert!(filtered.iter().all(|&i| i % 2 == 0));

    let days = draw_sample(&mut rng, &vec![true; 96], Scenario::Days, 50.0);
    assert_eq!(days.len(), HALF_HOURS_PER_DAY);
    let day = days[0] / HALF_HOURS_PER_DAY;
    assert!(days.iter().all(|&i| i / HALF_HOURS_PER_DAY == day));

    let mut first = StdRng::seed_from_u64(7);
    let mut second = StdRng::seed_from_u64(7);
    assert_eq!(
        draw_sample(&mut first, &eligible, Scenario::Hhs, 50.0),
        draw_sample(&mut second, &eligible, Scenario::Hhs, 50.0)
    );
}

#[test]
fn test_bootstrap_artificial() {
    let mut table = periodic_table(4);
    let flux = table.column("FluX_NH3").unwrap().to_vec();
    table.push_column("perfect_hhs", flux.clone()).unwrap();
    table
        .push_column("offset_hhs", flux.iter().map(|v| v + 1.0).collect())
        .unwrap();
    table.push_column("perfect_days", flux.clone()).unwrap();

    let settings = BootstrapSettings {
        repetitions: 5,
        percent: 50.0,
        seed: 1,
    };
    let result = bootstrap_artificial(&table, "FluX_NH3", Scenario::Hhs, &settings).unwrap();
    assert_eq!(result.techniques, vec!["perfect_hhs", "offset_hhs"]);
    assert_eq!(result.values.shape(), &[3, 5, 2]);
    for rep in 0..5 {
        assert_abs_diff_eq!(result.values[[Metric::Bias.index(), rep, 0]], 0.0);
        assert_abs_diff_eq!(result.values[[Metric::Bias.index(), rep, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.values[[Metric::R2.index(), rep, 1]], 1.0, epsilon = 1e-12);
    }

    let again = bootstrap_artificial(&table, "FluX_NH3", Scenario::Hhs, &settings).unwrap();
    assert_eq!(result, again);

    let dir = tempdir().unwrap();
    let path = dir.path().join("boot.csv");
    result.save_csv(&path).unwrap();
    let loaded = BootstrapResult::load_csv(&path).unwrap();
    assert_eq!(loaded.techniques, result.techniques);
    assert_eq!(loaded.repetitions(), 5);
    assert_eq!(loaded.metric_values(Metric::Bias, 1), result.metric_values(Metric::Bias, 1));

    let empty = periodic_table(2);
    assert!(bootstrap_artificial(&empty, "FluX_NH3", Scenario::Days, &settings).is_err());
}

fn boot_result(techniques: &[&str], bias: f64, sdev: f64) -> BootstrapResult {
    let mut values = Array3::from_elem((3, 10, techniques.len()), 0.5);
    for rep in 0..10 {
        for t in 0..techniques.len() {
            values[[0, rep, t]] = bias + rep as f64 * 0.1;
            values[[1, rep, t]] = sdev;
        }
    }
    BootstrapResult {
        techniques: techniques.iter().map(|t| t.to_string()).collect(),
        values,
    }
}

#[test]
fn test_errors_and_tables() {
    let hhs = boot_result(&["MDC_d7_hhs"], -0.45, 2.0);
    let days = boot_result(&["MDC_d7_days"], 0.0, 3.0);
    let errors = calc_errors(&hhs, &days);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].technique, "MDC_d7_hhs");
    assert_abs_diff_eq!(errors[0].bias_10, -0.36, epsilon = 1e-9);
    assert_abs_diff_eq!(errors[0].bias_90, 0.36, epsilon = 1e-9);
    assert_abs_diff_eq!(errors[0].sdev, 2.0);
    assert_abs_diff_eq!(errors[0].sdev_sd, 0.0);
    assert_abs_diff_eq!(errors[1].bias_bound(), 0.81, epsilon = 1e-9);

    let formatted = format_errors(&errors, TimeOfDay::Full);
    assert_eq!(formatted[0].bias, "(-0.3600, 0.3600)");
    assert_eq!(formatted[0].sdev, "2.0000 ±0.0000");

    let rows = make_error_table(&errors, &errors, &errors);
    assert_eq!(rows.len(), 6);
    let bases: Vec<&str> = rows.iter().take(3).map(|r| r.time_base.as_str()).collect();
    assert_eq!(bases, vec!["ft", "dt", "nt"]);
    assert!(rows.iter().take(3).all(|r| r.technique == "MDC_d7_hhs"));
}

#[test]
fn test_sums_and_ensemble() {
    let settings = Settings::from_entries(entries(&[
        ("FluxGas", "NH3"),
        ("FileData", "data.csv"),
        ("FluxColumn", "NH3_flux"),
        ("ConvFactor", "1"),
        ("ConvSums", "kg"),
    ]))
    .unwrap();

    let nan = f64::NAN;
    let len = 20;
    let mut flux = vec![1.0; len];
    flux[3] = nan;
    flux[10..15].fill(nan);
    let mut table = FluxTable::half_hourly(start(), len);
    table.push_column("FluX_NH3", flux.clone()).unwrap();
    let mut hhs = vec![2.0; len];
    hhs[12] = nan;
    table.push_column("T_hhs", hhs).unwrap();
    table.push_column("T_days", vec![2.0; len]).unwrap();
    table.push_column("Only_hhs", vec![2.0; len]).unwrap();
    let real: Vec<f64> = flux.iter().map(|v| if v.is_nan() { 2.0 } else { *v }).collect();
    table.push_column("T_real", real).unwrap();

    let errors = calc_errors(
        &boot_result(&["T_hhs"], 0.1, 0.5),
        &boot_result(&["T_days"], -0.2, 1.0),
    );
    let sums = calc_sums(&table, &settings, &errors).unwrap();
    assert_eq!(sums.len(), 1);
    let sum = &sums[0];
    assert_eq!(sum.technique, "T");
    assert_abs_diff_eq!(sum.sum_obs, 14.0);
    assert_abs_diff_eq!(sum.sum_fill_real, 12.0);
    assert_abs_diff_eq!(sum.sum_total, 26.0);
    assert_eq!(sum.miss_fill_real, 1);
    assert_abs_diff_eq!(sum.random_all, round_to((20.0f64 * 0.25).sqrt(), 4));
    assert_abs_diff_eq!(sum.error_total, round_to(sum.random_all + sum.bias_gaps, 4), epsilon = 1e-9);
    assert!(sum.lower_ci <= sum.sum_total && sum.sum_total <= sum.upper_ci);

    let make = |total: f64, error: f64| FluxSum {
        technique: "X".to_string(),
        sum_obs: 0.0,
        sum_fill_real: total,
        sum_total: total,
        miss_fill_real: 0,
        random_all: error,
        bias_gaps: 0.0,
        error_total: error,
        lower_ci: total - error,
        upper_ci: total + error,
    };
    let stats = calc_ensemble(&[make(10.0, 2.0), make(12.0, 1.0), make(11.0, 5.0)]);
    assert_abs_diff_eq!(stats.upper_tot, 12.0);
    assert_abs_diff_eq!(stats.lower_tot, 10.0);
    assert_abs_diff_eq!(stats.delta, 2.0);
    assert_abs_diff_eq!(stats.upper_ci, 16.0);
    assert_abs_diff_eq!(stats.lower_ci, 6.0);
    assert_abs_diff_eq!(stats.upper_unc, 4.0);
    assert_abs_diff_eq!(stats.lower_unc, -4.0);
    assert_abs_diff_eq!(stats.total_ci, 10.0);
}

#[test]
fn test_describe() {
    let mut pairs = base_entries();
    pairs.retain(|(k, _)| k != "LightVar");
    let settings = Settings::from_entries(pairs).unwrap();

    let mut table = periodic_table(2);
    let mut flux = table.column("FluX_NH3").unwrap().to_vec();
    flux[5..8].fill(f64::NAN);
    table.set_column("FluX_NH3", flux).unwrap();
    table.push_column("MDC_d3_hhs", vec![1.0; 96]).unwrap();
    table.push_column("MDC_d3_days", vec![1.0; 96]).unwrap();

    let descr = describe(&table, &settings).unwrap();
    assert_eq!(descr.get("FluxGas"), Some("NH3"));
    assert_eq!(descr.get("NumDays"), Some("2"));
    assert_eq!(descr.get("NumHHs"), Some("96"));
    assert_eq!(descr.get("NumGaps"), Some("3"));
    assert_eq!(descr.get("NumGaps_short"), Some("3"));
    assert_eq!(descr.get("PercGaps"), Some("3.1"));
    assert_eq!(descr.get("NumBoot_hhs_ft"), Some("93"));
    assert_eq!(descr.get("NumBoot_days_dt"), Some("NA"));
}

#[test]
fn test_fill_real_gaps() {
    let settings = Settings::from_entries(base_entries()).unwrap();
    let nan = f64::NAN;
    let mut table = FluxTable::half_hourly(start(), 4);
    table.push_column("FluX_NH3", vec![1.0, nan, nan, 4.0]).unwrap();
    table.push_column("IP_lin_hhs", vec![9.0, 2.0, nan, 9.0]).unwrap();
    table.push_column("IP_lin_days", vec![9.0; 4]).unwrap();
    table.push_column("MDC_d7_hhs", vec![7.0; 4]).unwrap();

    let filled = fill_real_gaps(&table, &settings).unwrap();
    assert_eq!(filled.column_names(), vec!["FluX_NH3", "IP_lin_real", "MDC_d7_real"]);
    assert_eq!(filled.column("IP_lin_real").unwrap(), &[1.0, 2.0, 7.0, 4.0]);
    assert_eq!(filled.column("MDC_d7_real").unwrap(), &[1.0, 7.0, 7.0, 4.0]);
}

#[test]
fn test_names_and_layout() {
    assert_eq!(Scenario::Hhs.column_name("MDC_d7"), "MDC_d7_hhs");
    assert_eq!(Scenario::Days.technique_of("LUT_V1_d3_days"), Some("LUT_V1_d3"));
    assert_eq!(Scenario::Days.technique_of("LUT_V1_d3_hhs"), None);
    assert!(Scenario::Days.drops(0, 47));
    assert!(!Scenario::Days.drops(0, 48));

    assert_eq!(technique_family("LUT_V1V2_d7"), "LUT");
    assert_eq!(used_families(&["IP_lin", "IP_mov", "MDC_d3"]), vec!["IP", "MDC"]);
    assert_eq!(family_color("Other").0, family_color("Model").0);
    assert!(family_color("IP").0 < family_color("LUT").0);
    assert_eq!(plot_file_name("pgd", "NH3", "201601010000", "real"), "pgd_NH3_201601010000_real.svg");

    let layout = RunLayout::new(std::path::Path::new("site"), "201601010000");
    assert!(layout.settings_file().ends_with("201601010000/_mgf/ini_201601010000.ini"));
    assert!(layout
        .table_file(Folder::Results, "sums", "NH3", "all")
        .ends_with("_res/sums_NH3_201601010000_all.csv"));
    assert!(layout.log_file().ends_with("log_201601010000.log"));
}

#[test]
fn test_scatter_and_series_plots() {
    let dir = tempdir().unwrap();
    let settings = Settings::from_entries(base_entries()).unwrap();
    let mut table = periodic_table(4);
    let mut flux = table.column("FluX_NH3").unwrap().to_vec();
    flux[10] = f64::NAN;
    table.set_column("FluX_NH3", flux).unwrap();
    let shifted: Vec<f64> = (0..table.len())
        .map(|i| 10.5 + (i % HALF_HOURS_PER_DAY) as f64 * 0.5)
        .collect();
    table.push_column("MDC_d7_hhs", shifted.clone()).unwrap();
    table.push_column("IP_lin_hhs", shifted).unwrap();

    assert_eq!(scatter_columns(12), 3);
    assert_eq!(scatter_columns(13), 5);
    for residuals in [false, true] {
        let path = dir.path().join(format!("psc_{residuals}.svg"));
        plot_scatter(&table, &settings, Scenario::Hhs, residuals, &path).unwrap();
        assert!(path.exists());
    }

    assert_eq!(SeriesKind::CumsComplete.suffix(), "cums_cplt");
    for kind in [SeriesKind::FluxesComplete, SeriesKind::FluxesReal, SeriesKind::CumsComplete] {
        let path = dir.path().join(format!("pts_{}.svg", kind.suffix()));
        plot_series(&table, &settings, Scenario::Hhs, kind, &path).unwrap();
        assert!(path.exists());
    }

    // a scenario without technique columns still gives a chart
    let path = dir.path().join("pts_days.svg");
    plot_series(&table, &settings, Scenario::Days, SeriesKind::FluxesReal, &path).unwrap();
    assert!(path.exists());
}
