//! Run settings loaded from the two-column ini file
//!
//! The ini file is a CSV table with the columns `Variable` and `Settings`
//! (further columns such as descriptions are ignored). The string `none`
//! marks an unset entry.

use crate::errors::{MgfError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of half-hours per day
pub const HALF_HOURS_PER_DAY: usize = 48;

/// Gaps up to this many half-hours count as short gaps
pub const SHORT_GAP_LENGTH: usize = 12;

/// Longest real gap accepted for a run (ten days)
pub const MAX_GAP_LENGTH: usize = 10 * HALF_HOURS_PER_DAY;

/// Version written to the saved settings of every run
pub const CODE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed bootstrap settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapSettings {
    pub repetitions: usize,
    /// Percent of the data drawn per repetition
    pub percent: f64,
    pub seed: u64,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            repetitions: 999,
            percent: 50.0,
            seed: 99,
        }
    }
}

/// Driver variable of a look-up table with its tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    pub variable: String,
    pub range: f64,
}

/// Light variable and the threshold separating day from night
#[derive(Debug, Clone, PartialEq)]
pub struct LightSetting {
    pub variable: String,
    pub threshold: f64,
}

/// Quality flag column with the highest accepted flag
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSetting {
    pub column: String,
    pub max: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingRow {
    #[serde(rename = "Variable")]
    variable: String,
    #[serde(rename = "Settings")]
    settings: String,
}

/// Settings of a gap-filling run
#[derive(Debug, Clone)]
pub struct Settings {
    entries: Vec<(String, String)>,
    pub flux_gas: String,
    pub flux_unit: String,
    pub file_data: String,
    pub file_separator: u8,
    pub file_models: Option<String>,
    pub flux_column: String,
    pub flux_flag: Option<FlagSetting>,
    /// Configured chain of LUT drivers (V1, V1V2, V1V2V3)
    pub lut_drivers: Vec<Driver>,
    /// Drivers of the MDS look-up table
    pub mds_drivers: Vec<Driver>,
    pub light: Option<LightSetting>,
    /// Scenario column used when a technique leaves a real gap unfilled
    pub default_gft: Option<String>,
    pub conv_factor: f64,
    pub conv_sums: String,
}

impl Settings {
    /// Load settings from an ini file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a required key is missing
    /// or a numeric value cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            let row: SettingRow = row?;
            entries.push((row.variable, row.settings));
        }
        Self::from_entries(entries)
    }

    /// Build settings from ordered key/value pairs
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a number is invalid.
    pub fn from_entries(entries: Vec<(String, String)>) -> Result<Self> {
        let lookup = |key: &str| -> Option<String> {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| is_set(v))
        };
        let required = |key: &str| -> Result<String> {
            lookup(key).ok_or_else(|| MgfError::MissingSetting {
                key: key.to_string(),
            })
        };

        let flux_gas = required("FluxGas")?;
        let file_data = required("FileData")?;
        let flux_column = required("FluxColumn")?;
        let conv_factor = parse_number("ConvFactor", &required("ConvFactor")?)?;

        let file_separator = match lookup("FileSeparator").as_deref() {
            None => b',',
            Some("tab") | Some("\\t") => b'\t',
            Some(sep) if sep.len() == 1 => sep.as_bytes()[0],
            Some(sep) => {
                return Err(MgfError::InvalidSetting {
                    key: "FileSeparator".to_string(),
                    value: sep.to_string(),
                })
            }
        };

        let flux_flag = match lookup("FluxFlag") {
            Some(column) => Some(FlagSetting {
                column,
                max: parse_number("FlagMax", &required("FlagMax")?)?,
            }),
            None => None,
        };

        let light = match (lookup("LightVar"), lookup("LightThres")) {
            (Some(variable), Some(threshold)) => Some(LightSetting {
                variable,
                threshold: parse_number("LightThres", &threshold)?,
            }),
            _ => None,
        };

        let lut_drivers = driver_chain(&driver_slots(&lookup, "LUTVar_", "LUTRange_"));
        let mds_drivers = mds_chain(&driver_slots(&lookup, "LUT2Var_", "LUT2Range_"));

        let flux_unit = lookup("FluxUnit").unwrap_or_default();
        let file_models = lookup("FileModels");
        let default_gft = lookup("DefGFT");
        let conv_sums = lookup("ConvSums").unwrap_or_default();

        Ok(Self {
            flux_gas,
            flux_unit,
            file_data,
            file_separator,
            file_models,
            flux_column,
            flux_flag,
            lut_drivers,
            mds_drivers,
            light,
            default_gft,
            conv_factor,
            conv_sums,
            entries,
        })
    }

    /// Write the settings back in the two-column layout
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for (variable, settings) in &self.entries {
            writer.serialize(SettingRow {
                variable: variable.clone(),
                settings: settings.clone(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Set or replace a raw entry (e.g. run number or code version)
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    /// Raw value of an entry, `None` if missing or unset
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| is_set(v))
    }

    /// All raw entries in file order
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Name of the column holding the fluxes to be filled
    #[must_use]
    pub fn flux_name(&self) -> String {
        format!("FluX_{}", self.flux_gas)
    }

    /// Label for aggregated sums, e.g. `NH3 (kg N ha-1 period-1)`
    #[must_use]
    pub fn sums_label(&self) -> String {
        format!("{} ({})", self.flux_gas, self.conv_sums)
    }

    /// Light setting, required for day/night analyses
    ///
    /// # Errors
    ///
    /// Returns `MissingSetting` if `LightVar` or `LightThres` is unset.
    pub fn require_light(&self) -> Result<&LightSetting> {
        self.light.as_ref().ok_or_else(|| MgfError::MissingSetting {
            key: "LightVar".to_string(),
        })
    }
}

fn is_set(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("nan"))
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| MgfError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Driver slot `i` of the settings; a range that is not a finite number is unset
struct DriverSlot {
    variable: Option<String>,
    range: Option<f64>,
}

impl DriverSlot {
    fn driver(&self) -> Option<Driver> {
        Some(Driver {
            variable: self.variable.clone()?,
            range: self.range?,
        })
    }
}

fn driver_slots<F>(lookup: &F, var_prefix: &str, range_prefix: &str) -> [DriverSlot; 3]
where
    F: Fn(&str) -> Option<String>,
{
    [1, 2, 3].map(|i| DriverSlot {
        variable: lookup(&format!("{var_prefix}{i}")),
        range: lookup(&format!("{range_prefix}{i}"))
            .and_then(|range| range.parse::<f64>().ok())
            .filter(|range| range.is_finite()),
    })
}

/// Drivers 1..=3 up to the first incomplete slot
fn driver_chain(slots: &[DriverSlot; 3]) -> Vec<Driver> {
    slots.iter().map_while(DriverSlot::driver).collect()
}

/// Drivers of the MDS table: all three, or the first two if variable 3 is unset
fn mds_chain(slots: &[DriverSlot; 3]) -> Vec<Driver> {
    let (Some(first), Some(second)) = (slots[0].driver(), slots[1].driver()) else {
        return Vec::new();
    };
    match (slots[2].driver(), &slots[2].variable) {
        (Some(third), _) => vec![first, second, third],
        (None, None) => vec![first, second],
        (None, Some(_)) => Vec::new(),
    }
}
