//! Half-hourly flux tables
//!
//! A [`FluxTable`] holds a timestamp index (stamps at the end of each
//! half-hour) and named `f64` columns in which `NaN` marks a gap. Tables are
//! read from and written to CSV files with a `DateTime` index column.

use crate::config::{Settings, HALF_HOURS_PER_DAY, MAX_GAP_LENGTH};
use crate::errors::{MgfError, Result};
use crate::gaps::gap_lengths;
use crate::scenario::TimeOfDay;
use chrono::{Duration, NaiveDateTime, Timelike};
use std::path::Path;
use tracing::{info, warn};

/// Name of the timestamp column in all CSV files
pub const TIMESTAMP_COLUMN: &str = "DateTime";

/// Marker written for gaps
pub const MISSING_VALUE: &str = "NA";

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M",
];

const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Named column of a flux table
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Half-hourly table with a timestamp index
#[derive(Debug, Clone, Default)]
pub struct FluxTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl FluxTable {
    /// Create an empty table on the given index
    #[must_use]
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Create a table of consecutive half-hours starting at `start`
    #[must_use]
    pub fn half_hourly(start: NaiveDateTime, len: usize) -> Self {
        let index = (0..len)
            .map(|i| start + Duration::minutes(30 * i as i64))
            .collect();
        Self::new(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Number of days covered (may be fractional)
    #[must_use]
    pub fn num_days(&self) -> f64 {
        self.len() as f64 / HALF_HOURS_PER_DAY as f64
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column
    ///
    /// # Errors
    ///
    /// Returns `ColumnNotFound` if there is no column with this name.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| MgfError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Append a new column
    ///
    /// # Errors
    ///
    /// Returns an error if the name exists or the length differs from the index.
    pub fn push_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.check_new_column(name, &values)?;
        self.columns.push(Column {
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    /// Insert a new column in front of all others
    ///
    /// # Errors
    ///
    /// Returns an error if the name exists or the length differs from the index.
    pub fn insert_front(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.check_new_column(name, &values)?;
        self.columns.insert(
            0,
            Column {
                name: name.to_string(),
                values,
            },
        );
        Ok(())
    }

    /// Replace the values of a column or append it if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the length differs from the index.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len() {
            return Err(MgfError::Generic(format!(
                "Column '{}' has {} values but the table has {} rows",
                name,
                values.len(),
                self.len()
            )));
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    fn check_new_column(&self, name: &str, values: &[f64]) -> Result<()> {
        if self.contains(name) {
            return Err(MgfError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        if values.len() != self.len() {
            return Err(MgfError::Generic(format!(
                "Column '{}' has {} values but the table has {} rows",
                name,
                values.len(),
                self.len()
            )));
        }
        Ok(())
    }

    /// Copy of the table with the columns accepted by `keep`
    #[must_use]
    pub fn select<F>(&self, keep: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        Self {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| keep(&c.name))
                .cloned()
                .collect(),
        }
    }

    /// Append all columns of `other`, which must share the timestamp index
    ///
    /// # Errors
    ///
    /// Returns `IndexMismatch` if the indices differ and `DuplicateColumn` if
    /// a column exists in both tables.
    pub fn join(&mut self, other: &FluxTable) -> Result<()> {
        if self.index != other.index {
            return Err(MgfError::IndexMismatch {
                message: format!(
                    "{} rows against {} rows or differing timestamps",
                    self.len(),
                    other.len()
                ),
            });
        }
        for column in &other.columns {
            self.push_column(&column.name, column.values.clone())?;
        }
        Ok(())
    }

    /// Read a table from a CSV file with a `DateTime` column
    ///
    /// Cells that are empty, `NA`, `NaN` or not numeric are read as gaps.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the `DateTime` column is
    /// missing or a timestamp cannot be parsed.
    pub fn read_csv(path: &Path, separator: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(separator)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        let time_pos = headers
            .iter()
            .position(|h| h == TIMESTAMP_COLUMN)
            .ok_or_else(|| MgfError::ColumnNotFound {
                column: TIMESTAMP_COLUMN.to_string(),
            })?;

        let mut index = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        for record in reader.byte_records() {
            let record = record?;
            for (pos, field) in record.iter().enumerate() {
                let text = String::from_utf8_lossy(field);
                if pos == time_pos {
                    index.push(parse_timestamp(&text)?);
                } else if let Some(column) = values.get_mut(pos) {
                    column.push(parse_value(&text));
                }
            }
        }

        let mut table = Self::new(index);
        for (pos, (name, column)) in headers.into_iter().zip(values).enumerate() {
            if pos != time_pos {
                table.push_column(&name, column)?;
            }
        }
        Ok(table)
    }

    /// Write the table as comma separated file, gaps as `NA`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![TIMESTAMP_COLUMN.to_string()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;

        for (row, stamp) in self.index.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(stamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string());
            record.extend(self.columns.iter().map(|c| format_value(c.values[row])));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Run the series checks of a gap-filling run and generate the flux column
    ///
    /// The flux column is only generated if its name is not taken yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or a configured column is missing.
    pub fn prepare_flux_column(&mut self, settings: &Settings) -> Result<SeriesChecks> {
        if self.is_empty() {
            return Err(MgfError::Generic("Flux table has no rows".to_string()));
        }
        let flux_name = settings.flux_name();
        let first = self.index[0];
        let last = self.index[self.len() - 1];

        let mut checks = SeriesChecks {
            first_half_hour: first.hour() == 0 && first.minute() == 30,
            last_midnight: last.hour() == 0 && last.minute() == 0,
            continuous: self
                .index
                .windows(2)
                .all(|w| w[1] - w[0] == Duration::minutes(30)),
            flux_name_unique: !self.contains(&flux_name),
            longest_gap: 0,
        };

        info!(
            "Fill gaps for {} data rows which equals {:.2} days",
            self.len(),
            self.num_days()
        );
        if self.len() % HALF_HOURS_PER_DAY != 0 {
            warn!("Length of time stamps is not a multiple of complete days");
        }

        if checks.flux_name_unique {
            self.generate_flux_column(settings)?;
            checks.longest_gap = gap_lengths(self.column(&flux_name)?)
                .into_iter()
                .max()
                .unwrap_or(0);
        }
        Ok(checks)
    }

    /// Insert the column with the fluxes to be filled in front of the table
    ///
    /// Fluxes are taken where the quality flag is at most `FlagMax`, or where
    /// they differ from `-9999` if no flag is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the flux or flag column is missing or the flux
    /// column exists already.
    pub fn generate_flux_column(&mut self, settings: &Settings) -> Result<()> {
        let flux = self.column(&settings.flux_column)?;
        let values: Vec<f64> = match &settings.flux_flag {
            None => {
                info!("New column created with fluxes to fill for {} with no flagging", settings.flux_name());
                flux.iter()
                    .map(|&v| if v == -9999.0 { f64::NAN } else { v })
                    .collect()
            }
            Some(flag) => {
                info!(
                    "New column created with fluxes to fill for {} with flagging ({} <= {})",
                    settings.flux_name(),
                    flag.column,
                    flag.max
                );
                let flags = self.column(&flag.column)?;
                flux.iter()
                    .zip(flags)
                    .map(|(&v, &f)| if f <= flag.max { v } else { f64::NAN })
                    .collect()
            }
        };
        self.insert_front(&settings.flux_name(), values)
    }

    /// Copy of the table keeping the measured fluxes of one time of day only
    ///
    /// # Errors
    ///
    /// Returns an error if the light setting or a column is missing.
    pub fn mask_time_of_day(&self, settings: &Settings, time_of_day: TimeOfDay) -> Result<Self> {
        if time_of_day == TimeOfDay::Full {
            return Ok(self.clone());
        }
        let light = settings.require_light()?;
        let light_values = self.column(&light.variable)?.to_vec();
        let flux_name = settings.flux_name();
        let masked: Vec<f64> = self
            .column(&flux_name)?
            .iter()
            .zip(&light_values)
            .map(|(&v, &l)| {
                let hide = match time_of_day {
                    TimeOfDay::Day => l <= light.threshold,
                    TimeOfDay::Night => l > light.threshold,
                    TimeOfDay::Full => false,
                };
                if hide {
                    f64::NAN
                } else {
                    v
                }
            })
            .collect();

        let mut copy = self.clone();
        copy.set_column(&flux_name, masked)?;
        Ok(copy)
    }
}

/// Outcome of the series checks of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesChecks {
    /// First stamp at 00:30 (Fluxnet convention)
    pub first_half_hour: bool,
    /// Last stamp at 00:00 of the next day
    pub last_midnight: bool,
    /// Unique and continuous half-hours
    pub continuous: bool,
    pub flux_name_unique: bool,
    /// Longest gap of the flux column in half-hours
    pub longest_gap: usize,
}

impl SeriesChecks {
    #[must_use]
    pub fn gap_length_ok(&self) -> bool {
        self.flux_name_unique && self.longest_gap <= MAX_GAP_LENGTH
    }

    /// Names of the failed checks
    #[must_use]
    pub fn failed(&self) -> Vec<String> {
        let mut failed = Vec::new();
        if !self.first_half_hour {
            failed.push("first day does not start at 00:30".to_string());
        }
        if !self.last_midnight {
            failed.push("last day does not end at midnight".to_string());
        }
        if !self.continuous {
            failed.push("time stamps are not continuous half-hours".to_string());
        }
        if !self.flux_name_unique {
            failed.push("name of the flux column to fill is not unique".to_string());
        }
        if self.flux_name_unique && !self.gap_length_ok() {
            failed.push(format!(
                "longest gap of {} half-hours exceeds ten days",
                self.longest_gap
            ));
        }
        failed
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed().is_empty()
    }
}

/// Parse a timestamp in one of the accepted formats
///
/// # Errors
///
/// Returns `TimestampError` if no format matches.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| MgfError::TimestampError {
            value: text.to_string(),
        })
}

/// Parse a cell, anything that is not a number becomes a gap
#[must_use]
pub fn parse_value(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a cell, gaps become `NA`
#[must_use]
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        MISSING_VALUE.to_string()
    } else {
        value.to_string()
    }
}

/// Day of a position in a validated table
#[must_use]
pub const fn day_of(pos: usize) -> usize {
    pos / HALF_HOURS_PER_DAY
}

/// Half-hour slot of a position within its day
#[must_use]
pub const fn slot_of(pos: usize) -> usize {
    pos % HALF_HOURS_PER_DAY
}
