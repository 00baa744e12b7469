//! Description of a filled run: settings, data coverage and bootstrap sizes

use super::operations::round_to;
use crate::config::{Settings, HALF_HOURS_PER_DAY};
use crate::errors::Result;
use crate::gaps::split_short_long;
use crate::scenario::{Scenario, TimeOfDay};
use crate::series::FluxTable;
use crate::statistics::bootstrap::eligible_positions;
use std::path::Path;
use tracing::{info, warn};

/// Ordered `Property,Value` pairs describing a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    entries: Vec<(String, String)>,
}

impl Description {
    fn push(&mut self, property: &str, value: impl ToString) {
        self.entries.push((property.to_string(), value.to_string()));
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["Property", "Value"])?;
        for (property, value) in &self.entries {
            writer.write_record([property, value])?;
        }
        writer.flush()?;
        info!("Results saved to {}", path.display());
        Ok(())
    }
}

/// Describe the settings, the measured series and the bootstrap sample sizes
///
/// Day-time and night-time counts need the light setting and are `NA`
/// without it.
///
/// # Errors
///
/// Returns an error if the flux column or a scenario column is missing.
pub fn describe(table: &FluxTable, settings: &Settings) -> Result<Description> {
    let mut descr = Description::default();
    for (key, value) in settings.entries() {
        descr.push(key, value);
    }

    let flux_name = settings.flux_name();
    let flux = table.column(&flux_name)?;
    let num_hhs = table.len();
    let num_meas = flux.iter().filter(|v| !v.is_nan()).count();
    let num_gaps = num_hhs - num_meas;
    let (short, long) = split_short_long(flux);

    descr.push("FluxOrg", &flux_name);
    descr.push("NumDays", round_to(num_hhs as f64 / HALF_HOURS_PER_DAY as f64, 2));
    descr.push("NumHHs", num_hhs);
    descr.push("NumMeas", num_meas);
    descr.push("NumGaps", num_gaps);
    descr.push("NumGaps_short", short);
    descr.push("NumGaps_long", long);
    if num_gaps != short + long {
        warn!("Error in sum of gaps: {} != {} + {}", num_gaps, short, long);
    }
    let perc_gaps = if num_hhs == 0 {
        f64::NAN
    } else {
        num_gaps as f64 / num_hhs as f64 * 100.0
    };
    descr.push("PercGaps", round_to(perc_gaps, 1));

    for scenario in Scenario::ALL {
        for time_of_day in TimeOfDay::ALL {
            let key = format!("NumBoot_{}_{}", scenario.suffix(), time_of_day.short());
            if time_of_day != TimeOfDay::Full && settings.light.is_none() {
                warn!("{} needs the light setting", key);
                descr.push(&key, "NA");
                continue;
            }
            let subset = table.mask_time_of_day(settings, time_of_day)?;
            let count = eligible_positions(&subset, &flux_name, scenario)?
                .into_iter()
                .filter(|&e| e)
                .count();
            descr.push(&key, count);
        }
    }
    Ok(descr)
}
