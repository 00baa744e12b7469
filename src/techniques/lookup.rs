//! Look-up-table techniques
//!
//! A look-up table averages the measured fluxes of the window entries around
//! the gap whose drivers satisfy a condition. Entries count whether or not
//! their flux is measured. With fewer than two entries or no measured flux
//! among them, the window is widened by a fixed number of days and the gap is
//! retried.

use super::GapFillingTechnique;
use crate::config::{Driver, Settings};
use crate::errors::Result;
use crate::scenario::Scenario;
use crate::series::FluxTable;
use crate::window::{window_indices, WindowShape};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Minimum number of window entries meeting the condition
const MIN_ENTRIES: usize = 2;

/// Condition a window entry must meet to enter the average
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Every entry qualifies
    Always,
    /// Entry on the same side of the light threshold as the gap
    SameLightSide { variable: String, threshold: f64 },
    /// Every driver within its range of the gap's driver value
    Similar(Vec<Driver>),
}

impl Condition {
    fn resolve<'a>(&self, table: &'a FluxTable) -> Result<ResolvedCondition<'a>> {
        Ok(match self {
            Self::Always => ResolvedCondition::Always,
            Self::SameLightSide {
                variable,
                threshold,
            } => ResolvedCondition::SameLightSide {
                values: table.column(variable)?,
                threshold: *threshold,
            },
            Self::Similar(drivers) => ResolvedCondition::Similar(
                drivers
                    .iter()
                    .map(|d| Ok((table.column(&d.variable)?, d.range)))
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "all entries"),
            Self::SameLightSide {
                variable,
                threshold,
            } => write!(f, "{variable} on same side of {threshold}"),
            Self::Similar(drivers) => {
                let parts: Vec<String> = drivers
                    .iter()
                    .map(|d| format!("|d{}| <= {}", d.variable, d.range))
                    .collect();
                write!(f, "{}", parts.join(" & "))
            }
        }
    }
}

enum ResolvedCondition<'a> {
    Always,
    SameLightSide { values: &'a [f64], threshold: f64 },
    Similar(Vec<(&'a [f64], f64)>),
}

impl ResolvedCondition<'_> {
    fn matches(&self, gap: usize, entry: usize) -> bool {
        match self {
            Self::Always => true,
            Self::SameLightSide { values, threshold } => {
                let (g, e) = (values[gap], values[entry]);
                (g > *threshold && e > *threshold) || (g <= *threshold && e <= *threshold)
            }
            Self::Similar(drivers) => drivers
                .iter()
                .all(|(values, range)| (values[entry] - values[gap]).abs() <= *range),
        }
    }
}

/// Look-up-table technique
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    pub name: String,
    /// Window of ± days to start with
    pub win_day_start: usize,
    /// Days added to the window per retry
    pub win_day_step: usize,
    pub shape: WindowShape,
    pub condition: Condition,
}

impl LookupTable {
    #[must_use]
    pub fn new(
        name: &str,
        win_day_start: usize,
        win_day_step: usize,
        shape: WindowShape,
        condition: Condition,
    ) -> Self {
        Self {
            name: name.to_string(),
            win_day_start,
            win_day_step,
            shape,
            condition,
        }
    }

    fn estimate(
        &self,
        pos: usize,
        win_days: usize,
        flux: &[f64],
        condition: &ResolvedCondition<'_>,
        scenario: Scenario,
    ) -> f64 {
        let mut entries = 0;
        let mut sum = 0.0;
        let mut measured = 0;
        for entry in window_indices(pos, flux.len(), win_days, self.shape, Some(scenario)) {
            if !condition.matches(pos, entry) {
                continue;
            }
            entries += 1;
            if flux[entry].is_finite() {
                sum += flux[entry];
                measured += 1;
            }
        }
        if entries >= MIN_ENTRIES && measured > 0 {
            sum / measured as f64
        } else {
            f64::NAN
        }
    }
}

impl GapFillingTechnique for LookupTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill(&self, table: &FluxTable, flux_column: &str, scenario: Scenario) -> Result<Vec<f64>> {
        let flux = table.column(flux_column)?;
        let condition = self.condition.resolve(table)?;
        info!(
            "Fill technique: {} ({})",
            scenario.column_name(&self.name),
            self.condition
        );

        let half_days = 0.5 * table.num_days();
        let mut filled = vec![f64::NAN; flux.len()];
        let mut win_days = self.win_day_start;
        loop {
            let pending: Vec<usize> = (0..filled.len()).filter(|&i| filled[i].is_nan()).collect();
            if pending.is_empty() {
                break;
            }
            let estimates: Vec<(usize, f64)> = pending
                .par_iter()
                .map(|&pos| (pos, self.estimate(pos, win_days, flux, &condition, scenario)))
                .collect();
            for (pos, value) in estimates {
                filled[pos] = value;
            }

            let remaining = filled.iter().filter(|v| v.is_nan()).count();
            debug!(
                "{}: window ±{} days, remaining gaps {} of {} ({:.2} %)",
                self.name,
                win_days,
                remaining,
                filled.len(),
                remaining as f64 / filled.len() as f64 * 100.0
            );

            win_days += self.win_day_step;
            if remaining > 0 && (self.win_day_step == 0 || win_days as f64 > half_days) {
                warn!(
                    "{} remaining gaps for {}, window of ±{} days exceeds half of the {:.1} days",
                    remaining,
                    scenario.column_name(&self.name),
                    win_days,
                    table.num_days()
                );
                break;
            }
        }
        Ok(filled)
    }
}

/// Look-up tables and diurnal techniques configured by the settings
///
/// WDM needs the light setting, the `LUT_V1*` family needs the chain of LUT
/// drivers. FDA, MDA and MDC are always defined.
#[must_use]
pub fn define_lookup_tables(settings: &Settings) -> Vec<LookupTable> {
    let mut tables = Vec::new();
    if let Some(light) = &settings.light {
        tables.push(LookupTable::new(
            "WDM",
            0,
            1,
            WindowShape::FullDays,
            Condition::SameLightSide {
                variable: light.variable.clone(),
                threshold: light.threshold,
            },
        ));
    }
    tables.push(LookupTable::new("FDA_hh6", 0, 1, WindowShape::ThreeHour, Condition::Always));
    tables.push(LookupTable::new("MDA_hh5", 0, 1, WindowShape::HalfHours(2), Condition::Always));
    tables.push(LookupTable::new("MDC_d3", 3, 3, WindowShape::HalfHours(0), Condition::Always));
    tables.push(LookupTable::new("MDC_d7", 7, 7, WindowShape::HalfHours(0), Condition::Always));

    let mut tag = String::new();
    for (i, driver) in settings.lut_drivers.iter().enumerate() {
        tag.push_str(&format!("V{}", i + 1));
        let drivers = settings.lut_drivers[..=i].to_vec();
        debug!("LUT_{} adds driver {}", tag, driver.variable);
        for days in [3, 7] {
            tables.push(LookupTable::new(
                &format!("LUT_{tag}_d{days}"),
                days,
                days,
                WindowShape::FullDays,
                Condition::Similar(drivers.clone()),
            ));
        }
    }
    tables
}

/// The MDS look-up table, if at least two MDS drivers are configured
#[must_use]
pub fn define_mds_table(settings: &Settings) -> Option<LookupTable> {
    if settings.mds_drivers.len() < 2 {
        return None;
    }
    Some(LookupTable::new(
        "LUT_MDS_d7",
        7,
        7,
        WindowShape::FullDays,
        Condition::Similar(settings.mds_drivers.clone()),
    ))
}
