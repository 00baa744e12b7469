//! Interpolation techniques
//!
//! Both techniques work on a window of ± `w` full days around the gap, with
//! the artificial gap of the scenario removed from the measured fluxes. Gaps
//! up to [`SHORT_GAP_LENGTH`] half-hours are interpolated from neighbouring
//! half-hours, longer gaps from daily means. If a position stays empty, `w`
//! grows by one day up to [`MAX_WINDOW_DAYS`].

use super::GapFillingTechnique;
use crate::config::{HALF_HOURS_PER_DAY, SHORT_GAP_LENGTH};
use crate::errors::Result;
use crate::gaps::gap_length_at;
use crate::scenario::Scenario;
use crate::series::{day_of, FluxTable};
use crate::window::{window_indices, WindowShape};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Largest window of ± days tried before giving up
pub const MAX_WINDOW_DAYS: usize = 10;

/// Initial width of the moving average over half-hours
const ROLL_START: usize = 5;
const ROLL_STEP: usize = 2;
/// Minimum number of values in a moving average
const MIN_PERIODS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Linear interpolation (`IP_lin`)
    Linear,
    /// Centred moving average (`IP_mov`)
    Moving,
}

impl Interpolation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "IP_lin",
            Self::Moving => "IP_mov",
        }
    }

    fn estimate(self, pos: usize, win_days: usize, flux: &[f64], scenario: Scenario) -> f64 {
        let indices = window_indices(pos, flux.len(), win_days, WindowShape::FullDays, None);
        let Some(&first) = indices.first() else {
            return f64::NAN;
        };
        let data: Vec<f64> = indices
            .iter()
            .map(|&p| {
                if scenario.drops(pos, p) {
                    f64::NAN
                } else {
                    flux[p]
                }
            })
            .collect();
        let local = pos - first;

        if gap_length_at(&data, local) <= SHORT_GAP_LENGTH {
            match self {
                Self::Linear => interpolate_limited(&data, SHORT_GAP_LENGTH)[local],
                Self::Moving => {
                    let mut width = ROLL_START;
                    loop {
                        let value = centred_mean_at(&data, local, width, MIN_PERIODS);
                        if !value.is_nan() || width > data.len() {
                            break value;
                        }
                        width += ROLL_STEP;
                    }
                }
            }
        } else {
            let means = daily_means(&data);
            let day = day_of(pos) - day_of(first);
            match self {
                Self::Linear => interpolate_limited(&means, win_days)[day],
                Self::Moving => centred_mean_at(&means, day, MIN_PERIODS + win_days, MIN_PERIODS),
            }
        }
    }
}

impl GapFillingTechnique for Interpolation {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn fill(&self, table: &FluxTable, flux_column: &str, scenario: Scenario) -> Result<Vec<f64>> {
        let flux = table.column(flux_column)?;
        info!("Fill technique: {}", scenario.column_name(self.as_str()));

        let mut filled = vec![f64::NAN; flux.len()];
        let mut win_days = 1;
        loop {
            let pending: Vec<usize> = (0..filled.len()).filter(|&i| filled[i].is_nan()).collect();
            if pending.is_empty() {
                break;
            }
            let estimates: Vec<(usize, f64)> = pending
                .par_iter()
                .map(|&pos| (pos, self.estimate(pos, win_days, flux, scenario)))
                .collect();
            for (pos, value) in estimates {
                filled[pos] = value;
            }

            let remaining = filled.iter().filter(|v| v.is_nan()).count();
            debug!(
                "{}: window ±{} days, remaining gaps {}",
                self.as_str(),
                win_days,
                remaining
            );
            win_days += 1;
            if win_days > MAX_WINDOW_DAYS && remaining > 0 {
                warn!(
                    "{} remaining gaps for {}, window of ±{} days is larger than ±{} for interpolations",
                    remaining,
                    scenario.column_name(self.as_str()),
                    win_days,
                    MAX_WINDOW_DAYS
                );
                break;
            }
        }
        Ok(filled)
    }
}

/// Mean of the finite values of each day, `NaN` for days without values
///
/// `values` must start at the first half-hour of a day.
fn daily_means(values: &[f64]) -> Vec<f64> {
    values
        .chunks(HALF_HOURS_PER_DAY)
        .map(|day| {
            let (sum, count) = day
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Linear interpolation of `NaN` runs, limited to `limit` values from each end
///
/// A position inside a run `a..=b` is filled if it lies within `limit` values
/// of either end of the run. Interior runs are interpolated linearly between
/// their neighbours, leading and trailing runs take the nearest value. A
/// series without any value is returned unchanged.
#[must_use]
pub fn interpolate_limited(values: &[f64], limit: usize) -> Vec<f64> {
    let mut result = values.to_vec();
    let mut start = 0;
    while start < values.len() {
        if !values[start].is_nan() {
            start += 1;
            continue;
        }
        let end = values[start..]
            .iter()
            .position(|v| !v.is_nan())
            .map_or(values.len(), |offset| start + offset);
        let before = start.checked_sub(1).map(|i| values[i]);
        let after = values.get(end).copied();

        for j in start..end {
            if j - start >= limit && end - 1 - j >= limit {
                continue;
            }
            result[j] = match (before, after) {
                (Some(left), Some(right)) => {
                    let t = (j + 1 - start) as f64 / (end + 1 - start) as f64;
                    left + t * (right - left)
                }
                (Some(left), None) => left,
                (None, Some(right)) => right,
                (None, None) => f64::NAN,
            };
        }
        start = end;
    }
    result
}

/// Centred moving average at `pos` over `width` values
///
/// For even widths the window reaches one value further to the left than to
/// the right. Returns `NaN` if fewer than `min_periods` finite values fall
/// into the window.
#[must_use]
pub fn centred_mean_at(values: &[f64], pos: usize, width: usize, min_periods: usize) -> f64 {
    if width == 0 || pos >= values.len() {
        return f64::NAN;
    }
    let left = width / 2;
    let right = width - 1 - left;
    let start = pos.saturating_sub(left);
    let end = (pos + right + 1).min(values.len());
    let (sum, count) = values[start..end]
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count < min_periods.max(1) {
        f64::NAN
    } else {
        sum / count as f64
    }
}
