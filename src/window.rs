//! Windows of neighbouring half-hours around a gap
//!
//! Positions refer to a validated table whose first stamp is 00:30, so that
//! position `i` lies on day `i / 48` in slot `i % 48`.

use crate::config::HALF_HOURS_PER_DAY;
use crate::scenario::Scenario;
use crate::series::{day_of, slot_of};

/// Half-hours per fixed 3-hour block
const THREE_HOUR_BLOCK: usize = 6;

/// Shape of the window taken on each day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowShape {
    /// All half-hours of each day
    FullDays,
    /// The fixed 3-hour block containing the gap
    ThreeHour,
    /// The gap's half-hour ± the given number of half-hours
    HalfHours(usize),
}

/// Sorted, unique positions around `pos` in a table of `len` rows
///
/// The window spans the days `day(pos) ± win_days`. With a scenario the
/// artificial gap is removed from the window: the position itself for
/// [`Scenario::Hhs`], its whole day for [`Scenario::Days`].
#[must_use]
pub fn window_indices(
    pos: usize,
    len: usize,
    win_days: usize,
    shape: WindowShape,
    scenario: Option<Scenario>,
) -> Vec<usize> {
    let day = day_of(pos) as isize;
    let win = win_days as isize;
    let per_day = HALF_HOURS_PER_DAY as isize;
    let in_range = |p: isize| p >= 0 && (p as usize) < len;

    let mut indices: Vec<usize> = match shape {
        WindowShape::FullDays => {
            let first_day = (day - win).max(0);
            let start = (first_day * per_day) as usize;
            let end = (((day + win + 1) * per_day) as usize).min(len);
            (start..end).collect()
        }
        WindowShape::ThreeHour => {
            let block_start = (slot_of(pos) / THREE_HOUR_BLOCK * THREE_HOUR_BLOCK) as isize;
            (-win..=win)
                .filter(|d| day + d >= 0)
                .flat_map(|d| {
                    let base = (day + d) * per_day + block_start;
                    (0..THREE_HOUR_BLOCK as isize).map(move |offset| base + offset)
                })
                .filter(|&p| in_range(p))
                .map(|p| p as usize)
                .collect()
        }
        WindowShape::HalfHours(half_hours) => {
            let k = half_hours as isize;
            let centre = pos as isize;
            (-win..=win)
                .flat_map(|d| {
                    let shifted = centre + d * per_day;
                    (-k..=k).map(move |offset| shifted + offset)
                })
                .filter(|&p| in_range(p))
                .map(|p| p as usize)
                .collect()
        }
    };

    indices.sort_unstable();
    indices.dedup();
    if let Some(scenario) = scenario {
        indices.retain(|&p| !scenario.drops(pos, p));
    }
    indices
}
