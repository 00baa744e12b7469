//! Gap counting and gap-length distributions
//!
//! A gap is a run of consecutive `NaN` values. These helpers are used for
//! the run checks, the interpolation techniques, the uncertainty of flux
//! sums and the gap distribution chart.

use crate::config::SHORT_GAP_LENGTH;

/// Running counter inside each gap (1, 2, 3, ...), 0 on measured values
#[must_use]
pub fn count_gaps(values: &[f64]) -> Vec<usize> {
    let mut counter = 0;
    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                counter += 1;
            } else {
                counter = 0;
            }
            counter
        })
        .collect()
}

/// Total length of the gap each position belongs to, 0 on measured values
#[must_use]
pub fn gap_lengths(values: &[f64]) -> Vec<usize> {
    let mut lengths = vec![0; values.len()];
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
        lengths[start..end].fill(end - start);
        start = end;
    }
    lengths
}

/// Length of the gap containing `pos`, 0 if `pos` holds a value
#[must_use]
pub fn gap_length_at(values: &[f64], pos: usize) -> usize {
    if pos >= values.len() || !values[pos].is_nan() {
        return 0;
    }
    let before = values[..pos].iter().rev().take_while(|v| v.is_nan()).count();
    let after = values[pos + 1..].iter().take_while(|v| v.is_nan()).count();
    before + 1 + after
}

/// Number of half-hours in short gaps and in long gaps
#[must_use]
pub fn split_short_long(values: &[f64]) -> (usize, usize) {
    gap_lengths(values)
        .into_iter()
        .filter(|&len| len > 0)
        .fold((0, 0), |(short, long), len| {
            if len <= SHORT_GAP_LENGTH {
                (short + 1, long)
            } else {
                (short, long + 1)
            }
        })
}

/// One gap length of a gap distribution
#[derive(Debug, Clone, PartialEq)]
pub struct GapClass {
    /// Gap length in half-hours
    pub length: usize,
    /// Half-hours in gaps of this length
    pub count: usize,
    /// Number of gaps of this length
    pub freq: f64,
    /// Cumulative half-hours in gaps up to this length
    pub sums: usize,
    /// Percent of all gap half-hours
    pub perc_gaps: f64,
    pub perc_gaps_sums: f64,
    /// Percent of all half-hours
    pub perc_data: f64,
    pub perc_data_sums: f64,
}

/// Distribution of gap lengths of a column
#[derive(Debug, Clone, PartialEq)]
pub struct GapDistribution {
    /// Number of measured values
    pub measured: usize,
    /// Number of half-hours in gaps
    pub gaps: usize,
    /// Number of half-hours in total
    pub total: usize,
    /// Classes sorted by gap length
    pub classes: Vec<GapClass>,
}

impl GapDistribution {
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let lengths = gap_lengths(values);
        let total = values.len();
        let measured = lengths.iter().filter(|&&len| len == 0).count();
        let gaps = total - measured;

        let mut counts: Vec<(usize, usize)> = Vec::new();
        let mut sorted: Vec<usize> = lengths.into_iter().filter(|&len| len > 0).collect();
        sorted.sort_unstable();
        for len in sorted {
            match counts.last_mut() {
                Some((last, count)) if *last == len => *count += 1,
                _ => counts.push((len, 1)),
            }
        }

        let percent = |part: usize, whole: usize| {
            if whole == 0 {
                f64::NAN
            } else {
                part as f64 / whole as f64 * 100.0
            }
        };

        let mut cumulative = 0;
        let classes = counts
            .into_iter()
            .map(|(length, count)| {
                cumulative += count;
                GapClass {
                    length,
                    count,
                    freq: count as f64 / length as f64,
                    sums: cumulative,
                    perc_gaps: percent(count, gaps),
                    perc_gaps_sums: percent(cumulative, gaps),
                    perc_data: percent(count, total),
                    perc_data_sums: percent(cumulative, total),
                }
            })
            .collect();

        Self {
            measured,
            gaps,
            total,
            classes,
        }
    }
}
