//! Parallel evaluation of performance metrics
//!
//! One bootstrap repetition evaluates every technique on the same sample of
//! positions. Techniques are independent and evaluated on the rayon pool.

use super::operations::{evaluate, Metric};
use ndarray::Array2;
use rayon::prelude::*;

/// Metrics of all techniques on one sample
///
/// Returns an array of shape `(metrics, techniques)` in the order of
/// [`Metric::ALL`]. An empty sample yields `NaN` for every metric.
#[must_use]
pub fn parallel_metrics(observed: &[f64], predicted: &[&[f64]], sample: &[usize]) -> Array2<f64> {
    let observed_sample: Vec<f64> = sample.iter().map(|&i| observed[i]).collect();

    let per_technique: Vec<[f64; 3]> = predicted
        .par_iter()
        .map(|column| {
            let predicted_sample: Vec<f64> = sample.iter().map(|&i| column[i]).collect();
            Metric::ALL.map(|metric| evaluate(metric, &predicted_sample, &observed_sample))
        })
        .collect();

    let mut result = Array2::from_elem((Metric::ALL.len(), predicted.len()), f64::NAN);
    for (tech, metrics) in per_technique.iter().enumerate() {
        for metric in Metric::ALL {
            result[[metric.index(), tech]] = metrics[metric.index()];
        }
    }
    result
}

/// Mask of positions where `observed` and every prediction are finite
#[must_use]
pub fn complete_positions(observed: &[f64], predicted: &[&[f64]]) -> Vec<bool> {
    (0..observed.len())
        .into_par_iter()
        .map(|i| observed[i].is_finite() && predicted.iter().all(|column| column[i].is_finite()))
        .collect()
}
