//! Core statistical operations
//!
//! All helpers skip non-finite values, an input without finite values yields
//! `NaN`.

/// Performance metrics of a technique on artificial gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Mean of predicted minus observed
    Bias,
    /// Standard deviation of the residuals assuming a Laplace distribution
    SDev,
    /// Squared Pearson correlation
    R2,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Bias, Metric::SDev, Metric::R2];

    /// Get the string representation of the metric
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bias => "Bias",
            Self::SDev => "SDev",
            Self::R2 => "R2",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Position of the metric along the first axis of bootstrap results
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Bias => 0,
            Self::SDev => 1,
            Self::R2 => 2,
        }
    }
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    let (sum, count) = finite(values).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation (divisor `n`)
#[must_use]
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let (sum, count) = finite(values).fold((0.0, 0usize), |(s, c), v| (s + (v - m).powi(2), c + 1));
    (sum / count as f64).sqrt()
}

/// Percentile `q` (0-100) with linear interpolation between closest ranks
#[must_use]
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = finite(values).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

/// Round to `digits` decimals, half away from zero
#[must_use]
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    // Re-parse to drop representation noise such as 26.001999999999999
    format!("{:.*}", digits.max(0) as usize, rounded)
        .parse()
        .unwrap_or(rounded)
}

#[must_use]
pub fn max_finite(values: &[f64]) -> f64 {
    finite(values).fold(f64::NAN, f64::max)
}

#[must_use]
pub fn min_finite(values: &[f64]) -> f64 {
    finite(values).fold(f64::NAN, f64::min)
}

/// Mean of predicted minus observed
#[must_use]
pub fn bias(predicted: &[f64], observed: &[f64]) -> f64 {
    let residuals: Vec<f64> = predicted.iter().zip(observed).map(|(p, o)| p - o).collect();
    mean(&residuals)
}

/// `√2 · mean(|p − o|)`, the standard deviation of Laplace distributed residuals
#[must_use]
pub fn sdev_laplace(predicted: &[f64], observed: &[f64]) -> f64 {
    let residuals: Vec<f64> = predicted
        .iter()
        .zip(observed)
        .map(|(p, o)| (p - o).abs())
        .collect();
    std::f64::consts::SQRT_2 * mean(&residuals)
}

/// Squared Pearson correlation, `NaN` if either series is constant
#[must_use]
pub fn r_squared(predicted: &[f64], observed: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = predicted
        .iter()
        .zip(observed)
        .map(|(&p, &o)| (p, o))
        .filter(|(p, o)| p.is_finite() && o.is_finite())
        .collect();
    if pairs.is_empty() {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_p = pairs.iter().map(|(p, _)| p).sum::<f64>() / n;
    let mean_o = pairs.iter().map(|(_, o)| o).sum::<f64>() / n;
    let (cov, var_p, var_o) = pairs.iter().fold((0.0, 0.0, 0.0), |(c, vp, vo), (p, o)| {
        let (dp, d_o) = (p - mean_p, o - mean_o);
        (c + dp * d_o, vp + dp * dp, vo + d_o * d_o)
    });
    if var_p == 0.0 || var_o == 0.0 {
        f64::NAN
    } else {
        cov * cov / var_p / var_o
    }
}

/// Evaluate a metric for predictions against observations
#[must_use]
pub fn evaluate(metric: Metric, predicted: &[f64], observed: &[f64]) -> f64 {
    match metric {
        Metric::Bias => bias(predicted, observed),
        Metric::SDev => sdev_laplace(predicted, observed),
        Metric::R2 => r_squared(predicted, observed),
    }
}
