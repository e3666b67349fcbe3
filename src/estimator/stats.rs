//! Robust price-per-area statistics.
//!
//! Symmetric trimming, rounded mean and median over price-per-area samples.
//! All functions are pure and operate on plain `f64` slices.

use rust_decimal::prelude::*;

/// Sort ascending and drop `floor(n * fraction)` values from each end.
///
/// Trimming only happens when `samples.len() >= min_samples`; smaller sets
/// are returned sorted but otherwise untouched. NaN values never reach
/// this function (the relevance filter only emits finite ratios).
pub fn trim_symmetric(samples: &[f64], fraction: f64, min_samples: usize) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n < min_samples || n == 0 {
        return sorted;
    }

    let cut = trim_count(n, fraction);
    sorted[cut..n - cut].to_vec()
}

/// Number of values removed from each end for a set of `n` samples.
pub fn trim_count(n: usize, fraction: f64) -> usize {
    let cut = (n as f64 * fraction).floor() as usize;
    // Never trim the whole set away.
    cut.min(n.saturating_sub(1) / 2)
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Mean rounded to the nearest whole currency unit.
pub fn rounded_mean(samples: &[f64]) -> Option<Decimal> {
    mean(samples).and_then(round_currency)
}

/// Median (average of the two middle values for even-sized sets).
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Round half away from zero to whole euros.
pub fn round_currency(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value.round())
}
