//! The detection pipeline: six sequential stages from raw flux to triaged
//! candidates.
//!
//! Data flows strictly forward: preprocess -> period search -> model fit ->
//! validation battery -> classification -> triage. The stages are pure
//! functions over immutable inputs; the orchestrator in
//! [`crate::services::run_processor`] sequences them per job.

pub mod bls;
pub mod classify;
pub mod error;
pub mod preprocess;
pub mod transit_fit;
pub mod triage;
pub mod validation;

pub use error::{PipelineError, PipelineResult};

/// Median of a slice. Returns 0.0 for an empty slice.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Robust noise estimate: median absolute deviation scaled to the Gaussian
/// equivalent sigma.
pub(crate) fn robust_sigma(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    1.4826 * median(&deviations)
}

/// Signed time offset (days) of `t` from the nearest transit center of the
/// ephemeris (`period_days`, `t0`). Result lies in [-period/2, period/2].
pub(crate) fn fold_offset(t: f64, period_days: f64, t0: f64) -> f64 {
    let cycles = (t - t0) / period_days;
    (cycles - cycles.round()) * period_days
}

/// Transit counter for `t`: the index of the nearest transit center since the
/// reference epoch (transit 0 is centered at `t0`).
pub(crate) fn transit_index(t: f64, period_days: f64, t0: f64) -> i64 {
    ((t - t0) / period_days).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_robust_sigma_gaussian_scale() {
        // For symmetric data, MAD * 1.4826 approximates the std deviation.
        let values: Vec<f64> = (0..101).map(|i| (i as f64 - 50.0) / 50.0).collect();
        let sigma = robust_sigma(&values);
        assert!(sigma > 0.5 && sigma < 1.0, "sigma = {}", sigma);
    }

    #[test]
    fn test_fold_offset_range() {
        let period = 3.0;
        let t0 = 1.5;
        for i in 0..100 {
            let t = i as f64 * 0.37;
            let dt = fold_offset(t, period, t0);
            assert!(dt >= -period / 2.0 - 1e-9 && dt <= period / 2.0 + 1e-9);
        }
        // A point exactly on a transit center folds to zero.
        assert!(fold_offset(t0 + 7.0 * period, period, t0).abs() < 1e-9);
    }

    #[test]
    fn test_transit_index_parity() {
        let period = 2.0;
        let t0 = 0.5;
        assert_eq!(transit_index(0.5, period, t0), 0);
        assert_eq!(transit_index(2.5, period, t0), 1);
        assert_eq!(transit_index(4.6, period, t0), 2);
        assert_eq!(transit_index(-1.5, period, t0), -1);
    }
}
