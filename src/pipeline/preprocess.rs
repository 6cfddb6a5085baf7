//! Light-curve preprocessing: cleaning, normalization, detrending, and
//! robust outlier rejection.
//!
//! The clip is asymmetric on purpose: transit dips are themselves downward
//! outliers, so upward cosmic-ray-like spikes are clipped tightly while
//! downward excursions are only removed far beyond the depth range the
//! search targets.

use crate::config::PipelineConfig;
use crate::models::LightCurve;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::{median, robust_sigma};
use tracing::debug;

/// A cleaned light curve plus its robust noise estimate.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub curve: LightCurve,
    /// MAD-based per-point noise level of the normalized flux.
    pub noise_sigma: f64,
}

/// Clean and normalize a raw light curve.
///
/// Steps: drop non-finite samples, median-normalize the flux, divide out a
/// sliding-median trend, then apply the asymmetric robust clip.
///
/// # Errors
/// - [`PipelineError::InvalidInput`] when the flux median is non-positive
///   (clearly corrupt data).
/// - [`PipelineError::InsufficientData`] when fewer than `min_points`
///   samples survive cleaning.
pub fn preprocess(raw: &LightCurve, config: &PipelineConfig) -> PipelineResult<Preprocessed> {
    let has_errors = !raw.flux_err.is_empty();

    // Drop non-finite and clearly corrupt samples.
    let mut time = Vec::with_capacity(raw.len());
    let mut flux = Vec::with_capacity(raw.len());
    let mut flux_err = Vec::with_capacity(if has_errors { raw.len() } else { 0 });
    for i in 0..raw.len() {
        let f = raw.flux[i];
        if !f.is_finite() {
            continue;
        }
        if has_errors {
            let e = raw.flux_err[i];
            if !e.is_finite() || e < 0.0 {
                continue;
            }
            flux_err.push(e);
        }
        time.push(raw.time[i]);
        flux.push(f);
    }

    // Median normalization.
    let med = median(&flux);
    if !(med.is_finite() && med > 0.0) {
        return Err(PipelineError::InvalidInput(format!(
            "flux median must be positive, got {}",
            med
        )));
    }
    for f in flux.iter_mut() {
        *f /= med;
    }
    for e in flux_err.iter_mut() {
        *e /= med;
    }

    // Divide out the slow stellar-variability trend. The window is long
    // compared to a transit duration, so short dips survive.
    let trend = sliding_median_trend(&time, &flux, config.detrend_window_hours / 24.0);
    for (f, t) in flux.iter_mut().zip(&trend) {
        if *t > 0.0 {
            *f /= *t;
        }
    }

    // Asymmetric robust clip.
    let residuals: Vec<f64> = flux.iter().map(|f| f - 1.0).collect();
    let sigma = robust_sigma(&residuals);
    if sigma > 0.0 {
        let high = config.sigma_clip_high * sigma;
        let low = config.sigma_clip_low * sigma;
        let mut keep_time = Vec::with_capacity(time.len());
        let mut keep_flux = Vec::with_capacity(flux.len());
        let mut keep_err = Vec::with_capacity(flux_err.len());
        for i in 0..time.len() {
            let r = flux[i] - 1.0;
            if r > high || r < -low {
                continue;
            }
            keep_time.push(time[i]);
            keep_flux.push(flux[i]);
            if has_errors {
                keep_err.push(flux_err[i]);
            }
        }
        time = keep_time;
        flux = keep_flux;
        flux_err = keep_err;
    }

    if time.len() < config.min_points {
        return Err(PipelineError::InsufficientData(format!(
            "{} samples remain after cleaning (minimum {})",
            time.len(),
            config.min_points
        )));
    }

    // Final noise estimate; fills missing per-point uncertainties.
    let residuals: Vec<f64> = flux.iter().map(|f| f - 1.0).collect();
    let noise_sigma = robust_sigma(&residuals).max(1e-12);
    if !has_errors {
        flux_err = vec![noise_sigma; time.len()];
    }

    debug!(
        samples = time.len(),
        noise_ppm = noise_sigma * 1.0e6,
        "preprocessing complete"
    );

    Ok(Preprocessed {
        curve: LightCurve {
            time,
            flux,
            flux_err,
        },
        noise_sigma,
    })
}

/// Sliding-window median trend: for each sample, the median flux of all
/// samples within +-window/2 in time.
fn sliding_median_trend(time: &[f64], flux: &[f64], window_days: f64) -> Vec<f64> {
    let n = time.len();
    let half = window_days / 2.0;
    let mut trend = vec![1.0; n];
    let mut lo = 0usize;
    let mut hi = 0usize;
    for i in 0..n {
        while time[i] - time[lo] > half {
            lo += 1;
        }
        while hi < n && time[hi] - time[i] <= half {
            hi += 1;
        }
        trend[i] = median(&flux[lo..hi]);
    }
    trend
}
