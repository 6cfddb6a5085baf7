//! Box-least-squares period search.
//!
//! For each trial period the light curve is folded and binned in phase, and a
//! two-level (in-transit vs out-of-transit) box model is slid across a grid
//! of trial durations and phases. The periodogram power at a trial period is
//! the best box's depth significance, `depth * sqrt(n_in) / sigma`, so the
//! significance floor is directly the run's minimum SNR.

use crate::config::PipelineConfig;
use crate::models::{Candidate, LightCurve, RunParameters};
use crate::pipeline::error::{PipelineError, PipelineResult};
use rayon::prelude::*;
use tracing::debug;

/// Best box fit found at one trial period.
#[derive(Debug, Clone, Copy)]
struct BoxFit {
    /// Depth significance (an SNR); 0.0 when no dip was found.
    power: f64,
    /// Box depth as a flux fraction.
    depth: f64,
    /// Fractional transit duration (duration / period).
    duration_frac: f64,
    /// Orbital phase of the transit center, in [0, 1).
    phase_center: f64,
}

/// Run the box search over the configured period grid.
///
/// Returns raw candidates ranked by SNR descending, at most
/// `params.max_candidates`, with near-integer period-ratio aliases of a
/// stronger candidate suppressed.
///
/// # Errors
/// [`PipelineError::NoSignalFound`] when no periodogram local maximum clears
/// the significance floor. The orchestrator surfaces this as a completed job
/// with zero candidates.
pub fn search(
    curve: &LightCurve,
    noise_sigma: f64,
    params: &RunParameters,
    config: &PipelineConfig,
) -> PipelineResult<Vec<Candidate>> {
    let periods = period_grid(curve, params, config)?;
    let sigma = noise_sigma.max(1e-12);
    let t_ref = curve.time[0];

    // Per-trial-period evaluations are independent; results are merged in
    // grid order (never completion order) to keep the output deterministic.
    let fits: Vec<BoxFit> = periods
        .par_iter()
        .map(|&period| best_box(curve, period, sigma, config))
        .collect();

    debug!(
        trial_periods = periods.len(),
        floor = params.min_snr,
        "periodogram computed"
    );

    // Local maxima above the significance floor.
    let mut peaks: Vec<(f64, BoxFit)> = Vec::new();
    for i in 0..fits.len() {
        let p = fits[i].power;
        if p < params.min_snr {
            continue;
        }
        let left_ok = i == 0 || p > fits[i - 1].power;
        let right_ok = i + 1 == fits.len() || p >= fits[i + 1].power;
        if left_ok && right_ok {
            peaks.push((periods[i], fits[i]));
        }
    }
    if peaks.is_empty() {
        return Err(PipelineError::NoSignalFound);
    }

    // Rank by SNR descending; ties prefer the shorter period (the
    // fundamental rather than a higher harmonic).
    peaks.sort_by(|a, b| {
        b.1.power
            .partial_cmp(&a.1.power)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
    });

    // Alias suppression: a period that is a near-integer multiple or
    // sub-multiple of an already-kept (stronger) one is the same signal.
    let mut kept: Vec<(f64, BoxFit)> = Vec::new();
    for (period, fit) in peaks {
        if kept
            .iter()
            .any(|(kp, _)| is_alias(*kp, period, config.alias_tolerance))
        {
            continue;
        }
        kept.push((period, fit));
        if kept.len() >= params.max_candidates {
            break;
        }
    }

    let candidates = kept
        .into_iter()
        .map(|(period, fit)| {
            Candidate::from_box_search(
                period,
                t_ref + fit.phase_center * period,
                fit.depth,
                fit.duration_frac * period * 24.0,
                fit.power,
            )
        })
        .collect();
    Ok(candidates)
}

/// Geometric trial-period grid, clamped so every trial period fits at least
/// two transits in the observed span and capped at `max_period_trials`.
fn period_grid(
    curve: &LightCurve,
    params: &RunParameters,
    config: &PipelineConfig,
) -> PipelineResult<Vec<f64>> {
    let min_p = params.min_period_days;
    let max_p = params.max_period_days.min(curve.span_days() / 2.0);
    if max_p <= min_p {
        // The data span cannot hold two transits anywhere in the requested
        // range; nothing to search.
        return Err(PipelineError::NoSignalFound);
    }
    let ratio = max_p / min_p;
    let mut n = (ratio.ln() / config.period_step_frac.ln_1p()).ceil() as usize + 1;
    if n > config.max_period_trials {
        n = config.max_period_trials;
    }
    if n < 2 {
        n = 2;
    }
    let step = ratio.powf(1.0 / (n - 1) as f64);
    let mut periods = Vec::with_capacity(n);
    let mut p = min_p;
    for _ in 0..n {
        periods.push(p);
        p *= step;
    }
    Ok(periods)
}

/// Best box over all trial durations and phases at one period, using a
/// binned circular fold with prefix sums.
fn best_box(curve: &LightCurve, period: f64, sigma: f64, config: &PipelineConfig) -> BoxFit {
    let nbins = config.phase_bins;
    let t_ref = curve.time[0];

    let mut bin_count = vec![0u32; nbins];
    let mut bin_sum = vec![0.0f64; nbins];
    for (t, f) in curve.time.iter().zip(&curve.flux) {
        let cycles = (t - t_ref) / period;
        let phase = cycles - cycles.floor();
        let b = ((phase * nbins as f64) as usize).min(nbins - 1);
        bin_count[b] += 1;
        bin_sum[b] += f;
    }
    let total_count: u32 = bin_count.iter().sum();
    let total_sum: f64 = bin_sum.iter().sum();
    if total_count == 0 {
        return BoxFit {
            power: 0.0,
            depth: 0.0,
            duration_frac: 0.0,
            phase_center: 0.0,
        };
    }

    // Doubled prefix sums for circular box windows.
    let mut prefix_count = vec![0u64; 2 * nbins + 1];
    let mut prefix_sum = vec![0.0f64; 2 * nbins + 1];
    for i in 0..2 * nbins {
        prefix_count[i + 1] = prefix_count[i] + bin_count[i % nbins] as u64;
        prefix_sum[i + 1] = prefix_sum[i] + bin_sum[i % nbins];
    }

    let mut best = BoxFit {
        power: 0.0,
        depth: 0.0,
        duration_frac: 0.0,
        phase_center: 0.0,
    };
    for &q in duration_grid(period, config).iter() {
        let width = ((q * nbins as f64).round() as usize).clamp(1, nbins / 2);
        for start in 0..nbins {
            let in_count = (prefix_count[start + width] - prefix_count[start]) as f64;
            let out_count = total_count as f64 - in_count;
            if in_count < 1.0 || out_count < 1.0 {
                continue;
            }
            let in_sum = prefix_sum[start + width] - prefix_sum[start];
            let in_mean = in_sum / in_count;
            let out_mean = (total_sum - in_sum) / out_count;
            let depth = out_mean - in_mean;
            if depth <= 0.0 {
                continue;
            }
            let power = depth * in_count.sqrt() / sigma;
            if power > best.power {
                best = BoxFit {
                    power,
                    depth,
                    duration_frac: width as f64 / nbins as f64,
                    phase_center: ((start as f64 + width as f64 / 2.0) % nbins as f64)
                        / nbins as f64,
                };
            }
        }
    }
    best
}

/// Geometric grid of fractional transit durations for one trial period,
/// bounded both fractionally and in absolute hours.
fn duration_grid(period: f64, config: &PipelineConfig) -> Vec<f64> {
    let hours = period * 24.0;
    let lo = config
        .min_duration_frac
        .max(config.min_duration_hours / hours);
    let hi = config
        .max_duration_frac
        .min(config.max_duration_hours / hours)
        .max(lo);
    let n = config.duration_trials.max(1);
    if n == 1 || hi <= lo {
        return vec![lo];
    }
    let step = (hi / lo).powf(1.0 / (n - 1) as f64);
    let mut q = lo;
    let mut grid = Vec::with_capacity(n);
    for _ in 0..n {
        grid.push(q);
        q *= step;
    }
    grid
}

/// True when the larger period is a near-integer multiple of the smaller one
/// (including ratio 1: the same period within tolerance).
fn is_alias(a: f64, b: f64, tolerance: f64) -> bool {
    let (big, small) = if a >= b { (a, b) } else { (b, a) };
    if small <= 0.0 {
        return false;
    }
    let ratio = big / small;
    let m = ratio.round();
    m >= 1.0 && (ratio - m).abs() <= tolerance * m
}
