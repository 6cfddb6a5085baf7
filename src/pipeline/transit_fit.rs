//! Transit model refinement.
//!
//! Each box proposal from the period search is refined against a
//! limb-darkened trapezoid model with a derivative-free Nelder-Mead
//! minimizer. Refinement is strictly best-effort: when the minimizer fails
//! to beat the plain box model within the iteration cap, the box estimates
//! are kept and the candidate's fit quality is degraded instead of erroring
//! the whole run.

use crate::config::PipelineConfig;
use crate::models::{Candidate, LightCurve};
use crate::pipeline::fold_offset;
use tracing::debug;

/// Free parameters of the trapezoid model, in fit order.
#[derive(Debug, Clone, Copy)]
struct TrapezoidParams {
    /// Epoch correction relative to the box estimate, days.
    t0_shift: f64,
    /// Central depth, flux fraction.
    depth: f64,
    /// Total first-to-fourth-contact duration, days.
    duration_days: f64,
    /// Ingress fraction: 0 is a pure box, 1 a pure V.
    ingress_frac: f64,
}

impl TrapezoidParams {
    fn from_vec(x: &[f64; 4]) -> Self {
        Self {
            t0_shift: x[0],
            depth: x[1],
            duration_days: x[2],
            ingress_frac: x[3],
        }
    }
}

/// Refine one candidate's ephemeris and depth in place.
///
/// On success the candidate's `t0_bjd`, `depth_ppm`, `duration_hours`, `snr`,
/// and `fit_quality` are replaced by the fitted values. On fallback the box
/// estimates survive with a halved fit quality.
pub fn refine(
    curve: &LightCurve,
    noise_sigma: f64,
    candidate: &mut Candidate,
    config: &PipelineConfig,
) {
    let period = candidate.period_days;
    let t0 = candidate.t0_bjd;
    let dur0 = candidate.duration_days();
    let depth0 = candidate.depth_frac();
    let sigma = noise_sigma.max(1e-12);

    // Work on a phase window around the transit, wide enough to anchor the
    // out-of-transit baseline on both sides.
    let mut dts = Vec::new();
    let mut flux = Vec::new();
    let mut errs = Vec::new();
    for i in 0..curve.len() {
        let dt = fold_offset(curve.time[i], period, t0);
        if dt.abs() <= 2.0 * dur0 {
            dts.push(dt);
            flux.push(curve.flux[i]);
            errs.push(curve.flux_err[i].max(1e-12));
        }
    }

    let chi2_box = chi_squared(&dts, &flux, &errs, |dt| {
        if dt.abs() < dur0 / 2.0 {
            1.0 - depth0
        } else {
            1.0
        }
    });
    let box_quality = quality_from_chi2(chi2_box, dts.len());

    if dts.len() < 8 {
        candidate.fit_quality = box_quality / 2.0;
        return;
    }

    let u = config.limb_darkening;
    let objective = |x: &[f64; 4]| -> f64 {
        let p = TrapezoidParams::from_vec(x);
        if p.t0_shift.abs() > dur0
            || p.depth <= 0.0
            || p.depth > 0.5
            || p.duration_days < dur0 / 4.0
            || p.duration_days > dur0 * 2.5
            || !(0.0..=1.0).contains(&p.ingress_frac)
        {
            return f64::INFINITY;
        }
        chi_squared(&dts, &flux, &errs, |dt| model_flux(dt, &p, u))
    };

    let start = [0.0, depth0, dur0, 0.2];
    let scale = [0.1 * dur0, 0.2 * depth0, 0.2 * dur0, 0.2];
    let (best, chi2_fit) = nelder_mead(&objective, start, scale, config.fit_max_iter);

    if !chi2_fit.is_finite() || chi2_fit >= chi2_box {
        debug!(
            period_days = period,
            chi2_box, chi2_fit, "trapezoid fit did not improve on box model"
        );
        candidate.fit_quality = box_quality / 2.0;
        return;
    }

    let fitted = TrapezoidParams::from_vec(&best);
    let n_in = dts
        .iter()
        .filter(|&&dt| (dt - fitted.t0_shift).abs() < fitted.duration_days / 2.0)
        .count();

    candidate.t0_bjd = t0 + fitted.t0_shift;
    candidate.depth_ppm = fitted.depth * 1.0e6;
    candidate.duration_hours = fitted.duration_days * 24.0;
    candidate.snr = fitted.depth * (n_in as f64).sqrt() / sigma;
    candidate.fit_quality = quality_from_chi2(chi2_fit, dts.len());
}

/// Limb-darkened trapezoid evaluated at a signed offset from transit center.
fn model_flux(dt: f64, p: &TrapezoidParams, u: f64) -> f64 {
    let half = p.duration_days / 2.0;
    let x = (dt - p.t0_shift).abs();
    if x >= half {
        return 1.0;
    }
    let flat = half * (1.0 - p.ingress_frac);
    let shape = if x <= flat {
        1.0
    } else {
        (half - x) / (half - flat).max(1e-12)
    };
    // Quadratic limb darkening, normalized so the depth parameter is the
    // disk-averaged depth rather than the center-of-disk one.
    let limb = (1.0 - u * (x / half) * (x / half)) / (1.0 - u / 3.0);
    1.0 - p.depth * shape * limb
}

fn chi_squared<M: Fn(f64) -> f64>(dts: &[f64], flux: &[f64], errs: &[f64], model: M) -> f64 {
    let mut chi2 = 0.0;
    for i in 0..dts.len() {
        let r = (flux[i] - model(dts[i])) / errs[i];
        chi2 += r * r;
    }
    chi2
}

/// Map a chi-squared to a [0, 1] quality score: 1.0 at or below the expected
/// reduced chi-squared of 1, decaying as the fit worsens.
fn quality_from_chi2(chi2: f64, n: usize) -> f64 {
    if n == 0 || !chi2.is_finite() {
        return 0.0;
    }
    let reduced = chi2 / n as f64;
    1.0 / (1.0 + (reduced - 1.0).max(0.0))
}

/// Standard Nelder-Mead simplex descent with reflection, expansion,
/// contraction, and shrink steps. Returns the best vertex and its value.
fn nelder_mead<F: Fn(&[f64; 4]) -> f64>(
    f: &F,
    start: [f64; 4],
    scale: [f64; 4],
    max_iter: usize,
) -> ([f64; 4], f64) {
    const ALPHA: f64 = 1.0; // reflection
    const GAMMA: f64 = 2.0; // expansion
    const RHO: f64 = 0.5; // contraction
    const SIGMA: f64 = 0.5; // shrink

    let mut simplex: Vec<([f64; 4], f64)> = Vec::with_capacity(5);
    simplex.push((start, f(&start)));
    for d in 0..4 {
        let mut v = start;
        v[d] += scale[d];
        simplex.push((v, f(&v)));
    }

    for _ in 0..max_iter {
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let best = simplex[0].1;
        let worst = simplex[4].1;
        if worst.is_finite() && (worst - best).abs() <= 1e-10 * (1.0 + best.abs()) {
            break;
        }

        // Centroid of all but the worst vertex.
        let mut centroid = [0.0; 4];
        for (v, _) in &simplex[..4] {
            for d in 0..4 {
                centroid[d] += v[d] / 4.0;
            }
        }

        let reflect = |coef: f64| -> [f64; 4] {
            let mut v = [0.0; 4];
            for d in 0..4 {
                v[d] = centroid[d] + coef * (centroid[d] - simplex[4].0[d]);
            }
            v
        };

        let xr = reflect(ALPHA);
        let fr = f(&xr);
        if fr < simplex[0].1 {
            let xe = reflect(GAMMA);
            let fe = f(&xe);
            simplex[4] = if fe < fr { (xe, fe) } else { (xr, fr) };
        } else if fr < simplex[3].1 {
            simplex[4] = (xr, fr);
        } else {
            let xc = reflect(-RHO);
            let fc = f(&xc);
            if fc < simplex[4].1 {
                simplex[4] = (xc, fc);
            } else {
                // Shrink toward the best vertex.
                let anchor = simplex[0].0;
                for entry in simplex.iter_mut().skip(1) {
                    for d in 0..4 {
                        entry.0[d] = anchor[d] + SIGMA * (entry.0[d] - anchor[d]);
                    }
                    entry.1 = f(&entry.0);
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    simplex[0]
}
