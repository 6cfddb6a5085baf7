//! Physics vetting battery: four independent checks against the fitted
//! candidate.
//!
//! All four checks always run (no short-circuiting) because the classifier
//! consumes the full flag vector. Each check degrades gracefully to a failed
//! flag when its required inputs are absent; the battery itself never errors.

use crate::config::PipelineConfig;
use crate::models::{Candidate, LightCurve, ValidationFlags};
use crate::pipeline::{fold_offset, transit_index};
use tracing::debug;

const GRAVITATIONAL_CONSTANT: f64 = 6.674e-11; // m^3 kg^-1 s^-2
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Run all four checks and return the complete flag vector.
pub fn vet(
    curve: &LightCurve,
    noise_sigma: f64,
    candidate: &Candidate,
    config: &PipelineConfig,
) -> ValidationFlags {
    let flags = ValidationFlags {
        odd_even_ok: odd_even_consistent(curve, noise_sigma, candidate, config),
        secondary_ok: secondary_absent(curve, noise_sigma, candidate, config),
        shape_ok: shape_is_u(curve, candidate, config),
        density_ok: density_plausible(candidate, config),
    };
    debug!(
        period_days = candidate.period_days,
        odd_even_ok = flags.odd_even_ok,
        secondary_ok = flags.secondary_ok,
        shape_ok = flags.shape_ok,
        density_ok = flags.density_ok,
        "validation battery complete"
    );
    flags
}

/// Depths measured from odd-numbered and even-numbered transits must agree,
/// both in absolute terms and in combined standard errors. A significant
/// mismatch is the signature of a blended eclipsing binary detected at half
/// its true period.
fn odd_even_consistent(
    curve: &LightCurve,
    noise_sigma: f64,
    candidate: &Candidate,
    config: &PipelineConfig,
) -> bool {
    let period = candidate.period_days;
    let t0 = candidate.t0_bjd;
    let half_dur = candidate.duration_days() / 2.0;

    let mut odd = Vec::new();
    let mut even = Vec::new();
    for (t, f) in curve.time.iter().zip(&curve.flux) {
        if fold_offset(*t, period, t0).abs() < half_dur {
            if transit_index(*t, period, t0) % 2 == 0 {
                even.push(*f);
            } else {
                odd.push(*f);
            }
        }
    }
    if odd.len() < config.odd_even_min_points || even.len() < config.odd_even_min_points {
        return false;
    }

    let depth_odd = 1.0 - mean(&odd);
    let depth_even = 1.0 - mean(&even);
    let diff = (depth_odd - depth_even).abs();

    let tolerance = config.odd_even_depth_frac * candidate.depth_frac().abs();
    let se_combined = noise_sigma
        * (1.0 / odd.len() as f64 + 1.0 / even.len() as f64)
            .sqrt()
            .max(1e-12);

    diff <= tolerance && diff <= config.odd_even_sigma * se_combined
}

/// The flux in a window at orbital phase 0.5 must show no dip beyond the
/// noise floor. A significant secondary eclipse means the companion is
/// self-luminous.
fn secondary_absent(
    curve: &LightCurve,
    noise_sigma: f64,
    candidate: &Candidate,
    config: &PipelineConfig,
) -> bool {
    let period = candidate.period_days;
    // Center the window on the point opposite the primary transit.
    let t_secondary = candidate.t0_bjd + period / 2.0;
    let half_dur = candidate.duration_days() / 2.0;

    let mut window = Vec::new();
    for (t, f) in curve.time.iter().zip(&curve.flux) {
        if fold_offset(*t, period, t_secondary).abs() < half_dur {
            window.push(*f);
        }
    }
    if window.len() < config.secondary_min_points {
        return false;
    }

    let depth = 1.0 - mean(&window);
    let se = (noise_sigma / (window.len() as f64).sqrt()).max(1e-12);
    depth <= config.secondary_sigma * se
}

/// Compare the in-transit profile against a flat-bottomed (U) template and a
/// triangular (V) template, each with its own least-squares amplitude. The
/// discriminating statistic is positive when the U template fits better.
fn shape_is_u(curve: &LightCurve, candidate: &Candidate, config: &PipelineConfig) -> bool {
    let period = candidate.period_days;
    let t0 = candidate.t0_bjd;
    let half_dur = candidate.duration_days() / 2.0;
    if half_dur <= 0.0 {
        return false;
    }

    let mut offsets = Vec::new();
    let mut dips = Vec::new();
    for (t, f) in curve.time.iter().zip(&curve.flux) {
        let dt = fold_offset(*t, period, t0);
        if dt.abs() < half_dur {
            offsets.push(dt);
            dips.push(1.0 - f);
        }
    }
    if offsets.len() < config.shape_min_points {
        return false;
    }

    let u_template: Vec<f64> = offsets.iter().map(|_| 1.0).collect();
    let v_template: Vec<f64> = offsets
        .iter()
        .map(|dt| 1.0 - dt.abs() / half_dur)
        .collect();

    let chi2_u = template_residual(&dips, &u_template);
    let chi2_v = template_residual(&dips, &v_template);
    let total = chi2_u + chi2_v;
    if !(total.is_finite() && total > 0.0) {
        return false;
    }
    (chi2_v - chi2_u) / total >= config.shape_stat_threshold
}

/// Residual sum of squares after fitting the template's amplitude by least
/// squares.
fn template_residual(dips: &[f64], template: &[f64]) -> f64 {
    let ss: f64 = template.iter().map(|s| s * s).sum();
    let amplitude = if ss > 0.0 {
        dips.iter().zip(template).map(|(d, s)| d * s).sum::<f64>() / ss
    } else {
        0.0
    };
    dips.iter()
        .zip(template)
        .map(|(d, s)| {
            let r = d - amplitude * s;
            r * r
        })
        .sum()
}

/// The stellar density implied by the fitted period and duration must fall
/// in a plausible range for a dwarf host. A central transit has
/// `a/R* = P / (pi * T)`, and Kepler's third law then gives
/// `rho = 3 pi / (G P^2) * (a/R*)^3`. Wildly implausible densities usually
/// mean the period is an alias of the true one.
fn density_plausible(candidate: &Candidate, config: &PipelineConfig) -> bool {
    let period_s = candidate.period_days * SECONDS_PER_DAY;
    let duration_days = candidate.duration_days();
    if !(period_s > 0.0 && duration_days > 0.0) {
        return false;
    }
    let a_over_rs = candidate.period_days / (std::f64::consts::PI * duration_days);
    let density = 3.0 * std::f64::consts::PI / (GRAVITATIONAL_CONSTANT * period_s * period_s)
        * a_over_rs.powi(3);
    density.is_finite()
        && density >= config.density_min_kg_m3
        && density <= config.density_max_kg_m3
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LightCurve;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn candidate(period: f64, t0: f64, depth_ppm: f64, dur_hours: f64) -> Candidate {
        let mut c = Candidate::from_box_search(period, t0, depth_ppm * 1e-6, dur_hours, 20.0);
        c.fit_quality = 0.9;
        c
    }

    /// Box-dip curve where odd and even transits can have different depths
    /// and an optional secondary eclipse at phase 0.5.
    fn build_curve(
        period: f64,
        t0: f64,
        depth_even: f64,
        depth_odd: f64,
        dur_days: f64,
        secondary_depth: f64,
        v_shaped: bool,
    ) -> LightCurve {
        let n = 3000;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.02).collect();
        let half = dur_days / 2.0;
        let flux: Vec<f64> = time
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let jitter = 2.0e-5 * ((i * 7919 % 1000) as f64 / 1000.0 - 0.5);
                let dt = fold_offset(*t, period, t0);
                let mut f = 1.0 + jitter;
                if dt.abs() < half {
                    let depth = if transit_index(*t, period, t0) % 2 == 0 {
                        depth_even
                    } else {
                        depth_odd
                    };
                    let shape = if v_shaped { 1.0 - dt.abs() / half } else { 1.0 };
                    f -= depth * shape;
                }
                let dt_sec = fold_offset(*t, period, t0 + period / 2.0);
                if dt_sec.abs() < half {
                    f -= secondary_depth;
                }
                f
            })
            .collect();
        LightCurve::new(time, flux, None).unwrap()
    }

    #[test]
    fn test_clean_planet_passes_all() {
        let lc = build_curve(3.0, 1.5, 0.001, 0.001, 0.125, 0.0, false);
        let cand = candidate(3.0, 1.5, 1000.0, 3.0);
        let flags = vet(&lc, 2.0e-5, &cand, &config());
        assert!(flags.odd_even_ok);
        assert!(flags.secondary_ok);
        assert!(flags.shape_ok);
        assert!(flags.density_ok);
    }

    #[test]
    fn test_alternating_depths_fail_odd_even() {
        let lc = build_curve(3.0, 1.5, 0.001, 0.0016, 0.125, 0.0, false);
        let cand = candidate(3.0, 1.5, 1300.0, 3.0);
        let flags = vet(&lc, 2.0e-5, &cand, &config());
        assert!(!flags.odd_even_ok);
    }

    #[test]
    fn test_secondary_eclipse_detected() {
        let lc = build_curve(3.0, 1.5, 0.001, 0.001, 0.125, 0.0005, false);
        let cand = candidate(3.0, 1.5, 1000.0, 3.0);
        let flags = vet(&lc, 2.0e-5, &cand, &config());
        assert!(!flags.secondary_ok);
        // The other checks are unaffected.
        assert!(flags.odd_even_ok);
    }

    #[test]
    fn test_v_shaped_profile_fails_shape() {
        let lc = build_curve(3.0, 1.5, 0.002, 0.002, 0.25, 0.0, true);
        let cand = candidate(3.0, 1.5, 2000.0, 6.0);
        let flags = vet(&lc, 2.0e-5, &cand, &config());
        assert!(!flags.shape_ok);
    }

    #[test]
    fn test_implausible_density_fails() {
        // A 10-day period with a 20-hour transit implies a far-too-fluffy
        // star.
        let cand = candidate(10.0, 1.5, 1000.0, 20.0);
        assert!(!density_plausible(&cand, &config()));
        // A hot-Jupiter-like geometry is fine.
        let cand = candidate(3.0, 1.5, 1000.0, 3.0);
        assert!(density_plausible(&cand, &config()));
    }

    #[test]
    fn test_insufficient_data_degrades_to_false() {
        // Sparse sampling: no in-transit points at all.
        let time: Vec<f64> = (0..150).map(|i| 0.7 + i as f64 * 3.0).collect();
        let flux = vec![1.0; 150];
        let lc = LightCurve::new(time, flux, None).unwrap();
        let cand = candidate(3.0, 1.5, 1000.0, 3.0);
        let flags = vet(&lc, 1e-4, &cand, &config());
        assert!(!flags.odd_even_ok);
        assert!(!flags.secondary_ok);
        assert!(!flags.shape_ok);
        // Density needs no light-curve data and still passes.
        assert!(flags.density_ok);
    }
}
