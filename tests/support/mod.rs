//! Shared helpers for integration tests: seeded noise and synthetic light
//! curves with injected signals.

use resonant_rust::models::LightCurve;

/// Deterministic pseudo-random source (64-bit LCG). Tests must be exactly
/// reproducible, so no OS entropy is ever involved.
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).max(1),
        }
    }

    /// Uniform sample in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Standard normal sample via Box-Muller.
    pub fn gaussian(&mut self) -> f64 {
        let u1 = self.uniform().max(1e-12);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Parameters of one injected transit train.
#[derive(Debug, Clone, Copy)]
pub struct Injection {
    pub period_days: f64,
    pub t0_days: f64,
    /// Central depth as a flux fraction.
    pub depth: f64,
    pub duration_days: f64,
    /// When true the dip is V-shaped (triangular) instead of box-shaped.
    pub v_shaped: bool,
    /// Depth of odd-numbered transits; equal to `depth` for a planet-like
    /// signal.
    pub depth_odd: f64,
}

impl Injection {
    pub fn box_transit(period_days: f64, t0_days: f64, depth: f64, duration_days: f64) -> Self {
        Self {
            period_days,
            t0_days,
            depth,
            duration_days,
            v_shaped: false,
            depth_odd: depth,
        }
    }
}

/// Build a light curve of evenly sampled Gaussian noise with zero or more
/// injected transit trains.
pub fn synthetic_curve(
    span_days: f64,
    cadence_days: f64,
    noise_sigma: f64,
    seed: u64,
    injections: &[Injection],
) -> LightCurve {
    let n = (span_days / cadence_days) as usize;
    let mut rng = SeededRng::new(seed);
    let time: Vec<f64> = (0..n).map(|i| i as f64 * cadence_days).collect();
    let flux: Vec<f64> = time
        .iter()
        .map(|t| {
            let mut f = 1.0 + noise_sigma * rng.gaussian();
            for inj in injections {
                let cycles = (t - inj.t0_days) / inj.period_days;
                let index = cycles.round();
                let dt = (cycles - index) * inj.period_days;
                let half = inj.duration_days / 2.0;
                if dt.abs() < half {
                    let depth = if (index as i64) % 2 == 0 {
                        inj.depth
                    } else {
                        inj.depth_odd
                    };
                    let shape = if inj.v_shaped {
                        1.0 - dt.abs() / half
                    } else {
                        1.0
                    };
                    f -= depth * shape;
                }
            }
            f
        })
        .collect();
    LightCurve::new(time, flux, None).expect("synthetic curve is structurally valid")
}

/// Plain noise with no injected signal.
pub fn noise_curve(span_days: f64, cadence_days: f64, noise_sigma: f64, seed: u64) -> LightCurve {
    synthetic_curve(span_days, cadence_days, noise_sigma, seed, &[])
}
