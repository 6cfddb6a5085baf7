//! Pipeline configuration and environment variable handling.
//!
//! Every numeric policy threshold used by the detection pipeline lives here,
//! so the stages themselves contain no hard-coded cutoffs. The defaults are
//! tuned for the ppm-to-percent transit depths the search targets; deployments
//! override them via a TOML file referenced by `RESONANT_CONFIG`.

use serde::Deserialize;
use std::env;
use std::path::Path;

/// Policy thresholds for one detection pipeline instance.
///
/// Loaded once at startup and shared immutably across jobs. Any field left
/// out of the TOML file keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // --- Preprocessor ---
    /// Upward outlier clip threshold in robust (MAD-scaled) sigmas.
    pub sigma_clip_high: f64,
    /// Downward clip threshold. Deliberately much wider than `sigma_clip_high`
    /// so genuine transit dips are never clipped away.
    pub sigma_clip_low: f64,
    /// Sliding-median detrend window, in hours. Must be long compared to a
    /// transit duration so short dips survive detrending.
    pub detrend_window_hours: f64,
    /// Minimum viable sample count after cleaning.
    pub min_points: usize,

    // --- Period search ---
    /// Relative step of the geometric trial-period grid.
    pub period_step_frac: f64,
    /// Hard cap on the number of trial periods.
    pub max_period_trials: usize,
    /// Number of phase bins used when folding each trial period.
    pub phase_bins: usize,
    /// Number of trial box widths per period.
    pub duration_trials: usize,
    /// Fractional transit duration (duration / period) search range.
    pub min_duration_frac: f64,
    pub max_duration_frac: f64,
    /// Absolute transit duration search range, in hours.
    pub min_duration_hours: f64,
    pub max_duration_hours: f64,
    /// Relative tolerance for treating two periods as integer-ratio aliases.
    pub alias_tolerance: f64,

    // --- Model fitter ---
    /// Quadratic limb-darkening coefficient for the transit bottom.
    pub limb_darkening: f64,
    /// Iteration cap for the Nelder-Mead refinement.
    pub fit_max_iter: usize,

    // --- Validation battery ---
    /// Odd/even depths must agree within this fraction of the mean depth.
    pub odd_even_depth_frac: f64,
    /// ...and within this many combined standard errors.
    pub odd_even_sigma: f64,
    /// Minimum in-transit points per parity group for the odd/even check.
    pub odd_even_min_points: usize,
    /// A phase-0.5 dip deeper than this many standard errors counts as a
    /// secondary eclipse.
    pub secondary_sigma: f64,
    /// Minimum points in the secondary-eclipse window.
    pub secondary_min_points: usize,
    /// Minimum in-transit points for the shape test.
    pub shape_min_points: usize,
    /// U-vs-V discriminating statistic must be at least this value to pass.
    pub shape_stat_threshold: f64,
    /// Plausible implied stellar density range, kg/m^3.
    pub density_min_kg_m3: f64,
    pub density_max_kg_m3: f64,

    // --- Classification & triage ---
    /// SNR soft-saturation pivot for the probability score.
    pub snr_pivot: f64,
    /// Probability weights for SNR, fit quality, and validation flags.
    pub weight_snr: f64,
    pub weight_fit: f64,
    pub weight_flags: f64,
    /// High-confidence probability cutoff for automatic acceptance.
    pub accept_threshold: f64,
    /// Any failed flag caps probability at `accept_threshold - gate_margin`.
    pub gate_margin: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sigma_clip_high: 5.0,
            sigma_clip_low: 30.0,
            detrend_window_hours: 24.0,
            min_points: 100,

            period_step_frac: 0.002,
            max_period_trials: 5000,
            phase_bins: 256,
            duration_trials: 8,
            min_duration_frac: 0.01,
            max_duration_frac: 0.10,
            min_duration_hours: 0.5,
            max_duration_hours: 12.0,
            alias_tolerance: 0.01,

            limb_darkening: 0.3,
            fit_max_iter: 300,

            odd_even_depth_frac: 0.5,
            odd_even_sigma: 3.0,
            odd_even_min_points: 3,
            secondary_sigma: 3.0,
            secondary_min_points: 5,
            shape_min_points: 8,
            shape_stat_threshold: 0.0,
            density_min_kg_m3: 50.0,
            density_max_kg_m3: 50_000.0,

            snr_pivot: 7.0,
            weight_snr: 0.5,
            weight_fit: 0.2,
            weight_flags: 0.3,
            accept_threshold: 0.8,
            gate_margin: 0.05,
        }
    }
}

impl PipelineConfig {
    /// Load the configuration from the environment.
    ///
    /// # Environment Variables
    /// - `RESONANT_CONFIG` (optional): path to a TOML file overriding any
    ///   subset of the defaults.
    ///
    /// # Errors
    /// Returns an error if the referenced file is unreadable or malformed.
    pub fn from_env() -> Result<Self, String> {
        match env::var("RESONANT_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load the configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        Self::from_toml_str(&contents)
    }

    /// Parse the configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(contents).map_err(|e| format!("Invalid pipeline config: {}", e))?;
        config.validate()
    }

    /// Reject override values the pipeline cannot run with.
    pub fn validate(self) -> Result<Self, String> {
        if self.phase_bins < 2 {
            return Err(format!(
                "phase_bins must be at least 2, got {}",
                self.phase_bins
            ));
        }
        if self.duration_trials == 0 {
            return Err("duration_trials must be at least 1".to_string());
        }
        if self.max_period_trials < 2 {
            return Err(format!(
                "max_period_trials must be at least 2, got {}",
                self.max_period_trials
            ));
        }
        if !(self.period_step_frac > 0.0 && self.period_step_frac.is_finite()) {
            return Err(format!(
                "period_step_frac must be a positive number, got {}",
                self.period_step_frac
            ));
        }
        if !(self.min_duration_frac > 0.0 && self.min_duration_frac <= self.max_duration_frac) {
            return Err(format!(
                "duration fraction range [{}, {}] is invalid",
                self.min_duration_frac, self.max_duration_frac
            ));
        }
        Ok(self)
    }
}
