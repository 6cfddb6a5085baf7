//! Candidate transit signals and their vetting state.
//!
//! The serialized field names (`period_days`, `t0_bjd`, `depth_ppm`,
//! `duration_hours`, `snr`, `probability`, `flags`, `rl_action`) are a stable
//! external contract consumed by downstream report tooling and must not be
//! renamed.

use serde::{Deserialize, Serialize};

/// Final triage disposition for a candidate.
///
/// `Pending` exists only while the pipeline is still enriching the candidate;
/// every candidate exposed at the boundary carries a terminal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageAction {
    Pending,
    Accept,
    Reject,
    HumanReview,
}

impl TriageAction {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TriageAction::Pending)
    }
}

/// The four physics vetting flags, in a fixed-size record.
///
/// The set of checks is closed and each flag has a specific downstream
/// meaning, so this is a struct rather than a dynamic map. `true` always
/// means "the check passed" (consistent with a planetary origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFlags {
    /// Odd- and even-numbered transit depths agree.
    pub odd_even_ok: bool,
    /// No significant dip at orbital phase 0.5.
    pub secondary_ok: bool,
    /// Transit profile is closer to the flat-bottomed planetary template
    /// than to a V-shaped grazing-binary profile.
    pub shape_ok: bool,
    /// Implied stellar density falls in a physically plausible range.
    pub density_ok: bool,
}

impl ValidationFlags {
    /// All checks failed; used as the graceful-degradation floor.
    pub fn all_failed() -> Self {
        Self {
            odd_even_ok: false,
            secondary_ok: false,
            shape_ok: false,
            density_ok: false,
        }
    }

    pub fn all_passed() -> Self {
        Self {
            odd_even_ok: true,
            secondary_ok: true,
            shape_ok: true,
            density_ok: true,
        }
    }

    /// Number of checks that passed (0..=4).
    pub fn passed_count(&self) -> usize {
        [
            self.odd_even_ok,
            self.secondary_ok,
            self.shape_ok,
            self.density_ok,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count()
    }

    /// Number of checks that failed (0..=4).
    pub fn failed_count(&self) -> usize {
        4 - self.passed_count()
    }
}

/// A single proposed transit signal.
///
/// Created by the period search as a raw box proposal, refined in place by
/// the fitter, vetting battery, and classifier, and finalized by the triage
/// policy. Never mutated after the owning job reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Orbital period, days.
    pub period_days: f64,
    /// Reference epoch: time of first transit center, same time system as
    /// the input light curve.
    pub t0_bjd: f64,
    /// Transit depth, parts per million.
    pub depth_ppm: f64,
    /// Transit duration, hours.
    pub duration_hours: f64,
    /// Detection signal-to-noise ratio.
    pub snr: f64,
    /// Detection probability in [0, 1]; 0.0 until classified.
    pub probability: f64,
    /// Goodness-of-fit score in [0, 1]; degraded when the model fit fails to
    /// converge and the box estimate is retained.
    pub fit_quality: f64,
    /// Physics vetting flag vector.
    pub flags: ValidationFlags,
    /// Final triage action.
    pub rl_action: TriageAction,
}

impl Candidate {
    /// Build a raw proposal from box-search estimates (depth as a flux
    /// fraction). Vetting fields start at their pre-enrichment values.
    pub fn from_box_search(
        period_days: f64,
        t0_bjd: f64,
        depth_frac: f64,
        duration_hours: f64,
        snr: f64,
    ) -> Self {
        Self {
            period_days,
            t0_bjd,
            depth_ppm: depth_frac * 1.0e6,
            duration_hours,
            snr,
            probability: 0.0,
            fit_quality: 0.0,
            flags: ValidationFlags::all_failed(),
            rl_action: TriageAction::Pending,
        }
    }

    /// Transit depth as a flux fraction.
    pub fn depth_frac(&self) -> f64 {
        self.depth_ppm / 1.0e6
    }

    /// Transit duration in days.
    pub fn duration_days(&self) -> f64 {
        self.duration_hours / 24.0
    }
}
