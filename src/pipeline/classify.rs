//! Candidate scoring: fold SNR, fit quality, and the vetting flags into a
//! single detection probability.
//!
//! The score is a weighted blend, not a trained model: SNR enters through a
//! soft saturation `snr / (snr + pivot)` so one loud signal cannot dominate
//! the other evidence, and any failed vetting flag caps the probability just
//! below the auto-accept cutoff so physics failures always reach a human or
//! get rejected, never silently accepted.

use crate::config::PipelineConfig;
use crate::models::Candidate;

/// Score one candidate in place, setting `probability`.
pub fn score(candidate: &mut Candidate, config: &PipelineConfig) {
    let snr_term = if candidate.snr > 0.0 {
        candidate.snr / (candidate.snr + config.snr_pivot)
    } else {
        0.0
    };
    let fit_term = candidate.fit_quality.clamp(0.0, 1.0);
    let flag_term = candidate.flags.passed_count() as f64 / 4.0;

    let mut probability = config.weight_snr * snr_term
        + config.weight_fit * fit_term
        + config.weight_flags * flag_term;
    probability = probability.clamp(0.0, 1.0);

    // Hard gate: a candidate with any failed physics check can never present
    // itself as auto-acceptable, regardless of how loud it is.
    if candidate.flags.failed_count() > 0 {
        let cap = (config.accept_threshold - config.gate_margin).max(0.0);
        probability = probability.min(cap);
    }

    candidate.probability = probability;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, ValidationFlags};

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn candidate(snr: f64, fit_quality: f64, flags: ValidationFlags) -> Candidate {
        let mut c = Candidate::from_box_search(3.0, 1.5, 0.001, 3.0, snr);
        c.fit_quality = fit_quality;
        c.flags = flags;
        c
    }

    #[test]
    fn test_strong_clean_candidate_scores_high() {
        let mut c = candidate(50.0, 0.95, ValidationFlags::all_passed());
        score(&mut c, &config());
        assert!(c.probability >= 0.8, "probability = {}", c.probability);
        assert!(c.probability <= 1.0);
    }

    #[test]
    fn test_weak_candidate_scores_low() {
        let mut c = candidate(3.0, 0.2, ValidationFlags::all_failed());
        score(&mut c, &config());
        assert!(c.probability < 0.5, "probability = {}", c.probability);
    }

    #[test]
    fn test_failed_flag_caps_below_accept_threshold() {
        let mut flags = ValidationFlags::all_passed();
        flags.odd_even_ok = false;
        // Arbitrarily loud signal with an excellent fit.
        let mut c = candidate(1.0e6, 1.0, flags);
        score(&mut c, &config());
        let cfg = config();
        assert!(
            c.probability <= cfg.accept_threshold - cfg.gate_margin + 1e-12,
            "probability = {}",
            c.probability
        );
    }

    #[test]
    fn test_snr_term_saturates() {
        let mut weak = candidate(7.0, 0.9, ValidationFlags::all_passed());
        let mut loud = candidate(700.0, 0.9, ValidationFlags::all_passed());
        score(&mut weak, &config());
        score(&mut loud, &config());
        assert!(loud.probability > weak.probability);
        // The SNR term alone contributes at most weight_snr.
        assert!(loud.probability - weak.probability < config().weight_snr);
    }

    #[test]
    fn test_monotone_in_flag_count() {
        let mut prev = -1.0;
        for passed in 0..=4 {
            let mut flags = ValidationFlags::all_failed();
            if passed > 0 {
                flags.odd_even_ok = true;
            }
            if passed > 1 {
                flags.secondary_ok = true;
            }
            if passed > 2 {
                flags.shape_ok = true;
            }
            if passed > 3 {
                flags.density_ok = true;
            }
            let mut c = candidate(20.0, 0.8, flags);
            score(&mut c, &config());
            assert!(
                c.probability >= prev,
                "probability dropped at {} passed flags",
                passed
            );
            prev = c.probability;
        }
    }

    #[test]
    fn test_non_positive_snr_contributes_nothing() {
        let mut c = candidate(0.0, 0.0, ValidationFlags::all_failed());
        score(&mut c, &config());
        assert_eq!(c.probability, 0.0);
    }
}
