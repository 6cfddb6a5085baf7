//! Run parameters for one detection job.

use crate::pipeline::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Configuration for one detection run, supplied once at submission and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParameters {
    /// Shortest trial period, days.
    pub min_period_days: f64,
    /// Longest trial period, days.
    pub max_period_days: f64,
    /// Significance floor: minimum acceptable detection SNR.
    #[serde(default = "default_min_snr")]
    pub min_snr: f64,
    /// Maximum number of candidates to return.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Optional upstream dataset reference, echoed back to the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

fn default_min_snr() -> f64 {
    7.0
}

fn default_max_candidates() -> usize {
    5
}

impl RunParameters {
    /// Validate the parameter bounds.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidInput`] for out-of-range bounds; run
    /// submission surfaces these synchronously and never creates a job.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.min_period_days.is_finite() || self.min_period_days <= 0.0 {
            return Err(PipelineError::InvalidInput(format!(
                "min_period_days must be positive, got {}",
                self.min_period_days
            )));
        }
        if !self.max_period_days.is_finite() || self.max_period_days <= self.min_period_days {
            return Err(PipelineError::InvalidInput(format!(
                "max_period_days ({}) must exceed min_period_days ({})",
                self.max_period_days, self.min_period_days
            )));
        }
        if !self.min_snr.is_finite() || self.min_snr <= 0.0 {
            return Err(PipelineError::InvalidInput(format!(
                "min_snr must be positive, got {}",
                self.min_snr
            )));
        }
        if self.max_candidates == 0 {
            return Err(PipelineError::InvalidInput(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RunParameters {
        RunParameters {
            min_period_days: 0.5,
            max_period_days: 10.0,
            min_snr: 7.0,
            max_candidates: 5,
            dataset_id: None,
        }
    }

    #[test]
    fn test_valid_params() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut p = params();
        p.max_period_days = 0.4;
        assert!(matches!(
            p.validate().unwrap_err(),
            PipelineError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_equal_bounds_rejected() {
        let mut p = params();
        p.max_period_days = p.min_period_days;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_zero_max_candidates_rejected() {
        let mut p = params();
        p.max_candidates = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let p: RunParameters = serde_json::from_str(
            r#"{"min_period_days": 1.0, "max_period_days": 5.0}"#,
        )
        .unwrap();
        assert_eq!(p.min_snr, 7.0);
        assert_eq!(p.max_candidates, 5);
        assert!(p.dataset_id.is_none());
    }
}
