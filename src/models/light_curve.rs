//! Light curve domain model.
//!
//! A [`LightCurve`] is an ordered sequence of (time, flux, flux_uncertainty)
//! samples. Times are strictly increasing with no duplicate timestamps; gaps
//! are allowed. Once handed to the pipeline the curve is immutable.

use crate::pipeline::error::PipelineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A time series of stellar brightness measurements.
///
/// Times are in days (e.g. BJD), flux in arbitrary units prior to
/// preprocessing and normalized to ~1.0 afterwards. `flux_err` is either one
/// uncertainty per sample or empty (unknown, filled in by the preprocessor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurve {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
}

impl LightCurve {
    /// Build a validated light curve.
    ///
    /// Flux values may contain non-finite entries (the preprocessor drops
    /// them), but the time axis must be finite, strictly increasing, and free
    /// of duplicate timestamps.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidInput`] for structural problems; these
    /// are surfaced synchronously at submission, before any job exists.
    pub fn new(
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Option<Vec<f64>>,
    ) -> Result<Self, PipelineError> {
        if time.len() != flux.len() {
            return Err(PipelineError::InvalidInput(format!(
                "time/flux length mismatch: {} vs {}",
                time.len(),
                flux.len()
            )));
        }
        if time.len() < 2 {
            return Err(PipelineError::InvalidInput(
                "light curve must contain at least 2 samples".to_string(),
            ));
        }
        let flux_err = match flux_err {
            Some(err) => {
                if err.len() != time.len() {
                    return Err(PipelineError::InvalidInput(format!(
                        "flux_err length mismatch: {} vs {}",
                        err.len(),
                        time.len()
                    )));
                }
                err
            }
            None => Vec::new(),
        };
        for (i, t) in time.iter().enumerate() {
            if !t.is_finite() {
                return Err(PipelineError::InvalidInput(format!(
                    "non-finite timestamp at index {}",
                    i
                )));
            }
        }
        for w in time.windows(2) {
            if w[1] <= w[0] {
                return Err(PipelineError::InvalidInput(format!(
                    "time axis not strictly increasing at t={}",
                    w[1]
                )));
            }
        }
        Ok(Self {
            time,
            flux,
            flux_err,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Observed time span in days.
    pub fn span_days(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// SHA-256 fingerprint of the sample content.
    ///
    /// Used as a reproducibility aid: the same submitted series always hashes
    /// to the same hex digest, independent of JSON formatting.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.time.len() as u64).to_le_bytes());
        for value in self.time.iter().chain(&self.flux).chain(&self.flux_err) {
            hasher.update(value.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_curve() {
        let lc = LightCurve::new(vec![0.0, 1.0, 2.0], vec![1.0, 0.99, 1.01], None).unwrap();
        assert_eq!(lc.len(), 3);
        assert_eq!(lc.span_days(), 2.0);
        assert!(lc.flux_err.is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = LightCurve::new(vec![0.0, 1.0], vec![1.0], None).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let err =
            LightCurve::new(vec![0.0, 1.0, 1.0], vec![1.0, 1.0, 1.0], None).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_decreasing_time_rejected() {
        let err =
            LightCurve::new(vec![0.0, 2.0, 1.0], vec![1.0, 1.0, 1.0], None).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_non_finite_time_rejected() {
        let err =
            LightCurve::new(vec![0.0, f64::NAN, 2.0], vec![1.0, 1.0, 1.0], None).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_non_finite_flux_allowed() {
        // The preprocessor removes these; construction accepts them.
        let lc = LightCurve::new(vec![0.0, 1.0, 2.0], vec![1.0, f64::NAN, 1.0], None).unwrap();
        assert_eq!(lc.len(), 3);
    }

    #[test]
    fn test_checksum_stable_and_content_sensitive() {
        let a = LightCurve::new(vec![0.0, 1.0], vec![1.0, 0.999], None).unwrap();
        let b = LightCurve::new(vec![0.0, 1.0], vec![1.0, 0.999], None).unwrap();
        let c = LightCurve::new(vec![0.0, 1.0], vec![1.0, 0.998], None).unwrap();
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
        assert_eq!(a.checksum().len(), 64);
    }
}
