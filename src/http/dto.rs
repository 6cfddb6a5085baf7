//! Data Transfer Objects for the HTTP API.
//!
//! These DTOs are used for request/response serialization in the REST API.
//! Field names on the status and results responses (`progress_pct`,
//! `current_step`, the candidate fields) are consumed verbatim by downstream
//! report tooling and are part of the external contract.

use serde::{Deserialize, Serialize};

use crate::api::JobId;
pub use crate::models::{Candidate, RunParameters, TriageAction, ValidationFlags};
use crate::services::run_processor::RunSummary;

/// Request body for submitting a detection run.
///
/// Run parameters are flattened into the top level, so a minimal submission
/// looks like
/// `{"min_period_days": 0.5, "max_period_days": 10.0, "light_curve": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(flatten)]
    pub parameters: RunParameters,
    /// Raw light curve to search.
    pub light_curve: LightCurveDto,
}

/// Raw light-curve payload: parallel sample arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveDto {
    /// Sample times in days (e.g. BJD).
    pub time: Vec<f64>,
    /// Brightness per sample, arbitrary units.
    pub flux: Vec<f64>,
    /// Optional per-sample uncertainties, same length as `flux`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flux_err: Option<Vec<f64>>,
}

/// Response for run submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// Job ID for tracking the async run
    pub job_id: JobId,
    /// Initial job status (`queued`)
    pub status: String,
}

/// Status polling response for an async run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: JobId,
    /// `queued`, `running`, `completed`, or `failed`
    pub status: crate::services::job_tracker::JobStatus,
    /// Completion percentage, 0..=100
    pub progress_pct: u8,
    /// Current pipeline stage label
    pub current_step: String,
    /// Most recent human-readable progress message, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure message when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Results response for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub job_id: JobId,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::job_tracker::JobStatus;

    #[test]
    fn test_run_request_flattened_parameters() {
        let request: RunRequest = serde_json::from_str(
            r#"{
                "min_period_days": 0.5,
                "max_period_days": 3.0,
                "min_snr": 3.0,
                "max_candidates": 5,
                "light_curve": {"time": [0.0, 0.02], "flux": [1.0, 0.999]}
            }"#,
        )
        .unwrap();
        assert_eq!(request.parameters.min_period_days, 0.5);
        assert_eq!(request.parameters.min_snr, 3.0);
        assert!(request.light_curve.flux_err.is_none());
    }

    #[test]
    fn test_status_response_contract_fields() {
        let response = StatusResponse {
            job_id: JobId::new("j"),
            status: JobStatus::Running,
            progress_pct: 42,
            current_step: "bls_search".into(),
            message: Some("Searching trial periods".into()),
            error: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        let obj = value.as_object().unwrap();
        // The ID newtype serializes as a bare string.
        assert_eq!(obj["job_id"], "j");
        assert_eq!(obj["status"], "running");
        assert_eq!(obj["progress_pct"], 42);
        assert_eq!(obj["current_step"], "bls_search");
        // Absent unless the job failed.
        assert!(!obj.contains_key("error"));
    }

    #[test]
    fn test_results_response_flattens_summary() {
        let response = ResultsResponse {
            job_id: JobId::new("j"),
            summary: RunSummary::empty("No significant transit signals found"),
        };
        let value = serde_json::to_value(&response).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("job_id"));
        assert!(obj.contains_key("candidates"));
        assert!(obj.contains_key("total_candidates"));
        assert!(obj.contains_key("accepted_count"));
        assert!(obj.contains_key("rejected_count"));
        assert!(obj.contains_key("human_review_count"));
        assert!(obj.contains_key("message"));
    }
}
