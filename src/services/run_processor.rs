//! Asynchronous detection run driver.
//!
//! Sequences the six pipeline stages for one job on a blocking worker thread,
//! emitting stage/progress updates and human-readable logs to the job
//! tracker. Jobs are independent: each run owns its light curve and shares
//! only the immutable pipeline configuration.

use crate::api::JobId;
use crate::config::PipelineConfig;
use crate::models::{Candidate, LightCurve, RunParameters, TriageAction};
use crate::pipeline::{bls, classify, preprocess, transit_fit, triage, validation};
use crate::pipeline::{PipelineError, PipelineResult};
use crate::services::job_tracker::{JobTracker, LogLevel};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

/// Final output of one completed run.
///
/// Serialized field names are part of the external results contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Candidates ordered by probability descending.
    pub candidates: Vec<Candidate>,
    pub total_candidates: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub human_review_count: usize,
    /// One-line human-readable outcome.
    pub message: String,
    /// Upstream dataset reference echoed from the submission, when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

impl RunSummary {
    /// Summary for a run that found nothing.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            candidates: Vec::new(),
            total_candidates: 0,
            accepted_count: 0,
            rejected_count: 0,
            human_review_count: 0,
            message: message.into(),
            dataset_id: None,
        }
    }

    /// Build the summary from a finalized candidate list.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        let accepted = count_action(&candidates, TriageAction::Accept);
        let rejected = count_action(&candidates, TriageAction::Reject);
        let review = count_action(&candidates, TriageAction::HumanReview);
        let message = if candidates.is_empty() {
            "No significant transit signals found".to_string()
        } else {
            format!(
                "Detected {} candidate(s): {} accepted, {} rejected, {} for human review",
                candidates.len(),
                accepted,
                rejected,
                review
            )
        };
        Self {
            total_candidates: candidates.len(),
            accepted_count: accepted,
            rejected_count: rejected,
            human_review_count: review,
            message,
            dataset_id: None,
            candidates,
        }
    }
}

fn count_action(candidates: &[Candidate], action: TriageAction) -> usize {
    candidates
        .iter()
        .filter(|c| c.rl_action == action)
        .count()
}

/// Run the full detection pipeline synchronously.
///
/// Pure with respect to its inputs: identical curve, parameters, and
/// configuration produce a bit-identical candidate list. `on_stage` is
/// invoked with a stage label and progress percentage as the run advances.
///
/// # Errors
/// Input and data-sufficiency errors propagate; a no-signal search outcome is
/// mapped to an empty candidate list, not an error.
pub fn run_pipeline(
    curve: &LightCurve,
    params: &RunParameters,
    config: &PipelineConfig,
    mut on_stage: impl FnMut(&str, u8),
) -> PipelineResult<Vec<Candidate>> {
    params.validate()?;

    on_stage("preprocessing", 10);
    let prepared = preprocess::preprocess(curve, config)?;
    on_stage("preprocessing", 25);

    on_stage("bls_search", 30);
    let mut candidates =
        match bls::search(&prepared.curve, prepared.noise_sigma, params, config) {
            Ok(candidates) => candidates,
            Err(PipelineError::NoSignalFound) => Vec::new(),
            Err(e) => return Err(e),
        };
    on_stage("bls_search", 60);

    on_stage("candidate_analysis", 65);
    let total = candidates.len().max(1);
    for (i, candidate) in candidates.iter_mut().enumerate() {
        transit_fit::refine(&prepared.curve, prepared.noise_sigma, candidate, config);
        candidate.flags =
            validation::vet(&prepared.curve, prepared.noise_sigma, candidate, config);
        classify::score(candidate, config);
        let pct = 65 + (30 * (i + 1) / total) as u8;
        on_stage("candidate_analysis", pct.min(95));
    }
    triage::apply(&mut candidates, config);

    // Ranking contract: probability descending, then SNR descending, then
    // period ascending as a deterministic final tiebreak.
    candidates.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
            .then(b.snr.partial_cmp(&a.snr).unwrap_or(Ordering::Equal))
            .then(
                a.period_days
                    .partial_cmp(&b.period_days)
                    .unwrap_or(Ordering::Equal),
            )
    });

    Ok(candidates)
}

/// Process a detection run asynchronously.
///
/// This function is designed to be spawned as a background task. It logs
/// progress to the job tracker so callers can follow along via polling or
/// SSE, and reports the outcome only through the tracker's terminal states.
pub async fn process_run_async(
    job_id: JobId,
    tracker: JobTracker,
    config: Arc<PipelineConfig>,
    curve: LightCurve,
    params: RunParameters,
) -> Result<RunSummary, String> {
    tracker.set_stage(job_id.value(), "loading", 5);
    tracker.log(
        job_id.value(),
        LogLevel::Info,
        format!(
            "Loaded light curve: {} samples over {:.2} days (sha256 {})",
            curve.len(),
            curve.span_days(),
            &curve.checksum()[..12]
        ),
    );

    let dataset_id = params.dataset_id.clone();
    let result = tokio::task::spawn_blocking({
        let tracker = tracker.clone();
        let job_id = job_id.clone();
        move || {
            run_pipeline(&curve, &params, &config, |stage, pct| {
                tracker.set_stage(job_id.value(), stage, pct);
            })
        }
    })
    .await;

    let candidates = settle_blocking_result(&job_id, &tracker, result)?;

    for candidate in &candidates {
        tracker.log(
            job_id.value(),
            LogLevel::Info,
            format!(
                "Candidate P={:.4} d, depth={:.0} ppm, SNR={:.1}, p={:.3} -> {:?}",
                candidate.period_days,
                candidate.depth_ppm,
                candidate.snr,
                candidate.probability,
                candidate.rl_action
            ),
        );
    }

    let mut summary = RunSummary::from_candidates(candidates);
    summary.dataset_id = dataset_id;
    info!(
        job_id = %job_id,
        total = summary.total_candidates,
        accepted = summary.accepted_count,
        "detection run complete"
    );
    tracker.log(job_id.value(), LogLevel::Success, summary.message.clone());
    tracker.complete_job(job_id.value(), summary.clone());

    Ok(summary)
}

/// Resolve the blocking pipeline task's outcome. Pipeline errors and task
/// panics both fail the job with a captured message; partial results are
/// never exposed.
fn settle_blocking_result(
    job_id: &JobId,
    tracker: &JobTracker,
    result: Result<PipelineResult<Vec<Candidate>>, tokio::task::JoinError>,
) -> Result<Vec<Candidate>, String> {
    match result {
        Ok(Ok(candidates)) => Ok(candidates),
        Ok(Err(e)) => {
            let msg = format!("Pipeline failed: {}", e);
            warn!(job_id = %job_id, error = %e, "detection run failed");
            tracker.fail_job(job_id.value(), &msg);
            Err(msg)
        }
        Err(e) => {
            let msg = format!("Pipeline task panic: {}", e);
            warn!(job_id = %job_id, "detection run panicked");
            tracker.fail_job(job_id.value(), &msg);
            Err(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationFlags;

    fn candidate(probability: f64, snr: f64, action: TriageAction) -> Candidate {
        let mut c = Candidate::from_box_search(3.0, 1.5, 0.001, 3.0, snr);
        c.probability = probability;
        c.flags = ValidationFlags::all_passed();
        c.rl_action = action;
        c
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_candidates(vec![
            candidate(0.9, 20.0, TriageAction::Accept),
            candidate(0.7, 12.0, TriageAction::HumanReview),
            candidate(0.2, 8.0, TriageAction::Reject),
            candidate(0.1, 7.0, TriageAction::Reject),
        ]);
        assert_eq!(summary.total_candidates, 4);
        assert_eq!(summary.accepted_count, 1);
        assert_eq!(summary.rejected_count, 2);
        assert_eq!(summary.human_review_count, 1);
        assert!(summary.message.contains("4 candidate(s)"));
    }

    #[test]
    fn test_empty_summary_message() {
        let summary = RunSummary::from_candidates(Vec::new());
        assert_eq!(summary.total_candidates, 0);
        assert_eq!(summary.message, "No significant transit signals found");
    }

    #[test]
    fn test_summary_contract_field_names() {
        let summary = RunSummary::from_candidates(Vec::new());
        let value = serde_json::to_value(&summary).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "candidates",
            "total_candidates",
            "accepted_count",
            "rejected_count",
            "human_review_count",
            "message",
        ] {
            assert!(obj.contains_key(key), "missing contract field {}", key);
        }
    }

    #[test]
    fn test_summary_echoes_dataset_id() {
        let mut summary = RunSummary::from_candidates(Vec::new());
        summary.dataset_id = Some("kepler-10".to_string());
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["dataset_id"], "kepler-10");

        // Absent from the payload when the submission carried none.
        let bare = serde_json::to_value(RunSummary::from_candidates(Vec::new())).unwrap();
        assert!(!bare.as_object().unwrap().contains_key("dataset_id"));
    }

    #[tokio::test]
    async fn test_panicked_task_fails_the_job() {
        let tracker = JobTracker::new();
        let job_id = tracker.create_job();
        tracker.set_stage(job_id.value(), "bls_search", 40);

        // A real JoinError from a panicking worker, fed through the same
        // path the orchestrator uses.
        let joined: Result<crate::pipeline::PipelineResult<Vec<Candidate>>, _> =
            tokio::task::spawn_blocking(|| panic!("deliberate worker panic"))
                .await
                .map(Ok);
        assert!(joined.is_err());

        let outcome = settle_blocking_result(&job_id, &tracker, joined);
        assert!(outcome.is_err());

        let job = tracker.get_job(job_id.value()).unwrap();
        assert_eq!(job.status, crate::services::job_tracker::JobStatus::Failed);
        assert!(job.error.as_deref().unwrap().contains("panic"));
        // A failed job never exposes partial candidates.
        assert!(job.result.is_none());
    }

    #[test]
    fn test_invalid_params_rejected_synchronously() {
        let time: Vec<f64> = (0..200).map(|i| i as f64 * 0.02).collect();
        let flux = vec![1.0; 200];
        let curve = LightCurve::new(time, flux, None).unwrap();
        let params = RunParameters {
            min_period_days: 5.0,
            max_period_days: 1.0,
            min_snr: 7.0,
            max_candidates: 5,
            dataset_id: None,
        };
        let err = run_pipeline(&curve, &params, &PipelineConfig::default(), |_, _| {})
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
}
