//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the service
//! layer; no pipeline code runs on the request path except synchronous input
//! validation.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::dto::{
    HealthResponse, ResultsResponse, RunRequest, RunResponse, StatusResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::JobId;
use crate::models::LightCurve;
use crate::services::job_tracker::JobStatus;
use crate::services::run_processor;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running.
pub async fn health_check() -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

// =============================================================================
// Detection runs
// =============================================================================

/// POST /api/run
///
/// Validate the submission synchronously, create a queued job, and spawn the
/// detection pipeline in the background. Invalid input never creates a job.
pub async fn submit_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> HandlerResult<RunResponse> {
    request.parameters.validate()?;
    let curve = LightCurve::new(
        request.light_curve.time,
        request.light_curve.flux,
        request.light_curve.flux_err,
    )?;

    let job_id = state.job_tracker.create_job();
    info!(job_id = %job_id, samples = curve.len(), "detection run submitted");

    tokio::spawn(run_processor::process_run_async(
        job_id.clone(),
        state.job_tracker.clone(),
        Arc::clone(&state.config),
        curve,
        request.parameters,
    ));

    Ok(Json(RunResponse {
        job_id,
        status: "queued".to_string(),
    }))
}

/// GET /api/status/{job_id}
///
/// Non-blocking snapshot of a job's progress. Safe to poll at any interval;
/// repeated polls between pipeline updates return identical responses.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<StatusResponse> {
    let job = state
        .job_tracker
        .get_job(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    let message = job.logs.last().map(|entry| entry.message.clone());
    Ok(Json(StatusResponse {
        job_id: JobId::new(job.job_id),
        status: job.status,
        progress_pct: job.progress,
        current_step: job.stage,
        message,
        error: job.error,
    }))
}

/// GET /api/results/{job_id}
///
/// Final candidate list of a completed job. Calling this before completion is
/// a client error telling the caller to keep polling; a failed job reports
/// its failure instead of partial results.
pub async fn get_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<ResultsResponse> {
    let job = state
        .job_tracker
        .get_job(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

    match job.status {
        JobStatus::Completed => {}
        JobStatus::Failed => {
            return Err(AppError::JobFailed(
                job.error
                    .unwrap_or_else(|| format!("Job {} failed", job_id)),
            ));
        }
        JobStatus::Queued | JobStatus::Running => {
            return Err(AppError::JobNotCompleted(format!(
                "Job {} is {} ({}%)",
                job_id,
                job.stage,
                job.progress
            )));
        }
    }

    let summary = job
        .result
        .ok_or_else(|| AppError::Internal(format!("Job {} completed without results", job_id)))?;

    Ok(Json(ResultsResponse {
        job_id: JobId::new(job.job_id),
        summary,
    }))
}

/// GET /api/jobs/{job_id}/logs
///
/// Stream job progress logs via Server-Sent Events. Ends with a `complete`
/// event carrying the terminal status once the job leaves the running states.
pub async fn stream_job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Verify job exists
    if state.job_tracker.get_job(&job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {} not found", job_id)));
    }

    let tracker = state.job_tracker.clone();
    let stream = async_stream::stream! {
        let mut last_log_count = 0;
        loop {
            // Send new logs since last check
            let logs = tracker.get_logs(&job_id);
            for log in logs.iter().skip(last_log_count) {
                let event_data = serde_json::to_string(log).unwrap_or_default();
                yield Ok(Event::default().data(event_data));
            }
            last_log_count = logs.len();

            // Check if job reached a terminal state
            if let Some(job) = tracker.get_job(&job_id) {
                if job.status.is_terminal() {
                    let final_event = serde_json::json!({
                        "status": job.status,
                        "error": job.error,
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(serde_json::to_string(&final_event).unwrap_or_default()));
                    break;
                }
            } else {
                break;
            }

            // Wait before checking again
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
