//! Job tracking for asynchronous detection runs.
//!
//! This module provides a simple in-memory job tracker that stores status,
//! stage, progress, and progress logs for background pipeline runs. Reads
//! always observe a consistent snapshot: every update happens under the write
//! lock, so a poll sees either the pre- or post-update job, never a torn one.

use crate::api::JobId;
use crate::services::run_processor::RunSummary;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Job status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Job metadata, progress, and logs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    /// Pipeline stage label, e.g. `preprocessing` or `bls_search`.
    pub stage: String,
    /// Completion percentage, 0..=100, non-decreasing within one job.
    pub progress: u8,
    pub logs: Vec<LogEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Error message when the job failed.
    pub error: Option<String>,
    /// Final candidate summary when the job completed.
    pub result: Option<RunSummary>,
}

/// In-memory job tracker.
#[derive(Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobTracker {
    /// Create a new job tracker.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new queued job and return its ID.
    pub fn create_job(&self) -> JobId {
        let job_id = Uuid::new_v4().to_string();
        let job = Job {
            job_id: job_id.clone(),
            status: JobStatus::Queued,
            stage: "queued".to_string(),
            progress: 0,
            logs: vec![],
            created_at: chrono::Utc::now(),
            completed_at: None,
            error: None,
            result: None,
        };
        self.jobs.write().insert(job_id.clone(), job);
        JobId::new(job_id)
    }

    /// Advance a running job to a new stage. Progress is clamped so it never
    /// decreases, and terminal jobs are never moved back to running.
    pub fn set_stage(&self, job_id: &str, stage: &str, progress: u8) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            if job.status.is_terminal() {
                return;
            }
            job.status = JobStatus::Running;
            job.stage = stage.to_string();
            job.progress = job.progress.max(progress.min(100));
        }
    }

    /// Add a log entry to a job.
    pub fn log(&self, job_id: &str, level: LogLevel, message: impl Into<String>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            job.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    /// Mark a job as completed with its result summary.
    pub fn complete_job(&self, job_id: &str, result: RunSummary) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            if job.status.is_terminal() {
                return;
            }
            job.status = JobStatus::Completed;
            job.stage = "completed".to_string();
            job.progress = 100;
            job.completed_at = Some(chrono::Utc::now());
            job.result = Some(result);
        }
    }

    /// Mark a job as failed. Any partial result is discarded.
    pub fn fail_job(&self, job_id: &str, error_message: impl Into<String>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(job_id) {
            if job.status.is_terminal() {
                return;
            }
            let message = error_message.into();
            job.status = JobStatus::Failed;
            job.completed_at = Some(chrono::Utc::now());
            job.error = Some(message.clone());
            job.result = None;
            job.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level: LogLevel::Error,
                message,
            });
        }
    }

    /// Get a snapshot of a job by ID.
    pub fn get_job(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Get all logs for a job.
    pub fn get_logs(&self, job_id: &str) -> Vec<LogEntry> {
        self.jobs
            .read()
            .get(job_id)
            .map(|job| job.logs.clone())
            .unwrap_or_default()
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
