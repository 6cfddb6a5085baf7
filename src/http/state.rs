//! Application state for the HTTP server.

use crate::config::PipelineConfig;
use crate::services::job_tracker::JobTracker;
use std::sync::Arc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// In-memory job tracker for async detection runs.
    pub job_tracker: JobTracker,
    /// Immutable pipeline policy thresholds, shared by all jobs.
    pub config: Arc<PipelineConfig>,
}

impl AppState {
    /// Create a new application state with the given pipeline configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            job_tracker: JobTracker::new(),
            config: Arc::new(config),
        }
    }
}
