//! Public API surface for the detection backend.
//!
//! This file consolidates the stable identifier types and re-exports the
//! domain records that cross the HTTP boundary. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::candidate::Candidate;
pub use crate::models::candidate::TriageAction;
pub use crate::models::candidate::ValidationFlags;
pub use crate::models::light_curve::LightCurve;
pub use crate::models::run::RunParameters;
pub use crate::services::job_tracker::{Job, JobStatus, LogEntry, LogLevel};

use serde::{Deserialize, Serialize};

/// Job identifier (UUID string handed out at submission).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        JobId(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}
