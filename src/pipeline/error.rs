//! Error types for the detection pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error taxonomy for the detection pipeline.
///
/// The orchestrator maps these onto job outcomes: input errors are rejected
/// synchronously at submission, `NoSignalFound` completes the job with an
/// empty candidate list, and everything else fails the job with a message.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed light curve or invalid run parameters. Rejected before a
    /// job is created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Too few samples survived cleaning to resolve a transit search.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// No periodogram peak cleared the significance floor. Not fatal to a
    /// job; surfaces as zero candidates.
    #[error("no signal found above the significance floor")]
    NoSignalFound,

    /// Unexpected numerical failure (overflow, degenerate matrix, ...).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl PipelineError {
    /// Whether this error still yields a successfully completed job.
    pub fn completes_job(&self) -> bool {
        matches!(self, PipelineError::NoSignalFound)
    }
}
