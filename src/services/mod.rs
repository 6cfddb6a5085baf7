//! Background services: job tracking and the asynchronous pipeline driver.

pub mod job_tracker;
pub mod run_processor;

pub use job_tracker::{Job, JobStatus, JobTracker, LogEntry, LogLevel};
pub use run_processor::{process_run_async, run_pipeline, RunSummary};
