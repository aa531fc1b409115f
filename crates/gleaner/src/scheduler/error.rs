use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when registering scheduled jobs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Zero or unrepresentable interval.
    #[error("invalid interval for job {job}: {interval:?}")]
    InvalidInterval { job: String, interval: Duration },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
