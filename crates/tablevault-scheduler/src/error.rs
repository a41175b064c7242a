//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur while building job definitions.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// No cluster profile can hold the job's total table size. Fatal
    /// configuration error; the run aborts.
    #[error("no cluster profile fits a job of {0} total bytes")]
    NoClusterProfile(u64),

    #[error("estimate error: {0}")]
    Estimate(#[from] tablevault_core::EstimateError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
