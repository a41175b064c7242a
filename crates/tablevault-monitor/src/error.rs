//! Monitor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("snapshot error: {0}")]
    Plan(#[from] tablevault_planner::PlanError),

    #[error("service error: {0}")]
    Service(#[from] tablevault_services::ServiceError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
