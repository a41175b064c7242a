//! Planner error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("service error: {0}")]
    Service(#[from] tablevault_services::ServiceError),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("estimate error: {0}")]
    Estimate(#[from] tablevault_core::EstimateError),
}

pub type PlanResult<T> = Result<T, PlanError>;
