//! Runner error types.
//!
//! Everything here is fatal to the invocation; tolerated collaborator
//! failures are absorbed (and logged) further down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] tablevault_core::ConfigError),

    #[error("scheduling error: {0}")]
    Schedule(#[from] tablevault_scheduler::ScheduleError),

    #[error("definition translation error: {0}")]
    Definition(#[from] tablevault_wire::DefinitionError),

    #[error("planning error: {0}")]
    Plan(#[from] tablevault_planner::PlanError),

    #[error("monitoring error: {0}")]
    Monitor(#[from] tablevault_monitor::MonitorError),

    #[error("service error: {0}")]
    Service(#[from] tablevault_services::ServiceError),
}

pub type RunResult<T> = Result<T, RunError>;
