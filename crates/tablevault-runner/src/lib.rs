//! Invocation orchestration.
//!
//! One invocation is either a backup pass (schedule, create, boost,
//! submit, activate) or a monitor pass (restore, clean up, verify).
//! Everything runs single-threaded over blocking collaborator traits.

pub mod error;
pub mod runner;

pub use error::{RunError, RunResult};
pub use runner::{BackupReport, Services, describe_filtered_tables, run_backup, run_monitor};
