//! Backup job scheduling.
//!
//! The scheduler takes the account's table descriptors and partitions them
//! into a bounded number of backup jobs, each expected to finish inside one
//! execution window. Per closed job it selects the smallest cluster profile
//! that fits the job's total data size and renders a structural job
//! definition for the execution service.

pub mod cluster;
pub mod definition;
pub mod error;
pub mod scheduler;

pub use cluster::{CLUSTER_PROFILES, ClusterProfile, select_profile};
pub use error::{ScheduleError, ScheduleResult};
pub use scheduler::{JobDefinition, Scheduler};
