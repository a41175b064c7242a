//! Throughput planning around a backup window.
//!
//! Before jobs activate, the planner snapshots throughput and autoscaling
//! state, disables autoscaling on the affected tables, and raises read
//! capacity so every job is expected to finish inside the window. A later
//! monitoring pass restores the captured state. Both phases are
//! best-effort: tolerated failures are logged, never raised.

pub mod booster;
pub mod error;
pub mod snapshot;

pub use booster::{READ_CAPACITY_DIMENSION, SCALING_NAMESPACE, ThroughputPlanner};
pub use error::{PlanError, PlanResult};
pub use snapshot::{DONE_STATES, SNAPSHOT_PREFIX, SnapshotStore};
