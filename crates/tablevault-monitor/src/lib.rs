//! Post-window backup verification.
//!
//! After a backup window closes, every backup location of every finished
//! job is checked for a fresh `_SUCCESS` marker. Tables without one are
//! aggregated into a notification; the monitor itself never fails the run.

pub mod error;
pub mod monitor;

pub use error::{MonitorError, MonitorResult};
pub use monitor::Monitor;
