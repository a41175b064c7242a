//! Backup duration and throughput estimation.
//!
//! Pure arithmetic over table size and provisioned read capacity. The
//! scheduler and planner both build on these two functions; bootstrap
//! overhead is always added by the caller.

use crate::error::EstimateError;

/// Bytes read per capacity unit per second.
pub const READ_BLOCK_SIZE_BYTES: u64 = 4096;

/// Hard cap on tables packed into a single backup job.
pub const MAX_TABLES_PER_JOB: usize = 32;

/// Configured ceiling on provisioned read capacity per table.
pub const MAX_PROVISIONED_READ_CAPACITY: u64 = 1000;

/// Execution window: a job must be expected to finish within this.
pub const MAX_JOB_DURATION_SECS: f64 = 14400.0;

/// Duration a boosted job should converge toward (under one hour).
pub const DESIRED_JOB_DURATION_SECS: f64 = 3300.0;

/// Fixed per-table activity startup overhead.
pub const ACTIVITY_BOOTSTRAP_SECS: f64 = 60.0;

/// Fixed per-job cluster startup overhead.
pub const CLUSTER_BOOTSTRAP_SECS: f64 = 600.0;

/// Fraction of a table's read throughput the backup reads by default.
pub const INITIAL_READ_THROUGHPUT_FRACTION: f64 = 0.5;

/// Expected spacing between backup windows.
pub const BACKUP_INTERVAL_SECS: i64 = 86400;

/// Rough estimate of how long backing up one table will take, in seconds.
///
/// `fraction` is the share of the table's read throughput the backup may
/// consume (e.g. 0.5 for 50%). Fails when the denominator is zero.
pub fn estimate_backup_duration(
    fraction: f64,
    size_bytes: u64,
    read_capacity_units: u64,
) -> Result<f64, EstimateError> {
    let read_bytes_per_second =
        read_capacity_units as f64 * fraction * READ_BLOCK_SIZE_BYTES as f64;

    if read_bytes_per_second <= 0.0 {
        return Err(EstimateError::DivisionUndefined(format!(
            "rcu={read_capacity_units} fraction={fraction}"
        )));
    }

    Ok(size_bytes as f64 / read_bytes_per_second)
}

/// Compute the read capacity (and backup read fraction) needed to shrink an
/// estimated backup duration down to a target duration.
///
/// Returns `(new_read_capacity_units, new_fraction)`. The new fraction is
/// the share of the raised capacity dedicated to backup reads, never more
/// than 99%, rounded to two decimals.
pub fn compute_required_throughput(
    estimated_duration: f64,
    target_duration: f64,
    read_capacity_units: u64,
) -> Result<(u64, f64), EstimateError> {
    if target_duration <= 0.0 {
        return Err(EstimateError::DivisionUndefined(format!(
            "target_duration={target_duration}"
        )));
    }

    let ratio = estimated_duration / target_duration;
    let new_read_capacity_units = read_capacity_units as f64 * (ratio + 1.0);
    let reserved = read_capacity_units as f64 / new_read_capacity_units;
    let new_fraction = 1.0 - reserved.max(0.01);

    Ok((
        new_read_capacity_units.round() as u64,
        (new_fraction * 100.0).round() / 100.0,
    ))
}
