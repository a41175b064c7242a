//! Table-to-job bin-packing.
//!
//! Tables are sorted ascending by estimated backup duration so cheap tables
//! are packed first and the "can one more fit" decision is driven by the
//! next candidate's cost. Jobs close when the window would be exceeded, the
//! per-job table cap is reached, or the input is exhausted. Identical table
//! sets produce identical partitionings regardless of input order.

use tracing::{info, warn};

use tablevault_core::AccountConfig;
use tablevault_core::clock::now_suffix;
use tablevault_core::estimate::{
    ACTIVITY_BOOTSTRAP_SECS, CLUSTER_BOOTSTRAP_SECS, MAX_JOB_DURATION_SECS, MAX_TABLES_PER_JOB,
    estimate_backup_duration,
};
use tablevault_core::types::TableDescriptor;

use crate::cluster::select_profile;
use crate::definition::{RenderContext, render_definition};
use crate::error::{ScheduleError, ScheduleResult};

/// One scheduled backup job, ready for translation and submission.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    /// Table names in packing order.
    pub tables: Vec<String>,
    /// Cumulative size of the job's tables.
    pub total_size_bytes: u64,
    /// Estimated wall-clock duration including cluster bootstrap.
    pub estimated_duration_secs: f64,
    /// The structural definition tree for the execution service.
    pub definition: serde_json::Value,
}

/// Per-table packing cost.
#[derive(Debug, Clone)]
struct TableCost {
    name: String,
    /// Estimated backup duration plus activity bootstrap, in seconds.
    duration_secs: f64,
    size_bytes: u64,
}

pub struct Scheduler {
    tables: Vec<TableDescriptor>,
    read_throughput_fraction: f64,
    subnet_id: String,
    region: String,
    backup_bucket: String,
    log_location: String,
    max_retries: u32,
    terminate_after_hours: u64,
    date_suffix: String,
}

impl Scheduler {
    pub fn new(tables: Vec<TableDescriptor>, config: &AccountConfig) -> Self {
        let date_suffix = now_suffix();
        Scheduler {
            tables,
            read_throughput_fraction: config.read_throughput_fraction(),
            subnet_id: config.subnet_id.clone(),
            region: config.region.clone(),
            backup_bucket: config.backup_bucket.clone(),
            log_location: format!("{}/logs/{date_suffix}", config.log_bucket),
            max_retries: config.max_retries(),
            terminate_after_hours: (MAX_JOB_DURATION_SECS / 3600.0).ceil() as u64 + 1,
            date_suffix,
        }
    }

    /// Partition the tables into jobs and render a definition per job.
    pub fn build_job_definitions(&self) -> ScheduleResult<Vec<JobDefinition>> {
        let costs = self.table_backup_costs()?;
        let mut jobs = Vec::new();

        let mut batch: Vec<String> = Vec::new();
        let mut total_duration = CLUSTER_BOOTSTRAP_SECS;
        let mut total_size: u64 = 0;

        for (index, cost) in costs.iter().enumerate() {
            total_duration += cost.duration_secs;
            total_size += cost.size_bytes;
            batch.push(cost.name.clone());

            if !should_add_more_tables(index, total_duration, &costs, batch.len()) {
                info!(
                    tables = batch.len(),
                    estimated_duration_secs = total_duration,
                    "closing backup job"
                );
                jobs.push(self.close_job(
                    std::mem::take(&mut batch),
                    total_size,
                    total_duration,
                )?);
                total_duration = CLUSTER_BOOTSTRAP_SECS;
                total_size = 0;
            }
        }

        Ok(jobs)
    }

    /// Estimate the packing cost of every eligible table, ascending by
    /// duration. Ties break on the table name so any permutation of the
    /// input yields the same order. Empty and zero-capacity tables are
    /// skipped up front.
    fn table_backup_costs(&self) -> ScheduleResult<Vec<TableCost>> {
        let mut costs = Vec::with_capacity(self.tables.len());

        for table in &self.tables {
            if table.size_bytes == 0 {
                info!(table = %table.name, "skipping table as it appears to be empty");
                continue;
            }
            if table.read_capacity_units == 0 {
                warn!(table = %table.name, "skipping table with no provisioned read capacity");
                continue;
            }

            let duration_secs = estimate_backup_duration(
                self.read_throughput_fraction,
                table.size_bytes,
                table.read_capacity_units,
            )? + ACTIVITY_BOOTSTRAP_SECS;

            costs.push(TableCost {
                name: table.name.clone(),
                duration_secs,
                size_bytes: table.size_bytes,
            });
        }

        costs.sort_by(|a, b| {
            a.duration_secs
                .total_cmp(&b.duration_secs)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(costs)
    }

    fn close_job(
        &self,
        tables: Vec<String>,
        total_size_bytes: u64,
        estimated_duration_secs: f64,
    ) -> ScheduleResult<JobDefinition> {
        let profile = select_profile(total_size_bytes)
            .ok_or(ScheduleError::NoClusterProfile(total_size_bytes))?;

        let definition = render_definition(
            &tables,
            &RenderContext {
                read_throughput_fraction: self.read_throughput_fraction,
                subnet_id: &self.subnet_id,
                region: &self.region,
                backup_bucket: &self.backup_bucket,
                log_location: &self.log_location,
                max_retries: self.max_retries,
                terminate_after_hours: self.terminate_after_hours,
                date_suffix: &self.date_suffix,
                profile,
            },
        );

        Ok(JobDefinition {
            tables,
            total_size_bytes,
            estimated_duration_secs,
            definition,
        })
    }
}

/// Whether the current job can take the next table without exceeding the
/// execution window or the per-job table cap.
fn should_add_more_tables(
    index: usize,
    total_duration: f64,
    costs: &[TableCost],
    batch_len: usize,
) -> bool {
    if index + 1 >= costs.len() {
        return false;
    }
    if total_duration + costs[index + 1].duration_secs >= MAX_JOB_DURATION_SECS {
        return false;
    }
    if batch_len >= MAX_TABLES_PER_JOB {
        return false;
    }
    true
}
