//! Read-capacity boosting for the backup window.
//!
//! `boost` runs after jobs are created but before they activate: it
//! captures the current throughput and autoscaling state into a snapshot,
//! disables autoscaling on the affected tables (so it cannot fight the
//! boost mid-window), and raises read capacity on every table whose job
//! would otherwise miss the execution window. `restore` is the inverse,
//! driven entirely by the latest snapshot, and only touches tables whose
//! backup actually finished.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use tablevault_core::estimate::{
    ACTIVITY_BOOTSTRAP_SECS, CLUSTER_BOOTSTRAP_SECS, MAX_JOB_DURATION_SECS,
    MAX_PROVISIONED_READ_CAPACITY, compute_required_throughput, estimate_backup_duration,
};
use tablevault_core::types::{
    CapacitySnapshot, JobRecord, ScalableTarget, ScalingPolicy, ServiceLimits, TableDescriptor,
};
use tablevault_services::{AutoscalingService, ServiceError, TableStore};

use crate::error::PlanResult;
use crate::snapshot::SnapshotStore;

/// Autoscaling namespace covering managed tables.
pub const SCALING_NAMESPACE: &str = "tables";

/// The one scalable dimension the planner manages.
pub const READ_CAPACITY_DIMENSION: &str = "tables:table:ReadCapacityUnits";

pub struct ThroughputPlanner<'a> {
    table_descriptions: Vec<TableDescriptor>,
    read_throughput_fraction: f64,
    table_store: &'a dyn TableStore,
    autoscaling: &'a dyn AutoscalingService,
    snapshots: SnapshotStore<'a>,
}

struct NodePlan {
    index: usize,
    name: String,
    duration_secs: f64,
    read_capacity_units: u64,
}

impl<'a> ThroughputPlanner<'a> {
    pub fn new(
        table_descriptions: Vec<TableDescriptor>,
        read_throughput_fraction: f64,
        table_store: &'a dyn TableStore,
        autoscaling: &'a dyn AutoscalingService,
        snapshots: SnapshotStore<'a>,
    ) -> Self {
        ThroughputPlanner {
            table_descriptions,
            read_throughput_fraction,
            table_store,
            autoscaling,
            snapshots,
        }
    }

    /// Snapshot current state, disable autoscaling and raise read capacity
    /// wherever a job would miss the execution window. Definition trees are
    /// updated in place so translated jobs read at the boosted fraction.
    ///
    /// Returns the total read-capacity increase across all tables.
    pub fn boost(&self, jobs: &mut [JobRecord], desired_duration_secs: f64) -> PlanResult<i64> {
        let (policies, targets) = self.capture_autoscaling_state()?;
        let snapshot = CapacitySnapshot {
            tables: self.table_descriptions.clone(),
            jobs: jobs.to_vec(),
            scaling_policies: policies.clone(),
            scalable_targets: targets.clone(),
        };
        // The snapshot must hit storage before any mutation, otherwise a
        // crash mid-boost loses the restore targets.
        self.snapshots.save(&snapshot)?;

        self.disable_autoscaling(&policies, &targets);

        let limits = self.table_store.describe_limits()?;
        let mut total_increase = 0i64;
        for job in jobs.iter_mut() {
            total_increase +=
                self.boost_single_job(&mut job.definition, desired_duration_secs, limits)?;
        }
        info!(total_increase, "read capacity boosted for the backup window");
        Ok(total_increase)
    }

    /// Undo a previous boost from the latest snapshot: put backed-up tables
    /// back on their captured read capacity and reinstate autoscaling.
    /// Without a snapshot this is a logged no-op.
    pub fn restore(&self) -> PlanResult<()> {
        let Some(snapshot) = self.snapshots.load_latest()? else {
            error!("no capacity snapshot found, leaving table throughput as is");
            return Ok(());
        };

        self.restore_backed_up_tables(&snapshot)?;
        self.reenable_autoscaling(&snapshot);
        Ok(())
    }

    /// Policies and targets on the read-capacity dimension of managed
    /// tables. Anything else in the namespace is left alone.
    fn capture_autoscaling_state(
        &self,
    ) -> PlanResult<(Vec<ScalingPolicy>, Vec<ScalableTarget>)> {
        let resources: BTreeSet<String> = self
            .table_descriptions
            .iter()
            .map(|t| t.resource_id())
            .collect();

        let policies = self
            .autoscaling
            .describe_scaling_policies(SCALING_NAMESPACE)?
            .into_iter()
            .filter(|p| {
                p.scalable_dimension == READ_CAPACITY_DIMENSION
                    && resources.contains(&p.resource_id)
            })
            .collect();
        let targets = self
            .autoscaling
            .describe_scalable_targets(SCALING_NAMESPACE)?
            .into_iter()
            .filter(|t| {
                t.scalable_dimension == READ_CAPACITY_DIMENSION
                    && resources.contains(&t.resource_id)
            })
            .collect();
        Ok((policies, targets))
    }

    fn disable_autoscaling(&self, policies: &[ScalingPolicy], targets: &[ScalableTarget]) {
        for policy in policies {
            if let Err(err) = self.autoscaling.delete_scaling_policy(
                &policy.policy_name,
                &policy.service_namespace,
                &policy.resource_id,
                &policy.scalable_dimension,
            ) {
                warn!(policy = %policy.policy_name, error = %err, "failed to delete scaling policy");
            } else {
                debug!(policy = %policy.policy_name, resource = %policy.resource_id, "scaling policy removed");
            }
        }
        for target in targets {
            if let Err(err) = self.autoscaling.deregister_scalable_target(
                &target.service_namespace,
                &target.resource_id,
                &target.scalable_dimension,
            ) {
                warn!(resource = %target.resource_id, error = %err, "failed to deregister scalable target");
            } else {
                debug!(resource = %target.resource_id, "scalable target deregistered");
            }
        }
    }

    /// Boost one job's tables so the job converges toward the desired
    /// duration. Jobs already expected inside the window are untouched.
    fn boost_single_job(
        &self,
        definition: &mut Value,
        desired_duration_secs: f64,
        limits: ServiceLimits,
    ) -> PlanResult<i64> {
        let Some(objects) = definition.get_mut("objects").and_then(Value::as_array_mut) else {
            return Ok(0);
        };

        let mut plans = Vec::new();
        for (index, node) in objects.iter().enumerate() {
            let Some(name) = node.get("tableName").and_then(Value::as_str) else {
                continue;
            };
            let Some(table) = self.table_descriptions.iter().find(|t| t.name == name) else {
                warn!(table = name, "no description for table, leaving it unboosted");
                continue;
            };
            let fraction = node_fraction(node, self.read_throughput_fraction);
            let duration_secs =
                estimate_backup_duration(fraction, table.size_bytes, table.read_capacity_units)?;
            plans.push(NodePlan {
                index,
                name: name.to_string(),
                duration_secs,
                read_capacity_units: table.read_capacity_units,
            });
        }
        if plans.is_empty() {
            return Ok(0);
        }

        let total_secs: f64 = plans.iter().map(|p| p.duration_secs).sum();
        let bootstrap_secs =
            CLUSTER_BOOTSTRAP_SECS + ACTIVITY_BOOTSTRAP_SECS * plans.len() as f64;
        if total_secs <= MAX_JOB_DURATION_SECS - bootstrap_secs {
            debug!(
                estimated_secs = total_secs,
                "job fits the execution window, no boost needed"
            );
            return Ok(0);
        }

        let read_limit = MAX_PROVISIONED_READ_CAPACITY.min(limits.table_max_read_capacity);
        let mut increase = 0i64;
        for plan in plans {
            // Each table gets a slice of the desired duration proportional
            // to its share of the job's total estimate.
            let target_secs = plan.duration_secs * desired_duration_secs / total_secs;
            let (mut new_capacity, new_fraction) = compute_required_throughput(
                plan.duration_secs,
                target_secs,
                plan.read_capacity_units,
            )?;

            if new_capacity > read_limit {
                error!(
                    table = %plan.name,
                    required = new_capacity,
                    limit = read_limit,
                    "required read capacity exceeds the provisioning limit, backup may miss the window"
                );
                new_capacity = read_limit.max(plan.read_capacity_units);
            }

            objects[plan.index]["readThroughputPercent"] =
                Value::String(new_fraction.to_string());

            match self
                .table_store
                .change_capacity(&plan.name, Some(new_capacity), None)
            {
                Ok(()) => {
                    info!(
                        table = %plan.name,
                        from = plan.read_capacity_units,
                        to = new_capacity,
                        fraction = new_fraction,
                        "read capacity boosted"
                    );
                    increase += new_capacity as i64 - plan.read_capacity_units as i64;
                }
                Err(ServiceError::LimitExceeded(reason)) => {
                    error!(table = %plan.name, %reason, "account capacity limit hit, table stays at current throughput");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(increase)
    }

    fn restore_backed_up_tables(&self, snapshot: &CapacitySnapshot) -> PlanResult<()> {
        let backed_up: BTreeSet<String> = self
            .snapshots
            .list_backed_up_tables(&snapshot.jobs)?
            .into_iter()
            .collect();

        for prior in &snapshot.tables {
            if !backed_up.contains(&prior.name) {
                continue;
            }
            let current = match self.table_store.describe_table(&prior.name) {
                Ok(table) => table,
                Err(err) if err.is_not_found() => {
                    warn!(table = %prior.name, "table disappeared before restore");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if current.read_capacity_units == prior.read_capacity_units {
                continue;
            }

            match self.table_store.change_capacity(
                &prior.name,
                Some(prior.read_capacity_units),
                None,
            ) {
                Ok(()) => info!(
                    table = %prior.name,
                    from = current.read_capacity_units,
                    to = prior.read_capacity_units,
                    "read capacity restored"
                ),
                Err(ServiceError::DecreaseLimitExceeded(reason)) => {
                    error!(table = %prior.name, %reason, "daily decrease limit hit, capacity stays boosted until the next window");
                }
                Err(err) => {
                    error!(table = %prior.name, error = %err, "failed to restore read capacity");
                }
            }
        }
        Ok(())
    }

    /// Targets first, then policies: a policy cannot attach to a resource
    /// without a registered target.
    fn reenable_autoscaling(&self, snapshot: &CapacitySnapshot) {
        for target in &snapshot.scalable_targets {
            if let Err(err) = self.autoscaling.register_scalable_target(target) {
                warn!(resource = %target.resource_id, error = %err, "failed to re-register scalable target");
            }
        }
        for policy in &snapshot.scaling_policies {
            if let Err(err) = self.autoscaling.put_scaling_policy(policy) {
                warn!(policy = %policy.policy_name, error = %err, "failed to re-create scaling policy");
            }
        }
    }
}

fn node_fraction(node: &Value, default: f64) -> f64 {
    node.get("readThroughputPercent")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
