//! The two invocation entry points.
//!
//! `run_backup` builds and activates one window's worth of backup jobs;
//! `run_monitor` is invoked after the window closes and undoes the boost,
//! cleans up finished jobs and verifies the backups landed. Job-creation
//! account limits are tolerated per job; everything else fatal to the
//! invocation propagates as [`RunError`].

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use tablevault_core::AccountConfig;
use tablevault_core::estimate::DESIRED_JOB_DURATION_SECS;
use tablevault_core::types::{JobRecord, TableDescriptor};
use tablevault_monitor::Monitor;
use tablevault_planner::{SnapshotStore, ThroughputPlanner};
use tablevault_scheduler::Scheduler;
use tablevault_services::{
    AutoscalingService, JobService, NotificationChannel, ObjectStore, ServiceError, TableStore,
};
use tablevault_wire::{to_wire_objects, to_wire_parameters, to_wire_values};

use crate::error::RunResult;

/// The collaborator services one invocation runs against.
pub struct Services<'a> {
    pub tables: &'a dyn TableStore,
    pub jobs: &'a dyn JobService,
    pub autoscaling: &'a dyn AutoscalingService,
    pub objects: &'a dyn ObjectStore,
    pub notifier: &'a dyn NotificationChannel,
}

/// What one backup pass accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub job_ids: Vec<String>,
    pub tables_scheduled: usize,
    /// Total read-capacity increase applied by the boost.
    pub capacity_increase: i64,
}

/// Describe every table except those matching an exclusion pattern.
pub fn describe_filtered_tables(
    store: &dyn TableStore,
    exclude: &[Regex],
) -> RunResult<Vec<TableDescriptor>> {
    let names = store.list_tables()?;
    let mut descriptors = Vec::with_capacity(names.len());
    for name in names {
        if exclude.iter().any(|pattern| pattern.is_match(&name)) {
            debug!(table = %name, "table excluded from backup");
            continue;
        }
        descriptors.push(store.describe_table(&name)?);
    }
    Ok(descriptors)
}

/// Schedule, create, boost, submit and activate one window's backup jobs.
pub fn run_backup(config: &AccountConfig, services: &Services<'_>) -> RunResult<BackupReport> {
    info!(account = %config.account, "performing a full table backup pass");
    let tables = describe_filtered_tables(services.tables, &config.exclusion_patterns()?)?;

    let scheduler = Scheduler::new(tables.clone(), config);
    let definitions = scheduler.build_job_definitions()?;
    info!(jobs = definitions.len(), "built backup job definitions");

    let mut records = Vec::new();
    for definition in definitions {
        match services.jobs.create_job() {
            Ok(job_id) => records.push(JobRecord {
                job_id,
                tables: definition.tables,
                definition: definition.definition,
            }),
            Err(ServiceError::LimitExceeded(reason)) => {
                warn!(
                    %reason,
                    skipped_tables = definition.tables.len(),
                    "cannot create more jobs, this window skips the remaining tables"
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    let snapshots =
        SnapshotStore::new(services.objects, services.jobs, config.backup_bucket.as_str());
    let planner = ThroughputPlanner::new(
        tables,
        config.read_throughput_fraction(),
        services.tables,
        services.autoscaling,
        snapshots,
    );
    let capacity_increase = planner.boost(&mut records, DESIRED_JOB_DURATION_SECS)?;

    for record in &records {
        let objects = to_wire_objects(&record.definition)?;
        let parameters = to_wire_parameters(&record.definition)?;
        let values = to_wire_values(&record.definition)?;

        info!(job = %record.job_id, objects = objects.len(), "submitting job definition");
        services
            .jobs
            .put_job_definition(&record.job_id, &objects, &parameters, &values)?;
        info!(job = %record.job_id, "activating job");
        services.jobs.activate_job(&record.job_id, &values)?;
    }

    let report = BackupReport {
        tables_scheduled: records.iter().map(|r| r.tables.len()).sum(),
        job_ids: records.into_iter().map(|r| r.job_id).collect(),
        capacity_increase,
    };
    info!(
        jobs = report.job_ids.len(),
        tables = report.tables_scheduled,
        capacity_increase = report.capacity_increase,
        "finished table backup pass"
    );
    Ok(report)
}

/// Restore throughput, delete finished jobs and check for failed backups.
pub fn run_monitor(config: &AccountConfig, services: &Services<'_>) -> RunResult<()> {
    info!(account = %config.account, "performing a monitoring pass");

    let planner = ThroughputPlanner::new(
        Vec::new(),
        config.read_throughput_fraction(),
        services.tables,
        services.autoscaling,
        SnapshotStore::new(services.objects, services.jobs, config.backup_bucket.as_str()),
    );
    planner.restore()?;

    let snapshots =
        SnapshotStore::new(services.objects, services.jobs, config.backup_bucket.as_str());
    let finished = match snapshots.load_latest()? {
        Some(snapshot) => snapshots.list_finished_jobs(&snapshot.jobs)?,
        None => Vec::new(),
    };

    for job_id in &finished {
        info!(job = %job_id, "deleting finished job");
        if let Err(err) = services.jobs.delete_job(job_id) {
            warn!(job = %job_id, error = %err, "failed to delete finished job");
        }
    }

    let monitor = Monitor::new(
        config.account.as_str(),
        config.log_bucket.as_str(),
        config.notify_endpoint.as_str(),
        services.objects,
        services.notifier,
        SnapshotStore::new(services.objects, services.jobs, config.backup_bucket.as_str()),
    );
    monitor.notify_about_failures(&finished, Utc::now())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tablevault_planner::SNAPSHOT_PREFIX;
    use tablevault_services::memory::{
        InMemoryAutoscalingService, InMemoryJobService, InMemoryObjectStore, InMemoryTableStore,
        RecordingNotifier,
    };

    fn config() -> AccountConfig {
        toml::from_str(
            r#"
account = "000000000000"
region = "eu-west-1"
backup_bucket = "euw1-table-backups"
log_bucket = "euw1-table-backup-logs"
subnet_id = "subnet-0abc"
notify_endpoint = "arn:test:notify:eu-west-1:000000000000:backup-monitoring"
"#,
        )
        .unwrap()
    }

    fn table(name: &str, size_bytes: u64, rcu: u64) -> TableDescriptor {
        TableDescriptor {
            name: name.to_string(),
            size_bytes,
            read_capacity_units: rcu,
            write_capacity_units: 5,
            arn: format!("arn:test:tables:eu-west-1:000000000000:table/{name}"),
        }
    }

    struct World {
        tables: InMemoryTableStore,
        jobs: InMemoryJobService,
        autoscaling: InMemoryAutoscalingService,
        objects: InMemoryObjectStore,
        notifier: RecordingNotifier,
    }

    impl World {
        fn new(tables: Vec<TableDescriptor>) -> Self {
            World {
                tables: InMemoryTableStore::new(tables),
                jobs: InMemoryJobService::new(),
                autoscaling: InMemoryAutoscalingService::default(),
                objects: InMemoryObjectStore::new(),
                notifier: RecordingNotifier::new(),
            }
        }

        fn services(&self) -> Services<'_> {
            Services {
                tables: &self.tables,
                jobs: &self.jobs,
                autoscaling: &self.autoscaling,
                objects: &self.objects,
                notifier: &self.notifier,
            }
        }

        fn mark_backup_succeeded(&self, table: &str) {
            self.objects.put_json_at(
                "euw1-table-backups",
                &format!("{table}/window/_SUCCESS"),
                json!({}),
                Utc::now() - Duration::hours(1),
            );
        }
    }

    #[test]
    fn filtered_describe_drops_excluded_tables() {
        let world = World::new(vec![table("orders", 1024, 10), table("tmp_scratch", 1024, 10)]);
        let exclude = vec![Regex::new("^tmp_").unwrap()];

        let described = describe_filtered_tables(&world.tables, &exclude).unwrap();
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].name, "orders");
    }

    #[test]
    fn backup_pass_creates_boosts_and_activates_jobs() {
        // 409_600_000 bytes at 10 RCU estimates to 20000s: needs a boost.
        let world = World::new(vec![table("orders", 409_600_000, 10)]);

        let report = run_backup(&config(), &world.services()).unwrap();

        assert_eq!(report.job_ids.len(), 1);
        assert_eq!(report.tables_scheduled, 1);
        assert!(report.capacity_increase > 0);
        assert_eq!(world.tables.read_capacity("orders"), Some(71));
        assert!(world.jobs.is_activated(&report.job_ids[0]));

        // The submitted wire definition carries the boosted fraction.
        let objects = world.jobs.definition_objects(&report.job_ids[0]);
        let source = objects.iter().find(|o| o.id == "SourceTable0").unwrap();
        let fraction = source
            .fields
            .iter()
            .find(|f| f.key == "readThroughputPercent")
            .unwrap();
        assert_eq!(
            fraction.value,
            tablevault_wire::WireFieldValue::String("0.86".to_string())
        );

        // And the snapshot for the restore pass is durable.
        let snapshots = world
            .objects
            .list_objects("euw1-table-backups", SNAPSHOT_PREFIX)
            .unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[test]
    fn job_creation_limit_skips_the_remaining_jobs() {
        // Two tables at 7000s each cannot share a window, so two jobs.
        let world = World::new(vec![
            table("first", 143_360_000, 10),
            table("second", 143_360_000, 10),
        ]);
        world.jobs.set_create_budget(1);

        let report = run_backup(&config(), &world.services()).unwrap();
        assert_eq!(report.job_ids.len(), 1);
        assert_eq!(report.tables_scheduled, 1);
    }

    #[test]
    fn monitor_pass_restores_cleans_up_and_stays_quiet_on_success() {
        let world = World::new(vec![table("orders", 409_600_000, 10)]);
        let report = run_backup(&config(), &world.services()).unwrap();
        let job_id = report.job_ids[0].clone();

        world.jobs.set_status(&job_id, "FINISHED");
        world.mark_backup_succeeded("orders");

        run_monitor(&config(), &world.services()).unwrap();

        assert_eq!(world.tables.read_capacity("orders"), Some(10));
        assert!(!world.jobs.job_ids().contains(&job_id));
        assert!(world.notifier.messages().is_empty());
    }

    #[test]
    fn monitor_pass_notifies_about_missing_success_marker() {
        let world = World::new(vec![table("orders", 409_600_000, 10)]);
        let report = run_backup(&config(), &world.services()).unwrap();
        let job_id = report.job_ids[0].clone();

        world.jobs.set_status(&job_id, "FAILED");
        // No _SUCCESS marker ever written.

        run_monitor(&config(), &world.services()).unwrap();

        let messages = world.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("orders"));
    }

    #[test]
    fn running_jobs_survive_the_monitor_pass() {
        let world = World::new(vec![table("orders", 409_600_000, 10)]);
        let report = run_backup(&config(), &world.services()).unwrap();
        let job_id = report.job_ids[0].clone();
        // Still RUNNING from activation.

        run_monitor(&config(), &world.services()).unwrap();

        assert!(world.jobs.job_ids().contains(&job_id));
        // Capacity stays boosted until the job finishes.
        assert_eq!(world.tables.read_capacity("orders"), Some(71));
    }
}
