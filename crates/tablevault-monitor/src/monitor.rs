//! Failed-backup detection over backup locations.
//!
//! A table's backup is considered failed when its backup location has no
//! objects at all, no `_SUCCESS` marker, or only a marker older than one
//! backup interval. Detection walks the `directoryPath` nodes of each
//! finished job's definition tree.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use tablevault_core::estimate::BACKUP_INTERVAL_SECS;
use tablevault_core::types::JobRecord;
use tablevault_planner::SnapshotStore;
use tablevault_services::{NotificationChannel, ObjectStore, ObjectSummary};

use crate::error::MonitorResult;

pub struct Monitor<'a> {
    account: String,
    log_bucket: String,
    notify_endpoint: String,
    object_store: &'a dyn ObjectStore,
    notifier: &'a dyn NotificationChannel,
    snapshots: SnapshotStore<'a>,
}

impl<'a> Monitor<'a> {
    pub fn new(
        account: impl Into<String>,
        log_bucket: impl Into<String>,
        notify_endpoint: impl Into<String>,
        object_store: &'a dyn ObjectStore,
        notifier: &'a dyn NotificationChannel,
        snapshots: SnapshotStore<'a>,
    ) -> Self {
        Monitor {
            account: account.into(),
            log_bucket: log_bucket.into(),
            notify_endpoint: notify_endpoint.into(),
            object_store,
            notifier,
            snapshots,
        }
    }

    /// Check every finished job's backup locations and notify about any
    /// table that did not produce a fresh success marker. A missing
    /// snapshot means the whole window never ran, which is itself notified.
    pub fn notify_about_failures(
        &self,
        finished_jobs: &[String],
        now: DateTime<Utc>,
    ) -> MonitorResult<()> {
        let Some(snapshot) = self.snapshots.load_latest()? else {
            info!("no capacity snapshot found, reporting the backup window as never run");
            self.publish(&missing_snapshot_body(&self.account, &self.log_bucket));
            return Ok(());
        };

        let mut failures: Vec<(String, Vec<String>)> = Vec::new();
        for job_id in finished_jobs {
            let Some(record) = snapshot.jobs.iter().find(|j| &j.job_id == job_id) else {
                continue;
            };
            let failed = self.extract_failed_tables(record, now)?;
            if !failed.is_empty() {
                failures.push((job_id.clone(), failed));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }

        info!(jobs = failures.len(), "some tables were not backed up properly");
        let description = describe_failures(&failures);
        self.publish(&failure_body(&self.account, &description, &self.log_bucket));
        Ok(())
    }

    /// Tables of one job whose backup location lacks a fresh `_SUCCESS`
    /// marker.
    fn extract_failed_tables(
        &self,
        record: &JobRecord,
        now: DateTime<Utc>,
    ) -> MonitorResult<Vec<String>> {
        let mut failed = Vec::new();

        for node in definition_objects(&record.definition) {
            let Some(path) = node.get("directoryPath").and_then(Value::as_str) else {
                continue;
            };
            let Some((bucket, table)) = parse_backup_location(path) else {
                warn!(path, "unparseable backup location, skipping");
                continue;
            };

            let mut contents = self.object_store.list_objects(bucket, table)?;
            contents.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

            if contents.is_empty() {
                failed.push(table.to_string());
                continue;
            }
            match first_success_marker(&contents) {
                None => failed.push(table.to_string()),
                Some(marker) if !is_from_current_window(marker, now) => {
                    failed.push(table.to_string());
                }
                Some(_) => {}
            }
        }
        Ok(failed)
    }

    fn publish(&self, body: &str) {
        let subject = failure_subject(&self.account);
        if let Err(err) = self.notifier.publish(&self.notify_endpoint, &subject, body) {
            warn!(error = %err, "failed to publish backup failure notification");
        }
    }
}

fn definition_objects(definition: &Value) -> impl Iterator<Item = &Value> {
    definition
        .get("objects")
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .into_iter()
        .flatten()
}

/// Split `s3://bucket/table/timestamp` into (bucket, table).
fn parse_backup_location(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("s3://")?;
    let mut parts = rest.splitn(3, '/');
    let bucket = parts.next()?;
    let table = parts.next()?;
    parts.next()?;
    Some((bucket, table))
}

fn first_success_marker(contents: &[ObjectSummary]) -> Option<&ObjectSummary> {
    contents.iter().find(|c| c.key.ends_with("_SUCCESS"))
}

fn is_from_current_window(marker: &ObjectSummary, now: DateTime<Utc>) -> bool {
    (now - marker.last_modified).num_seconds() <= BACKUP_INTERVAL_SECS
}

fn describe_failures(failures: &[(String, Vec<String>)]) -> String {
    let mut description = String::new();
    for (job_id, tables) in failures {
        description.push_str(job_id);
        description.push_str(": ");
        description.push_str(&tables.join(","));
        description.push('\n');
    }
    description
}

fn failure_subject(account: &str) -> String {
    format!("Failed to back up tables in {account} account.")
}

fn failure_body(account: &str, description: &str, log_bucket: &str) -> String {
    format!(
        "Hello\n\n\
         You have been notified, as some tables in the {account} account were not \
         backed up in the last 24h.\nPlease find details below:\n\n\
         Job id: failed tables\n\n{description}\n\
         Please check logs in {log_bucket} for details.\n\n\
         Best regards,\ntablevault\n"
    )
}

fn missing_snapshot_body(account: &str, log_bucket: &str) -> String {
    format!(
        "Hello\n\n\
         You have been notified, as the table backup failed completely in {account}.\n\
         No capacity snapshot was written for the last window.\n\n\
         Please check logs in {log_bucket} for details.\n\n\
         Best regards,\ntablevault\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use tablevault_core::types::CapacitySnapshot;
    use tablevault_services::JobService;
    use tablevault_services::memory::{
        InMemoryJobService, InMemoryObjectStore, RecordingNotifier,
    };

    const ENDPOINT: &str = "arn:test:notify:eu-west-1:000000000000:backup-monitoring";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn record(job_id: &str, table: &str) -> JobRecord {
        JobRecord {
            job_id: job_id.to_string(),
            tables: vec![table.to_string()],
            definition: json!({
                "objects": [
                    {
                        "id": "BackupLocation0",
                        "directoryPath": format!(
                            "s3://euw1-table-backups/{table}/2024-03-10-00-00-00"
                        ),
                    },
                ],
            }),
        }
    }

    struct Fixture {
        objects: InMemoryObjectStore,
        jobs: InMemoryJobService,
        notifier: RecordingNotifier,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                objects: InMemoryObjectStore::new(),
                jobs: InMemoryJobService::new(),
                notifier: RecordingNotifier::new(),
            }
        }

        fn save_snapshot(&self, jobs: Vec<JobRecord>) {
            let snapshots = SnapshotStore::new(&self.objects, &self.jobs, "euw1-table-backups");
            snapshots
                .save(&CapacitySnapshot {
                    jobs,
                    ..CapacitySnapshot::default()
                })
                .unwrap();
        }

        fn monitor(&self) -> Monitor<'_> {
            Monitor::new(
                "000000000000",
                "euw1-table-backup-logs",
                ENDPOINT,
                &self.objects,
                &self.notifier,
                SnapshotStore::new(&self.objects, &self.jobs, "euw1-table-backups"),
            )
        }

        fn write_backup_object(&self, table: &str, file: &str, last_modified: DateTime<Utc>) {
            self.objects.put_json_at(
                "euw1-table-backups",
                &format!("{table}/2024-03-10-00-00-00/{file}"),
                json!({}),
                last_modified,
            );
        }
    }

    #[test]
    fn missing_snapshot_reports_the_window_as_never_run() {
        let fixture = Fixture::new();
        fixture.monitor().notify_about_failures(&[], now()).unwrap();

        let messages = fixture.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("failed completely"));
        assert_eq!(messages[0].endpoint, ENDPOINT);
    }

    #[test]
    fn fresh_success_marker_means_no_notification() {
        let fixture = Fixture::new();
        let job_id = fixture.jobs.create_job().unwrap();
        fixture.save_snapshot(vec![record(&job_id, "orders")]);
        fixture.write_backup_object("orders", "part-0000", now() - Duration::hours(2));
        fixture.write_backup_object("orders", "_SUCCESS", now() - Duration::hours(2));

        fixture
            .monitor()
            .notify_about_failures(&[job_id], now())
            .unwrap();
        assert!(fixture.notifier.messages().is_empty());
    }

    #[test]
    fn missing_success_marker_is_a_failure() {
        let fixture = Fixture::new();
        let job_id = fixture.jobs.create_job().unwrap();
        fixture.save_snapshot(vec![record(&job_id, "orders")]);
        fixture.write_backup_object("orders", "part-0000", now() - Duration::hours(2));

        fixture
            .monitor()
            .notify_about_failures(&[job_id.clone()], now())
            .unwrap();

        let messages = fixture.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains(&format!("{job_id}: orders")));
    }

    #[test]
    fn stale_success_marker_is_a_failure() {
        let fixture = Fixture::new();
        let job_id = fixture.jobs.create_job().unwrap();
        fixture.save_snapshot(vec![record(&job_id, "orders")]);
        // Marker from the previous window.
        fixture.write_backup_object("orders", "_SUCCESS", now() - Duration::hours(30));

        fixture
            .monitor()
            .notify_about_failures(&[job_id], now())
            .unwrap();
        assert_eq!(fixture.notifier.messages().len(), 1);
    }

    #[test]
    fn empty_backup_location_is_a_failure() {
        let fixture = Fixture::new();
        let job_id = fixture.jobs.create_job().unwrap();
        fixture.save_snapshot(vec![record(&job_id, "orders")]);

        fixture
            .monitor()
            .notify_about_failures(&[job_id], now())
            .unwrap();
        assert_eq!(fixture.notifier.messages().len(), 1);
    }

    #[test]
    fn failures_aggregate_across_jobs() {
        let fixture = Fixture::new();
        let first = fixture.jobs.create_job().unwrap();
        let second = fixture.jobs.create_job().unwrap();
        fixture.save_snapshot(vec![record(&first, "orders"), record(&second, "sessions")]);

        fixture
            .monitor()
            .notify_about_failures(&[first.clone(), second.clone()], now())
            .unwrap();

        let messages = fixture.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains(&format!("{first}: orders")));
        assert!(messages[0].body.contains(&format!("{second}: sessions")));
    }

    #[test]
    fn backup_location_parsing() {
        assert_eq!(
            parse_backup_location("s3://bucket/orders/2024-03-10-00-00-00"),
            Some(("bucket", "orders"))
        );
        assert_eq!(parse_backup_location("file:///tmp/x"), None);
        assert_eq!(parse_backup_location("s3://bucket-only"), None);
    }
}
