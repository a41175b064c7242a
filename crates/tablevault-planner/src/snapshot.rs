//! Capacity snapshot persistence and job-state lookups.
//!
//! One snapshot is written per backup window under a timestamp-suffixed
//! key; the restore pass reads the newest one. Snapshots are never
//! rewritten in place.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info};

use tablevault_core::clock::now_suffix;
use tablevault_core::types::{CapacitySnapshot, JobRecord};
use tablevault_services::{JobService, ObjectStore};

use crate::error::PlanResult;

/// Common key prefix of all capacity snapshots in the backup bucket.
pub const SNAPSHOT_PREFIX: &str = "backup_metadata";

/// Job states after which the job will not touch its tables again.
pub const DONE_STATES: &[&str] = &[
    "CANCELED",
    "CASCADE_FAILED",
    "FAILED",
    "FINISHED",
    "INACTIVE",
    "PAUSED",
    "SKIPPED",
    "TIMEDOUT",
];

pub struct SnapshotStore<'a> {
    object_store: &'a dyn ObjectStore,
    job_service: &'a dyn JobService,
    bucket: String,
}

impl<'a> SnapshotStore<'a> {
    pub fn new(
        object_store: &'a dyn ObjectStore,
        job_service: &'a dyn JobService,
        bucket: impl Into<String>,
    ) -> Self {
        SnapshotStore {
            object_store,
            job_service,
            bucket: bucket.into(),
        }
    }

    /// Persist a snapshot under a fresh timestamp-suffixed key and return
    /// the key.
    pub fn save(&self, snapshot: &CapacitySnapshot) -> PlanResult<String> {
        let key = format!("{SNAPSHOT_PREFIX}-{}", now_suffix());
        let value: Value = serde_json::to_value(snapshot)?;
        self.object_store.put_json(&self.bucket, &key, &value)?;
        info!(bucket = %self.bucket, %key, "capacity snapshot saved");
        Ok(key)
    }

    /// Load the most recent snapshot, newest by modification time with the
    /// key as tie breaker. `None` when no snapshot exists.
    pub fn load_latest(&self) -> PlanResult<Option<CapacitySnapshot>> {
        let mut summaries = self
            .object_store
            .list_objects(&self.bucket, SNAPSHOT_PREFIX)?;
        summaries.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.key.cmp(&a.key))
        });

        let Some(latest) = summaries.first() else {
            return Ok(None);
        };
        debug!(key = %latest.key, "loading capacity snapshot");
        let value = self.object_store.get_json(&self.bucket, &latest.key)?;
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Ids of the given jobs whose reported state is terminal.
    pub fn list_finished_jobs(&self, jobs: &[JobRecord]) -> PlanResult<Vec<String>> {
        let known: BTreeSet<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
        let all_ids = self.job_service.list_jobs()?;
        let descriptions = self.job_service.describe_jobs(&all_ids)?;

        let mut finished = Vec::new();
        for description in descriptions {
            if !known.contains(description.id.as_str()) {
                continue;
            }
            if let Some(state) = description.field("@status")
                && DONE_STATES.contains(&state)
            {
                debug!(job = %description.id, state, "job reached a terminal state");
                finished.push(description.id);
            }
        }
        Ok(finished)
    }

    /// Table names covered by finished jobs.
    pub fn list_backed_up_tables(&self, jobs: &[JobRecord]) -> PlanResult<Vec<String>> {
        let finished: BTreeSet<String> = self.list_finished_jobs(jobs)?.into_iter().collect();
        let mut tables = Vec::new();
        for job in jobs {
            if finished.contains(&job.job_id) {
                tables.extend(job.tables.iter().cloned());
            }
        }
        Ok(tables)
    }
}
