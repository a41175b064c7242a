//! The five collaborator contracts.
//!
//! All calls are blocking request/response operations; the core treats
//! each as atomic. Implementations are expected to retry throttling
//! internally via [`crate::RetryPolicy`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use tablevault_core::types::{ScalableTarget, ScalingPolicy, ServiceLimits, TableDescriptor};
use tablevault_wire::{WireObject, WireParameter, WireValue};

use crate::error::ServiceResult;

/// Table metadata and provisioned-throughput service.
pub trait TableStore {
    fn list_tables(&self) -> ServiceResult<Vec<String>>;

    fn describe_table(&self, name: &str) -> ServiceResult<TableDescriptor>;

    fn describe_limits(&self) -> ServiceResult<ServiceLimits>;

    /// Change provisioned capacity. Implementations must no-op when the
    /// requested values equal the current ones.
    fn change_capacity(
        &self,
        name: &str,
        read_capacity_units: Option<u64>,
        write_capacity_units: Option<u64>,
    ) -> ServiceResult<()>;
}

/// Execution state of one job as reported by the job service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub id: String,
    /// Flat key/value fields; the scheduler state lives under `@status`.
    pub fields: Vec<(String, String)>,
}

impl JobStatus {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The job-execution service: persists and activates wire-format job
/// definitions.
pub trait JobService {
    fn create_job(&self) -> ServiceResult<String>;

    fn put_job_definition(
        &self,
        job_id: &str,
        objects: &[WireObject],
        parameters: &[WireParameter],
        values: &[WireValue],
    ) -> ServiceResult<()>;

    fn activate_job(&self, job_id: &str, values: &[WireValue]) -> ServiceResult<()>;

    fn list_jobs(&self) -> ServiceResult<Vec<String>>;

    fn describe_jobs(&self, job_ids: &[String]) -> ServiceResult<Vec<JobStatus>>;

    fn delete_job(&self, job_id: &str) -> ServiceResult<()>;
}

/// Autoscaling control plane, scoped by (namespace, resource id, dimension).
pub trait AutoscalingService {
    fn describe_scaling_policies(&self, namespace: &str) -> ServiceResult<Vec<ScalingPolicy>>;

    fn describe_scalable_targets(&self, namespace: &str) -> ServiceResult<Vec<ScalableTarget>>;

    fn put_scaling_policy(&self, policy: &ScalingPolicy) -> ServiceResult<()>;

    fn delete_scaling_policy(
        &self,
        policy_name: &str,
        namespace: &str,
        resource_id: &str,
        dimension: &str,
    ) -> ServiceResult<()>;

    fn register_scalable_target(&self, target: &ScalableTarget) -> ServiceResult<()>;

    fn deregister_scalable_target(
        &self,
        namespace: &str,
        resource_id: &str,
        dimension: &str,
    ) -> ServiceResult<()>;
}

/// A stored object's key and modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Durable JSON object storage.
pub trait ObjectStore {
    fn put_json(&self, bucket: &str, key: &str, value: &Value) -> ServiceResult<()>;

    fn get_json(&self, bucket: &str, key: &str) -> ServiceResult<Value>;

    fn list_objects(&self, bucket: &str, prefix: &str) -> ServiceResult<Vec<ObjectSummary>>;
}

/// Outbound notification channel for failure summaries.
pub trait NotificationChannel {
    fn publish(&self, endpoint: &str, subject: &str, body: &str) -> ServiceResult<()>;
}
