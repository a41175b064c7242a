//! In-memory collaborator doubles.
//!
//! Single-threaded fakes with just enough behavior for planner, monitor
//! and runner tests: capacity changes are recorded, job state is settable,
//! and the failure modes the protocol must tolerate (decrease limit,
//! account limit, job-creation budget) can be switched on per test.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use tablevault_core::types::{ScalableTarget, ScalingPolicy, ServiceLimits, TableDescriptor};
use tablevault_wire::{WireObject, WireParameter, WireValue};

use crate::error::{ServiceError, ServiceResult};
use crate::traits::*;

// ── Table store ────────────────────────────────────────────────────

pub struct InMemoryTableStore {
    tables: RefCell<BTreeMap<String, TableDescriptor>>,
    limits: Cell<ServiceLimits>,
    reject_decreases: Cell<bool>,
    reject_increases: Cell<bool>,
    capacity_changes: RefCell<Vec<(String, u64)>>,
}

impl InMemoryTableStore {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        InMemoryTableStore {
            tables: RefCell::new(
                tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
            ),
            limits: Cell::new(ServiceLimits {
                table_max_read_capacity: 40_000,
                table_max_write_capacity: 40_000,
            }),
            reject_decreases: Cell::new(false),
            reject_increases: Cell::new(false),
            capacity_changes: RefCell::new(Vec::new()),
        }
    }

    pub fn set_limits(&self, limits: ServiceLimits) {
        self.limits.set(limits);
    }

    /// Make subsequent read-capacity decreases fail with the per-day cap.
    pub fn reject_decreases(&self, reject: bool) {
        self.reject_decreases.set(reject);
    }

    /// Make subsequent read-capacity increases fail with the account cap.
    pub fn reject_increases(&self, reject: bool) {
        self.reject_increases.set(reject);
    }

    pub fn read_capacity(&self, name: &str) -> Option<u64> {
        self.tables.borrow().get(name).map(|t| t.read_capacity_units)
    }

    /// Applied read-capacity changes, in call order.
    pub fn capacity_changes(&self) -> Vec<(String, u64)> {
        self.capacity_changes.borrow().clone()
    }
}

impl TableStore for InMemoryTableStore {
    fn list_tables(&self) -> ServiceResult<Vec<String>> {
        Ok(self.tables.borrow().keys().cloned().collect())
    }

    fn describe_table(&self, name: &str) -> ServiceResult<TableDescriptor> {
        self.tables
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("table {name}")))
    }

    fn describe_limits(&self) -> ServiceResult<ServiceLimits> {
        Ok(self.limits.get())
    }

    fn change_capacity(
        &self,
        name: &str,
        read_capacity_units: Option<u64>,
        write_capacity_units: Option<u64>,
    ) -> ServiceResult<()> {
        let mut tables = self.tables.borrow_mut();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| ServiceError::NotFound(format!("table {name}")))?;

        if let Some(read) = read_capacity_units
            && read != table.read_capacity_units
        {
            if read < table.read_capacity_units && self.reject_decreases.get() {
                return Err(ServiceError::DecreaseLimitExceeded(format!(
                    "read capacity of {name} decreased too often"
                )));
            }
            if read > table.read_capacity_units && self.reject_increases.get() {
                return Err(ServiceError::LimitExceeded(format!(
                    "account read capacity ceiling hit for {name}"
                )));
            }
            table.read_capacity_units = read;
            self.capacity_changes.borrow_mut().push((name.to_string(), read));
        }

        if let Some(write) = write_capacity_units
            && write != table.write_capacity_units
        {
            table.write_capacity_units = write;
        }

        Ok(())
    }
}

// ── Job service ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct JobEntry {
    objects: Vec<WireObject>,
    parameters: Vec<WireParameter>,
    values: Vec<WireValue>,
    activated: bool,
    status: String,
}

#[derive(Default)]
pub struct InMemoryJobService {
    jobs: RefCell<BTreeMap<String, JobEntry>>,
    next_id: Cell<u32>,
    create_budget: Cell<Option<u32>>,
}

impl InMemoryJobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many more jobs may be created before the account cap hits.
    pub fn set_create_budget(&self, budget: u32) {
        self.create_budget.set(Some(budget));
    }

    pub fn set_status(&self, job_id: &str, status: &str) {
        if let Some(entry) = self.jobs.borrow_mut().get_mut(job_id) {
            entry.status = status.to_string();
        }
    }

    pub fn is_activated(&self, job_id: &str) -> bool {
        self.jobs
            .borrow()
            .get(job_id)
            .map(|e| e.activated)
            .unwrap_or(false)
    }

    pub fn definition_objects(&self, job_id: &str) -> Vec<WireObject> {
        self.jobs
            .borrow()
            .get(job_id)
            .map(|e| e.objects.clone())
            .unwrap_or_default()
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.jobs.borrow().keys().cloned().collect()
    }
}

impl JobService for InMemoryJobService {
    fn create_job(&self) -> ServiceResult<String> {
        if let Some(budget) = self.create_budget.get() {
            if budget == 0 {
                return Err(ServiceError::LimitExceeded(
                    "job count limit reached".to_string(),
                ));
            }
            self.create_budget.set(Some(budget - 1));
        }

        let id = format!("job-{:04}", self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.jobs.borrow_mut().insert(
            id.clone(),
            JobEntry {
                status: "PENDING".to_string(),
                ..JobEntry::default()
            },
        );
        Ok(id)
    }

    fn put_job_definition(
        &self,
        job_id: &str,
        objects: &[WireObject],
        parameters: &[WireParameter],
        values: &[WireValue],
    ) -> ServiceResult<()> {
        let mut jobs = self.jobs.borrow_mut();
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| ServiceError::NotFound(format!("job {job_id}")))?;
        entry.objects = objects.to_vec();
        entry.parameters = parameters.to_vec();
        entry.values = values.to_vec();
        Ok(())
    }

    fn activate_job(&self, job_id: &str, _values: &[WireValue]) -> ServiceResult<()> {
        let mut jobs = self.jobs.borrow_mut();
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| ServiceError::NotFound(format!("job {job_id}")))?;
        entry.activated = true;
        entry.status = "RUNNING".to_string();
        Ok(())
    }

    fn list_jobs(&self) -> ServiceResult<Vec<String>> {
        Ok(self.job_ids())
    }

    fn describe_jobs(&self, job_ids: &[String]) -> ServiceResult<Vec<JobStatus>> {
        let jobs = self.jobs.borrow();
        Ok(job_ids
            .iter()
            .filter_map(|id| {
                jobs.get(id).map(|entry| JobStatus {
                    id: id.clone(),
                    fields: vec![("@status".to_string(), entry.status.clone())],
                })
            })
            .collect())
    }

    fn delete_job(&self, job_id: &str) -> ServiceResult<()> {
        self.jobs
            .borrow_mut()
            .remove(job_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("job {job_id}")))
    }
}

// ── Autoscaling ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAutoscalingService {
    policies: RefCell<Vec<ScalingPolicy>>,
    targets: RefCell<Vec<ScalableTarget>>,
}

impl InMemoryAutoscalingService {
    pub fn new(policies: Vec<ScalingPolicy>, targets: Vec<ScalableTarget>) -> Self {
        InMemoryAutoscalingService {
            policies: RefCell::new(policies),
            targets: RefCell::new(targets),
        }
    }

    pub fn policies(&self) -> Vec<ScalingPolicy> {
        self.policies.borrow().clone()
    }

    pub fn targets(&self) -> Vec<ScalableTarget> {
        self.targets.borrow().clone()
    }
}

impl AutoscalingService for InMemoryAutoscalingService {
    fn describe_scaling_policies(&self, namespace: &str) -> ServiceResult<Vec<ScalingPolicy>> {
        Ok(self
            .policies
            .borrow()
            .iter()
            .filter(|p| p.service_namespace == namespace)
            .cloned()
            .collect())
    }

    fn describe_scalable_targets(&self, namespace: &str) -> ServiceResult<Vec<ScalableTarget>> {
        Ok(self
            .targets
            .borrow()
            .iter()
            .filter(|t| t.service_namespace == namespace)
            .cloned()
            .collect())
    }

    fn put_scaling_policy(&self, policy: &ScalingPolicy) -> ServiceResult<()> {
        let mut policies = self.policies.borrow_mut();
        policies.retain(|p| {
            !(p.policy_name == policy.policy_name
                && p.service_namespace == policy.service_namespace
                && p.resource_id == policy.resource_id
                && p.scalable_dimension == policy.scalable_dimension)
        });
        policies.push(policy.clone());
        Ok(())
    }

    fn delete_scaling_policy(
        &self,
        policy_name: &str,
        namespace: &str,
        resource_id: &str,
        dimension: &str,
    ) -> ServiceResult<()> {
        let mut policies = self.policies.borrow_mut();
        let before = policies.len();
        policies.retain(|p| {
            !(p.policy_name == policy_name
                && p.service_namespace == namespace
                && p.resource_id == resource_id
                && p.scalable_dimension == dimension)
        });
        if policies.len() == before {
            return Err(ServiceError::NotFound(format!(
                "scaling policy {policy_name} for {resource_id}"
            )));
        }
        Ok(())
    }

    fn register_scalable_target(&self, target: &ScalableTarget) -> ServiceResult<()> {
        let mut targets = self.targets.borrow_mut();
        targets.retain(|t| {
            !(t.service_namespace == target.service_namespace
                && t.resource_id == target.resource_id
                && t.scalable_dimension == target.scalable_dimension)
        });
        targets.push(target.clone());
        Ok(())
    }

    fn deregister_scalable_target(
        &self,
        namespace: &str,
        resource_id: &str,
        dimension: &str,
    ) -> ServiceResult<()> {
        let mut targets = self.targets.borrow_mut();
        let before = targets.len();
        targets.retain(|t| {
            !(t.service_namespace == namespace
                && t.resource_id == resource_id
                && t.scalable_dimension == dimension)
        });
        if targets.len() == before {
            return Err(ServiceError::NotFound(format!(
                "scalable target for {resource_id}"
            )));
        }
        Ok(())
    }
}

// ── Object store ───────────────────────────────────────────────────

struct StoredObject {
    value: Value,
    last_modified: DateTime<Utc>,
}

pub struct InMemoryObjectStore {
    objects: RefCell<BTreeMap<(String, String), StoredObject>>,
    tick: Cell<i64>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        InMemoryObjectStore {
            objects: RefCell::new(BTreeMap::new()),
            tick: Cell::new(0),
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
    }

    /// Insert with an explicit modification time (for staleness tests).
    pub fn put_json_at(
        &self,
        bucket: &str,
        key: &str,
        value: Value,
        last_modified: DateTime<Utc>,
    ) {
        self.objects.borrow_mut().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                value,
                last_modified,
            },
        );
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put_json(&self, bucket: &str, key: &str, value: &Value) -> ServiceResult<()> {
        // Monotonic write times so latest-by-time ordering is observable.
        let last_modified = Self::base_time() + Duration::seconds(self.tick.get());
        self.tick.set(self.tick.get() + 1);
        self.put_json_at(bucket, key, value.clone(), last_modified);
        Ok(())
    }

    fn get_json(&self, bucket: &str, key: &str) -> ServiceResult<Value> {
        self.objects
            .borrow()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.value.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("{bucket}/{key}")))
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> ServiceResult<Vec<ObjectSummary>> {
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), o)| ObjectSummary {
                key: k.clone(),
                last_modified: o.last_modified,
            })
            .collect())
    }
}

// ── Notification channel ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub endpoint: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Notification> {
        self.messages.borrow().clone()
    }
}

impl NotificationChannel for RecordingNotifier {
    fn publish(&self, endpoint: &str, subject: &str, body: &str) -> ServiceResult<()> {
        self.messages.borrow_mut().push(Notification {
            endpoint: endpoint.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, rcu: u64) -> TableDescriptor {
        TableDescriptor {
            name: name.to_string(),
            size_bytes: 1024,
            read_capacity_units: rcu,
            write_capacity_units: 5,
            arn: format!("arn:test:tables:eu-west-1:000000000000:table/{name}"),
        }
    }

    #[test]
    fn capacity_change_is_a_noop_when_unchanged() {
        let store = InMemoryTableStore::new(vec![table("orders", 10)]);
        store.change_capacity("orders", Some(10), None).unwrap();
        assert!(store.capacity_changes().is_empty());
    }

    #[test]
    fn decrease_rejection_mode() {
        let store = InMemoryTableStore::new(vec![table("orders", 100)]);
        store.reject_decreases(true);

        let err = store.change_capacity("orders", Some(10), None).unwrap_err();
        assert!(matches!(err, ServiceError::DecreaseLimitExceeded(_)));
        assert_eq!(store.read_capacity("orders"), Some(100));
    }

    #[test]
    fn job_creation_budget_exhausts() {
        let jobs = InMemoryJobService::new();
        jobs.set_create_budget(1);

        assert!(jobs.create_job().is_ok());
        assert!(matches!(
            jobs.create_job().unwrap_err(),
            ServiceError::LimitExceeded(_)
        ));
    }

    #[test]
    fn deleting_an_absent_scaling_policy_is_not_found() {
        let autoscaling = InMemoryAutoscalingService::default();
        let err = autoscaling
            .delete_scaling_policy("p", "tables", "table/orders", "tables:table:ReadCapacityUnits")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn object_store_write_times_are_monotonic() {
        let store = InMemoryObjectStore::new();
        store.put_json("b", "first", &serde_json::json!(1)).unwrap();
        store.put_json("b", "second", &serde_json::json!(2)).unwrap();

        let objects = store.list_objects("b", "").unwrap();
        let first = objects.iter().find(|o| o.key == "first").unwrap();
        let second = objects.iter().find(|o| o.key == "second").unwrap();
        assert!(first.last_modified < second.last_modified);
    }
}
