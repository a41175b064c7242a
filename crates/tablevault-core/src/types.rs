//! Domain types shared across the tablevault crates.
//!
//! These represent the immutable per-invocation snapshot of a table, the
//! autoscaling state captured before a backup window, and the persisted
//! capacity snapshot consumed by the restore pass. All types serialize
//! to/from JSON for storage through the object store.

use serde::{Deserialize, Serialize};

/// Immutable description of a managed table, fetched fresh each invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    /// Total stored size in bytes. Zero-size tables are skipped by callers.
    pub size_bytes: u64,
    /// Provisioned read throughput (read capacity units).
    pub read_capacity_units: u64,
    /// Provisioned write throughput (write capacity units).
    pub write_capacity_units: u64,
    pub arn: String,
}

/// Service-reported provisioning ceilings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceLimits {
    /// Maximum read capacity a single table may be provisioned with.
    pub table_max_read_capacity: u64,
    /// Maximum write capacity a single table may be provisioned with.
    pub table_max_write_capacity: u64,
}

/// A scaling policy captured before the backup window, scoped by
/// (namespace, resource id, dimension).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingPolicy {
    pub policy_name: String,
    pub service_namespace: String,
    pub resource_id: String,
    pub scalable_dimension: String,
    pub policy_type: String,
    /// Opaque target-tracking configuration, replayed verbatim on restore.
    pub target_tracking: serde_json::Value,
}

/// A scalable target captured before the backup window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalableTarget {
    pub service_namespace: String,
    pub resource_id: String,
    pub scalable_dimension: String,
    pub min_capacity: u64,
    pub max_capacity: u64,
    pub role_arn: String,
}

/// One externally created backup job: its service-assigned id, the tables
/// it covers, and the structural definition tree handed to the translator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub job_id: String,
    pub tables: Vec<String>,
    pub definition: serde_json::Value,
}

/// Pre-backup throughput and autoscaling state, persisted once per backup
/// window and read exactly once per restore. Never mutated in place; a new
/// window writes a newer key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CapacitySnapshot {
    pub tables: Vec<TableDescriptor>,
    pub jobs: Vec<JobRecord>,
    pub scaling_policies: Vec<ScalingPolicy>,
    pub scalable_targets: Vec<ScalableTarget>,
}

impl TableDescriptor {
    /// Resource id used to scope autoscaling operations for this table.
    pub fn resource_id(&self) -> String {
        format!("table/{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableDescriptor {
        TableDescriptor {
            name: name.to_string(),
            size_bytes: 1024,
            read_capacity_units: 10,
            write_capacity_units: 5,
            arn: format!("arn:test:tables:eu-west-1:000000000000:table/{name}"),
        }
    }

    #[test]
    fn resource_id_is_table_scoped() {
        assert_eq!(table("orders").resource_id(), "table/orders");
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = CapacitySnapshot {
            tables: vec![table("orders")],
            jobs: vec![JobRecord {
                job_id: "job-1".to_string(),
                tables: vec!["orders".to_string()],
                definition: serde_json::json!({"objects": []}),
            }],
            scaling_policies: vec![],
            scalable_targets: vec![ScalableTarget {
                service_namespace: "tables".to_string(),
                resource_id: "table/orders".to_string(),
                scalable_dimension: "tables:table:ReadCapacityUnits".to_string(),
                min_capacity: 5,
                max_capacity: 100,
                role_arn: "arn:test:iam::000000000000:role/autoscale".to_string(),
            }],
        };

        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let back: CapacitySnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, snapshot);
    }
}
