//! Structural rendering of job definitions.
//!
//! Instead of substituting into a text template, the definition tree is
//! built directly as JSON: a `Default` node, one cluster node, and per
//! table a source data node, a backup location node and a backup activity
//! wiring them together through `{"ref": id}` edges. The tree is what the
//! wire translator flattens and what the planner inspects for
//! `tableName` nodes.

use serde_json::{Value, json};

use crate::cluster::ClusterProfile;

/// Everything the renderer needs besides the table list.
pub struct RenderContext<'a> {
    pub read_throughput_fraction: f64,
    pub subnet_id: &'a str,
    pub region: &'a str,
    pub backup_bucket: &'a str,
    pub log_location: &'a str,
    pub max_retries: u32,
    pub terminate_after_hours: u64,
    /// Timestamp suffix shared by every backup location in this run.
    pub date_suffix: &'a str,
    pub profile: &'a ClusterProfile,
}

pub fn render_definition(tables: &[String], ctx: &RenderContext<'_>) -> Value {
    let mut objects = vec![
        json!({
            "id": "Default",
            "scheduleType": "ondemand",
            "failureAndRerunMode": "CASCADE",
            "role": "BackupServiceRole",
            "resourceRole": "BackupResourceRole",
            "logUri": ctx.log_location,
        }),
        json!({
            "id": "ClusterForBackup",
            "type": "ComputeCluster",
            "masterInstanceType": ctx.profile.master_instance_type,
            "coreInstanceType": ctx.profile.core_instance_type,
            "coreInstanceCount": ctx.profile.core_instance_count,
            "clusterMemory": ctx.profile.cluster_memory,
            "subnetId": ctx.subnet_id,
            "region": ctx.region,
            "terminateAfter": format!("{} Hour", ctx.terminate_after_hours),
        }),
    ];

    for (index, table) in tables.iter().enumerate() {
        objects.push(json!({
            "id": format!("SourceTable{index}"),
            "type": "TableDataNode",
            "tableName": table,
            "readThroughputPercent": ctx.read_throughput_fraction.to_string(),
            "region": ctx.region,
        }));
        objects.push(json!({
            "id": format!("BackupLocation{index}"),
            "type": "StorageDataNode",
            "directoryPath": format!(
                "s3://{}/{}/{}",
                ctx.backup_bucket, table, ctx.date_suffix
            ),
        }));
        objects.push(json!({
            "id": format!("TableBackupActivity{index}"),
            "type": "BackupActivity",
            "input": {"ref": format!("SourceTable{index}")},
            "output": {"ref": format!("BackupLocation{index}")},
            "runsOn": {"ref": "ClusterForBackup"},
            "maximumRetries": ctx.max_retries.to_string(),
        }));
    }

    json!({
        "objects": objects,
        "parameters": [
            {
                "id": "myReadThroughputRatio",
                "type": "Double",
                "description": "share of table read throughput used by backup reads",
            },
        ],
        "values": {
            "myReadThroughputRatio": ctx.read_throughput_fraction.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::CLUSTER_PROFILES;

    fn context(profile: &'static ClusterProfile) -> RenderContext<'static> {
        RenderContext {
            read_throughput_fraction: 0.5,
            subnet_id: "subnet-0abc",
            region: "eu-west-1",
            backup_bucket: "euw1-table-backups",
            log_location: "euw1-table-backup-logs/logs/2024-03-10-00-00-00",
            max_retries: 2,
            terminate_after_hours: 5,
            date_suffix: "2024-03-10-00-00-00",
            profile,
        }
    }

    #[test]
    fn renders_three_nodes_per_table() {
        let tables = vec!["orders".to_string(), "sessions".to_string()];
        let definition = render_definition(&tables, &context(&CLUSTER_PROFILES[0]));

        let objects = definition["objects"].as_array().unwrap();
        // Default + cluster + 3 per table.
        assert_eq!(objects.len(), 2 + 3 * tables.len());
    }

    #[test]
    fn activities_reference_their_nodes() {
        let tables = vec!["orders".to_string()];
        let definition = render_definition(&tables, &context(&CLUSTER_PROFILES[0]));

        let objects = definition["objects"].as_array().unwrap();
        let activity = objects
            .iter()
            .find(|o| o["id"] == "TableBackupActivity0")
            .unwrap();
        assert_eq!(activity["input"]["ref"], "SourceTable0");
        assert_eq!(activity["output"]["ref"], "BackupLocation0");
        assert_eq!(activity["runsOn"]["ref"], "ClusterForBackup");
    }

    #[test]
    fn every_ref_targets_an_emitted_id() {
        let tables = vec!["orders".to_string(), "sessions".to_string()];
        let definition = render_definition(&tables, &context(&CLUSTER_PROFILES[1]));

        let objects = definition["objects"].as_array().unwrap();
        let ids: Vec<&str> = objects
            .iter()
            .filter_map(|o| o["id"].as_str())
            .collect();
        for object in objects {
            for (_, value) in object.as_object().unwrap() {
                if let Some(target) = value.get("ref").and_then(Value::as_str) {
                    assert!(ids.contains(&target), "dangling ref to {target}");
                }
            }
        }
    }

    #[test]
    fn backup_locations_carry_the_date_suffix() {
        let tables = vec!["audit".to_string()];
        let definition = render_definition(&tables, &context(&CLUSTER_PROFILES[0]));

        let objects = definition["objects"].as_array().unwrap();
        let location = objects
            .iter()
            .find(|o| o["id"] == "BackupLocation0")
            .unwrap();
        assert_eq!(
            location["directoryPath"],
            "s3://euw1-table-backups/audit/2024-03-10-00-00-00"
        );
    }

    #[test]
    fn values_bind_the_read_ratio() {
        let definition = render_definition(&[], &context(&CLUSTER_PROFILES[0]));
        assert_eq!(definition["values"]["myReadThroughputRatio"], "0.5");
    }
}
