use std::path::Path;

use anyhow::Context;

use tablevault_core::AccountConfig;
use tablevault_core::types::TableDescriptor;

pub mod plan;
pub mod render;
pub mod snapshot;

/// Load the account configuration, or fall back to an offline default
/// good enough for previews.
fn load_config(path: Option<&Path>) -> anyhow::Result<AccountConfig> {
    match path {
        Some(path) => AccountConfig::from_file(path)
            .with_context(|| format!("reading account configuration from {}", path.display())),
        None => Ok(AccountConfig {
            account: "offline".to_string(),
            region: "local".to_string(),
            backup_bucket: "backups".to_string(),
            log_bucket: "logs".to_string(),
            subnet_id: "subnet-local".to_string(),
            notify_endpoint: "local".to_string(),
            exclude_from_backup: Vec::new(),
            max_retries: None,
            read_throughput_fraction: None,
        }),
    }
}

fn load_tables(path: &Path) -> anyhow::Result<Vec<TableDescriptor>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading table descriptors from {}", path.display()))?;
    serde_json::from_slice(&bytes).context("parsing table descriptors")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_descriptors_parse_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.json");
        std::fs::write(
            &path,
            r#"[{"name": "orders", "size_bytes": 1024, "read_capacity_units": 10,
                "write_capacity_units": 5,
                "arn": "arn:test:tables:eu-west-1:000000000000:table/orders"}]"#,
        )
        .unwrap();

        let tables = load_tables(&path).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
    }

    #[test]
    fn missing_config_falls_back_to_offline_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.backup_bucket, "backups");
        assert_eq!(config.read_throughput_fraction(), 0.5);
    }
}
