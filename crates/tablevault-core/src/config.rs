//! Account configuration parser.
//!
//! One TOML file per account describes the buckets, network placement and
//! table exclusions for that account's backup runs.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::estimate::INITIAL_READ_THROUGHPUT_FRACTION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account identifier, used in notification subjects.
    pub account: String,
    pub region: String,
    /// Bucket receiving backup data and capacity snapshots.
    pub backup_bucket: String,
    /// Bucket receiving job execution logs.
    pub log_bucket: String,
    /// Subnet the backup clusters are launched into.
    pub subnet_id: String,
    /// Notification channel endpoint for failure summaries.
    pub notify_endpoint: String,
    /// Tables matching any of these patterns are never backed up.
    #[serde(default)]
    pub exclude_from_backup: Vec<String>,
    /// Per-activity retry count before a job gives up on a table.
    pub max_retries: Option<u32>,
    /// Share of read throughput used for backup reads.
    pub read_throughput_fraction: Option<f64>,
}

impl AccountConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AccountConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(2)
    }

    pub fn read_throughput_fraction(&self) -> f64 {
        self.read_throughput_fraction
            .unwrap_or(INITIAL_READ_THROUGHPUT_FRACTION)
    }

    /// Compile the exclusion patterns. Patterns are anchored at the start
    /// of the table name, matching the original match-from-start behavior.
    pub fn exclusion_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.exclude_from_backup
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{p})")).map_err(|source| ConfigError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect()
    }
}
