//! Filesystem-backed object store.
//!
//! Buckets are directories under a root, keys are relative paths, values
//! are pretty-printed JSON files. Used by the CLI for offline snapshot
//! inspection and by tests that want a durable store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::traits::{ObjectStore, ObjectSummary};

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsObjectStore { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn collect_keys(dir: &Path, bucket_root: &Path, out: &mut Vec<ObjectSummary>) -> ServiceResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::collect_keys(&path, bucket_root, out)?;
            } else {
                let key = path
                    .strip_prefix(bucket_root)
                    .map_err(|e| ServiceError::Other(e.to_string()))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let modified = entry.metadata()?.modified()?;
                out.push(ObjectSummary {
                    key,
                    last_modified: DateTime::<Utc>::from(modified),
                });
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn put_json(&self, bucket: &str, key: &str, value: &Value) -> ServiceResult<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec_pretty(value)?)?;
        debug!(bucket, key, "object written");
        Ok(())
    }

    fn get_json(&self, bucket: &str, key: &str) -> ServiceResult<Value> {
        let path = self.object_path(bucket, key);
        if !path.exists() {
            return Err(ServiceError::NotFound(format!("{bucket}/{key}")));
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> ServiceResult<Vec<ObjectSummary>> {
        let bucket_root = self.root.join(bucket);
        if !bucket_root.exists() {
            return Ok(Vec::new());
        }
        let mut all = Vec::new();
        Self::collect_keys(&bucket_root, &bucket_root, &mut all)?;
        all.retain(|summary| summary.key.starts_with(prefix));
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }
}
