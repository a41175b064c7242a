use std::path::Path;

use serde_json::Value;

use tablevault_planner::SNAPSHOT_PREFIX;
use tablevault_services::{FsObjectStore, ObjectStore};

pub fn show(dir: &Path, bucket: &str) -> anyhow::Result<()> {
    let store = FsObjectStore::new(dir);

    match latest_snapshot(&store, bucket)? {
        Some((key, value)) => {
            println!("{key}");
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        None => println!("No capacity snapshot found in {}/{bucket}.", dir.display()),
    }
    Ok(())
}

/// Newest snapshot by modification time, key as tie breaker.
fn latest_snapshot(
    store: &dyn ObjectStore,
    bucket: &str,
) -> anyhow::Result<Option<(String, Value)>> {
    let mut summaries = store.list_objects(bucket, SNAPSHOT_PREFIX)?;
    summaries.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| b.key.cmp(&a.key))
    });

    let Some(latest) = summaries.first() else {
        return Ok(None);
    };
    let value = store.get_json(bucket, &latest.key)?;
    Ok(Some((latest.key.clone(), value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn latest_snapshot_prefers_the_newest_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store
            .put_json("backups", "backup_metadata-2024-03-09-00-00-00", &json!(1))
            .unwrap();
        store
            .put_json("backups", "backup_metadata-2024-03-10-00-00-00", &json!(2))
            .unwrap();

        let (key, value) = latest_snapshot(&store, "backups").unwrap().unwrap();
        assert_eq!(key, "backup_metadata-2024-03-10-00-00-00");
        assert_eq!(value, json!(2));
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(latest_snapshot(&store, "backups").unwrap().is_none());
    }
}
