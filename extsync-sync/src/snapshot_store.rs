//! Snapshot store — the last committed extension set.
//!
//! Persists a JSON array of [`ExtensionRecord`]s at
//! `<data_dir>/content-extensions.json`, each carrying its full content index.
//! Writes use the atomic `.tmp` + rename pattern.
//!
//! Reads never fail: a missing, corrupt or legacy snapshot is an empty
//! baseline. Writes propagate every error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use extsync_core::{Config, Discovery, ExtensionRecord, ExtensionSet};

use crate::error::{io_err, SyncError};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotCompat {
    Records(Vec<ExtensionRecord>),
    /// Older wrappers stored `{ "<name>": "<commit>" }` without refs or
    /// content indexes.
    Legacy(BTreeMap<String, String>),
}

/// Load the snapshot at `path`.
///
/// Returns an empty set if the file is absent, unreadable, or unparsable.
pub fn load_at(path: &Path) -> ExtensionSet {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no snapshot at {}", path.display());
            return ExtensionSet::new();
        }
        Err(err) => {
            tracing::warn!("cannot read snapshot {}: {}", path.display(), err);
            return ExtensionSet::new();
        }
    };
    match serde_json::from_str::<SnapshotCompat>(&contents) {
        Ok(SnapshotCompat::Records(records)) => records.into_iter().map(Into::into).collect(),
        Ok(SnapshotCompat::Legacy(entries)) => {
            tracing::info!(
                "snapshot {} uses the legacy format ({} entries); treating as empty",
                path.display(),
                entries.len()
            );
            ExtensionSet::new()
        }
        Err(err) => {
            tracing::warn!("corrupt snapshot {}: {}", path.display(), err);
            ExtensionSet::new()
        }
    }
}

/// Save `set` to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, set: &ExtensionSet) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid snapshot path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let records: Vec<ExtensionRecord> = set.iter().cloned().map(Into::into).collect();
    let json = serde_json::to_string_pretty(&records)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Cached and current extension sets for one installation.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshot_path: PathBuf,
    lock_path: PathBuf,
    discovery: Discovery,
}

impl SnapshotStore {
    pub fn new(
        snapshot_path: impl Into<PathBuf>,
        lock_path: impl Into<PathBuf>,
        discovery: Discovery,
    ) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            lock_path: lock_path.into(),
            discovery,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let discovery = Discovery::new(
            &config.instance_info,
            config.layout(),
            config.reference_pattern()?,
        );
        Ok(Self::new(
            config.snapshot_path()?,
            config.lock_path()?,
            discovery,
        ))
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// The last committed extension set.
    pub fn load_cached(&self) -> ExtensionSet {
        load_at(&self.snapshot_path)
    }

    /// The extensions active right now.
    pub fn discover_current(&self) -> ExtensionSet {
        self.discovery.discover()
    }

    /// Make `set` the new cached baseline.
    pub fn commit(&self, set: &ExtensionSet) -> Result<(), SyncError> {
        save_at(&self.snapshot_path, set)?;
        tracing::info!(
            "committed snapshot with {} extension(s) to {}",
            set.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extsync_core::{ChannelId, Extension};
    use serde_json::json;
    use tempfile::TempDir;

    fn demo(commit: &str) -> Extension {
        Extension::new(
            "org.learningequality.Kolibri.Content.Demo",
            "Demo",
            commit,
            json!({"channels": [{"channel_id": "c1", "node_ids": ["a"], "exclude_node_ids": []}]}),
        )
    }

    fn snapshot_path(tmp: &TempDir) -> PathBuf {
        tmp.path().join("data").join("content-extensions.json")
    }

    #[test]
    fn empty_set_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(load_at(&snapshot_path(&tmp)).is_empty());
    }

    #[test]
    fn roundtrip_save_load_keeps_channels() {
        let tmp = TempDir::new().unwrap();
        let path = snapshot_path(&tmp);
        let set: ExtensionSet = [demo("1")].into_iter().collect();

        save_at(&path, &set).unwrap();
        let loaded = load_at(&path);
        assert_eq!(loaded, set);
        let ext = loaded.iter().next().unwrap();
        assert!(ext.channel(&ChannelId::from("c1")).is_some());
    }

    #[test]
    fn snapshot_is_a_json_array_of_records() {
        let tmp = TempDir::new().unwrap();
        let path = snapshot_path(&tmp);
        save_at(&path, &[demo("1")].into_iter().collect()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let records = raw.as_array().expect("array");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["ref"], "org.learningequality.Kolibri.Content.Demo");
        assert_eq!(records[0]["content"]["channels"][0]["channel_id"], "c1");
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = snapshot_path(&tmp);
        save_at(&path, &ExtensionSet::new()).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_snapshot_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = snapshot_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[{\"ref\": 1").unwrap();
        assert!(load_at(&path).is_empty());
    }

    #[test]
    fn legacy_name_commit_map_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = snapshot_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"Demo": "abc123"}"#).unwrap();
        assert!(load_at(&path).is_empty());
    }

    #[test]
    fn save_into_file_parent_fails() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a dir").unwrap();
        let err = save_at(&blocker.join("content-extensions.json"), &ExtensionSet::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
    }
}
