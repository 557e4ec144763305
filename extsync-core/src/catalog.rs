//! Content index parsing, reference pattern and on-disk layout of extensions.
//!
//! # Storage layout
//!
//! ```text
//! <extensions_dir>/
//!   <name>/
//!     content/
//!       content.json   (content index: { "channels": [ ... ] })
//!       ...            (channel databases and files)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{Channel, ChannelId, ExtensionName, NodeId};

/// File name of the content index inside an extension's content directory.
pub const CONTENT_INDEX_FILE: &str = "content.json";

// ---------------------------------------------------------------------------
// 1. Reference pattern
// ---------------------------------------------------------------------------

/// Matches extension references of the form `<prefix>.<Name>`.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    regex: Regex,
}

impl ReferencePattern {
    /// Build a pattern for references starting with `prefix`
    /// (e.g. `org.learningequality.Kolibri.Content`).
    pub fn new(prefix: &str) -> Result<Self, CoreError> {
        let regex = Regex::new(&format!(r"^{}\.(?P<name>\w+)$", regex::escape(prefix)))?;
        Ok(Self { regex })
    }

    /// Extract the extension name from `reference`, or `None` if it does not
    /// belong to this pattern.
    pub fn name_of(&self, reference: &str) -> Option<ExtensionName> {
        self.regex
            .captures(reference)
            .and_then(|caps| caps.name("name"))
            .map(|m| ExtensionName::from(m.as_str()))
    }
}

// ---------------------------------------------------------------------------
// 2. Layout
// ---------------------------------------------------------------------------

/// Resolves where an extension's content lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    extensions_dir: PathBuf,
}

impl ContentLayout {
    pub fn new(extensions_dir: impl Into<PathBuf>) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
        }
    }

    /// `<extensions_dir>/<name>/`
    pub fn base_dir(&self, name: &ExtensionName) -> PathBuf {
        self.extensions_dir.join(name.as_str())
    }

    /// `<extensions_dir>/<name>/content/`
    pub fn content_dir(&self, name: &ExtensionName) -> PathBuf {
        self.base_dir(name).join("content")
    }

    /// `<extensions_dir>/<name>/content/content.json`
    pub fn index_path(&self, name: &ExtensionName) -> PathBuf {
        self.content_dir(name).join(CONTENT_INDEX_FILE)
    }

    /// An extension is usable once both its content directory and its
    /// content index exist.
    pub fn is_complete(&self, name: &ExtensionName) -> bool {
        self.content_dir(name).is_dir() && self.index_path(name).is_file()
    }
}

// ---------------------------------------------------------------------------
// 3. Content index
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    channel_id: ChannelId,
    #[serde(default)]
    node_ids: Option<Vec<NodeId>>,
    #[serde(default)]
    exclude_node_ids: Option<Vec<NodeId>>,
}

/// Read a content index document.
///
/// A missing or unreadable index yields an empty object; the extension then
/// simply has no channels.
pub fn load_content_index(path: &Path) -> Value {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!("cannot read content index {}: {}", path.display(), err);
            return Value::Object(Default::default());
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("cannot parse content index {}: {}", path.display(), err);
            Value::Object(Default::default())
        }
    }
}

/// Build the channel map of a content index document.
///
/// Only `channels[].channel_id`, `node_ids` and `exclude_node_ids` are read.
/// Entries without a usable `channel_id` are skipped; for duplicate ids the
/// first entry wins.
pub fn channels_from_index(index: &Value) -> BTreeMap<ChannelId, Channel> {
    let mut channels = BTreeMap::new();
    let Some(entries) = index.get("channels").and_then(Value::as_array) else {
        return channels;
    };

    for entry in entries {
        let entry: ChannelEntry = match ChannelEntry::deserialize(entry) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping malformed channel entry: {}", err);
                continue;
            }
        };
        if channels.contains_key(&entry.channel_id) {
            tracing::warn!("duplicate channel {} in content index", entry.channel_id);
            continue;
        }
        let channel = Channel::new(
            entry.channel_id.clone(),
            entry.node_ids.unwrap_or_default(),
            entry.exclude_node_ids.unwrap_or_default(),
        );
        channels.insert(entry.channel_id, channel);
    }
    channels
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    const PREFIX: &str = "org.learningequality.Kolibri.Content";

    #[rstest]
    #[case("org.learningequality.Kolibri.Content.Demo", Some("Demo"))]
    #[case("org.learningequality.Kolibri.Content.khan_academy", Some("khan_academy"))]
    #[case("org.learningequality.Kolibri.Content", None)]
    #[case("org.learningequality.Kolibri.Content.a.b", None)]
    #[case("org.freedesktop.Platform.GL.default", None)]
    #[case("orgXlearningequality.Kolibri.Content.Demo", None)]
    fn reference_pattern(#[case] reference: &str, #[case] expected: Option<&str>) {
        let pattern = ReferencePattern::new(PREFIX).expect("pattern");
        assert_eq!(pattern.name_of(reference), expected.map(ExtensionName::from));
    }

    #[test]
    fn channels_parse_include_and_exclude_sets() {
        let index = json!({
            "channels": [
                {"channel_id": "c1", "node_ids": ["b", "a", "a"], "exclude_node_ids": ["x"]},
                {"channel_id": "c2"}
            ]
        });
        let channels = channels_from_index(&index);
        assert_eq!(channels.len(), 2);

        let c1 = &channels[&ChannelId::from("c1")];
        assert_eq!(c1.include_node_ids.len(), 2);
        assert!(c1.exclude_node_ids.contains(&NodeId::from("x")));

        let c2 = &channels[&ChannelId::from("c2")];
        assert!(c2.include_node_ids.is_empty());
        assert!(c2.exclude_node_ids.is_empty());
    }

    #[test]
    fn null_node_lists_are_empty() {
        let index = json!({"channels": [{"channel_id": "c1", "node_ids": null, "exclude_node_ids": null}]});
        let channels = channels_from_index(&index);
        assert!(channels[&ChannelId::from("c1")].include_node_ids.is_empty());
    }

    #[test]
    fn malformed_and_duplicate_entries_are_skipped() {
        let index = json!({
            "channels": [
                {"node_ids": ["a"]},
                {"channel_id": "c1", "node_ids": ["first"]},
                {"channel_id": "c1", "node_ids": ["second"]}
            ]
        });
        let channels = channels_from_index(&index);
        assert_eq!(channels.len(), 1);
        assert!(channels[&ChannelId::from("c1")]
            .include_node_ids
            .contains(&NodeId::from("first")));
    }

    #[test]
    fn non_object_index_has_no_channels() {
        assert!(channels_from_index(&Value::Null).is_empty());
        assert!(channels_from_index(&json!([1, 2])).is_empty());
    }

    #[test]
    fn layout_paths() {
        let layout = ContentLayout::new("/app/share/kolibri-content");
        let name = ExtensionName::from("Demo");
        assert!(layout
            .index_path(&name)
            .ends_with("kolibri-content/Demo/content/content.json"));
    }

    #[test]
    fn unreadable_index_yields_empty_object() {
        let tmp = TempDir::new().unwrap();
        let missing = load_content_index(&tmp.path().join("content.json"));
        assert_eq!(missing, json!({}));

        let corrupt = tmp.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert_eq!(load_content_index(&corrupt), json!({}));
    }

    #[test]
    fn completeness_requires_dir_and_index() {
        let tmp = TempDir::new().unwrap();
        let layout = ContentLayout::new(tmp.path());
        let name = ExtensionName::from("Demo");
        assert!(!layout.is_complete(&name));

        std::fs::create_dir_all(layout.content_dir(&name)).unwrap();
        assert!(!layout.is_complete(&name));

        std::fs::write(layout.index_path(&name), "{}").unwrap();
        assert!(layout.is_complete(&name));
    }
}
