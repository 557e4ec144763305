//! Discovery of the active extension set from host instance metadata.
//!
//! The metadata file is INI-like. Only one key is consulted:
//!
//! ```text
//! [Instance]
//! app-extensions=org.learningequality.Kolibri.Content.Demo=1a2b;org.freedesktop.Foo=3c4d
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::catalog::{load_content_index, ContentLayout, ReferencePattern};
use crate::error::{io_err, CoreError};
use crate::extension_set::ExtensionSet;
use crate::types::{Commit, Extension, ExtensionRef};

const INSTANCE_SECTION: &str = "Instance";
const APP_EXTENSIONS_KEY: &str = "app-extensions";

/// Reads the instance metadata and builds the current [`ExtensionSet`].
#[derive(Debug, Clone)]
pub struct Discovery {
    instance_info: PathBuf,
    layout: ContentLayout,
    pattern: ReferencePattern,
}

impl Discovery {
    pub fn new(
        instance_info: impl Into<PathBuf>,
        layout: ContentLayout,
        pattern: ReferencePattern,
    ) -> Self {
        Self {
            instance_info: instance_info.into(),
            layout,
            pattern,
        }
    }

    pub fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    /// Discover the currently active extensions.
    ///
    /// Never fails: an unreadable metadata file yields an empty set and
    /// unusable entries are skipped.
    pub fn discover(&self) -> ExtensionSet {
        match read_app_extensions(&self.instance_info) {
            Ok(entries) => self.discover_entries(entries),
            Err(err) => {
                tracing::warn!("cannot read instance metadata: {}", err);
                ExtensionSet::new()
            }
        }
    }

    /// Build the extension set from already parsed `(ref, commit)` pairs.
    pub fn discover_entries(
        &self,
        entries: impl IntoIterator<Item = (ExtensionRef, Commit)>,
    ) -> ExtensionSet {
        let mut set = ExtensionSet::new();
        for (reference, commit) in entries {
            let Some(name) = self.pattern.name_of(reference.as_str()) else {
                tracing::debug!("ignoring non-content extension {}", reference);
                continue;
            };
            if !self.layout.is_complete(&name) {
                tracing::warn!(
                    "skipping extension {}: no content index under {}",
                    reference,
                    self.layout.content_dir(&name).display()
                );
                continue;
            }
            let content = load_content_index(&self.layout.index_path(&name));
            set.insert(Extension::new(reference, name, commit, content));
        }
        set
    }
}

/// Read the `app-extensions` entry of the `[Instance]` section.
///
/// A missing file means no extensions are active.
pub fn read_app_extensions(path: &Path) -> Result<Vec<(ExtensionRef, Commit)>, CoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(io_err(path, err)),
    };
    Ok(instance_value(&contents, APP_EXTENSIONS_KEY)
        .map(parse_app_extensions)
        .unwrap_or_default())
}

/// Parse `ref=commit;ref=commit` into pairs, skipping malformed items.
pub fn parse_app_extensions(value: &str) -> Vec<(ExtensionRef, Commit)> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| match item.split_once('=') {
            Some((reference, commit)) if !reference.is_empty() && !commit.is_empty() => {
                Some((ExtensionRef::from(reference), Commit::from(commit)))
            }
            _ => {
                tracing::warn!("skipping malformed app extension entry '{}'", item);
                None
            }
        })
        .collect()
}

/// Value of `key` inside the `[Instance]` section, if any.
fn instance_value<'a>(contents: &'a str, key: &str) -> Option<&'a str> {
    let mut in_section = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = section.trim() == INSTANCE_SECTION;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim());
            }
        }
    }
    None
}
