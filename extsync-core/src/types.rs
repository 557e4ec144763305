//! Domain types for content extensions.
//!
//! Identifiers are newtypes over `String`; all node-id collections are
//! `BTreeSet`s so iteration (and therefore logging and planning) is stable.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Stable extension reference, e.g. `org.learningequality.Kolibri.Content.Demo`.
    ExtensionRef
);
string_newtype!(
    /// Short extension name extracted from its reference.
    ExtensionName
);
string_newtype!(
    /// Opaque content version of an extension.
    Commit
);
string_newtype!(
    /// Identifier of a channel inside a content index.
    ChannelId
);
string_newtype!(
    /// Identifier of a content node inside a channel.
    NodeId
);

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A channel listed in an extension's content index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub channel_id: ChannelId,
    /// Nodes explicitly selected for import. Empty means the whole channel.
    pub include_node_ids: BTreeSet<NodeId>,
    /// Nodes excluded from an otherwise-included channel.
    pub exclude_node_ids: BTreeSet<NodeId>,
}

impl Channel {
    pub fn new(
        channel_id: impl Into<ChannelId>,
        include_node_ids: impl IntoIterator<Item = NodeId>,
        exclude_node_ids: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            include_node_ids: include_node_ids.into_iter().collect(),
            exclude_node_ids: exclude_node_ids.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extension
// ---------------------------------------------------------------------------

/// On-disk form of an [`Extension`], as stored in the snapshot file.
///
/// `content` is the whole content index document so a cached extension can be
/// compared without its content directory still being present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    #[serde(rename = "ref")]
    pub reference: ExtensionRef,
    pub name: ExtensionName,
    pub commit: Commit,
    #[serde(default)]
    pub content: Value,
}

/// A versioned content extension.
///
/// Two extensions are equal iff their `(ref, name, commit)` triples are equal;
/// the content index is not part of the identity. The channel map is derived
/// from `content` once, at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ExtensionRecord", into = "ExtensionRecord")]
pub struct Extension {
    reference: ExtensionRef,
    name: ExtensionName,
    commit: Commit,
    content: Value,
    channels: BTreeMap<ChannelId, Channel>,
}

impl Extension {
    pub fn new(
        reference: impl Into<ExtensionRef>,
        name: impl Into<ExtensionName>,
        commit: impl Into<Commit>,
        content: Value,
    ) -> Self {
        let channels = catalog::channels_from_index(&content);
        Self {
            reference: reference.into(),
            name: name.into(),
            commit: commit.into(),
            content,
            channels,
        }
    }

    pub fn reference(&self) -> &ExtensionRef {
        &self.reference
    }

    pub fn name(&self) -> &ExtensionName {
        &self.name
    }

    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// The raw content index document.
    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn channels(&self) -> &BTreeMap<ChannelId, Channel> {
        &self.channels
    }

    pub fn channel(&self, channel_id: &ChannelId) -> Option<&Channel> {
        self.channels.get(channel_id)
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.keys()
    }

    fn identity(&self) -> (&ExtensionRef, &ExtensionName, &Commit) {
        (&self.reference, &self.name, &self.commit)
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Extension {}

impl Hash for Extension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for Extension {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Extension {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.reference, self.commit)
    }
}

impl From<ExtensionRecord> for Extension {
    fn from(record: ExtensionRecord) -> Self {
        Extension::new(record.reference, record.name, record.commit, record.content)
    }
}

impl From<Extension> for ExtensionRecord {
    fn from(extension: Extension) -> Self {
        ExtensionRecord {
            reference: extension.reference,
            name: extension.name,
            commit: extension.commit,
            content: extension.content,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
