//! Snapshot differ: cached → current comparison of extension sets.
//!
//! Comparison is directional. [`compare`] yields one [`ComparisonRecord`] per
//! changed reference; each record classifies the union of its channel ids and
//! computes node-id deltas for channels present on both sides.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use extsync_core::{Channel, ChannelId, Extension, ExtensionRef, ExtensionSet, NodeId};

/// How an extension reference changed between cached and current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionChange {
    Removed,
    Updated,
    Added,
}

impl std::fmt::Display for ExtensionChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionChange::Removed => write!(f, "removed"),
            ExtensionChange::Updated => write!(f, "updated"),
            ExtensionChange::Added => write!(f, "added"),
        }
    }
}

/// Comparison of one changed reference. Built during a single pass only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonRecord<'a> {
    pub reference: &'a ExtensionRef,
    pub old: Option<&'a Extension>,
    pub new: Option<&'a Extension>,
}

impl<'a> ComparisonRecord<'a> {
    pub fn change(&self) -> ExtensionChange {
        match (self.old, self.new) {
            (None, _) => ExtensionChange::Added,
            (_, None) => ExtensionChange::Removed,
            (Some(_), Some(_)) => ExtensionChange::Updated,
        }
    }

    /// Every channel id present on either side, in id order.
    pub fn channels(&self) -> Vec<ChannelComparison<'a>> {
        let old_channels = self.old.map(Extension::channels);
        let new_channels = self.new.map(Extension::channels);

        let ids: BTreeSet<&'a ChannelId> = old_channels
            .into_iter()
            .chain(new_channels)
            .flat_map(BTreeMap::keys)
            .collect();

        ids.into_iter()
            .map(|id| ChannelComparison {
                channel_id: id,
                old: old_channels.and_then(|c| c.get(id)),
                new: new_channels.and_then(|c| c.get(id)),
            })
            .collect()
    }
}

/// Channel classification within a [`ComparisonRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Present only in the current extension.
    Added,
    /// Present only in the cached extension.
    Removed,
    /// Present on both sides.
    Present,
}

/// One channel id of a [`ComparisonRecord`], with both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelComparison<'a> {
    pub channel_id: &'a ChannelId,
    pub old: Option<&'a Channel>,
    pub new: Option<&'a Channel>,
}

impl<'a> ChannelComparison<'a> {
    pub fn status(&self) -> ChannelStatus {
        match (self.old, self.new) {
            (None, _) => ChannelStatus::Added,
            (Some(_), None) => ChannelStatus::Removed,
            (Some(_), Some(_)) => ChannelStatus::Present,
        }
    }

    /// Node-id deltas; `None` unless the channel is present on both sides.
    pub fn delta(&self) -> Option<NodeDelta> {
        let (old, new) = (self.old?, self.new?);
        Some(NodeDelta {
            include_added: difference(&new.include_node_ids, &old.include_node_ids),
            include_removed: difference(&old.include_node_ids, &new.include_node_ids),
            exclude_added: difference(&new.exclude_node_ids, &old.exclude_node_ids),
            exclude_removed: difference(&old.exclude_node_ids, &new.exclude_node_ids),
        })
    }
}

/// Node-id deltas of a channel present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDelta {
    pub include_added: BTreeSet<NodeId>,
    pub include_removed: BTreeSet<NodeId>,
    pub exclude_added: BTreeSet<NodeId>,
    pub exclude_removed: BTreeSet<NodeId>,
}

impl NodeDelta {
    pub fn is_empty(&self) -> bool {
        self.include_added.is_empty()
            && self.include_removed.is_empty()
            && self.exclude_added.is_empty()
            && self.exclude_removed.is_empty()
    }
}

fn difference(a: &BTreeSet<NodeId>, b: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    a.difference(b).cloned().collect()
}

/// Compare `cached` against `current`.
///
/// Yields one record per reference whose extension differs, ordered by
/// reference. A commit bump for a reference is one record, not an add and a
/// remove.
pub fn compare<'a>(
    cached: &'a ExtensionSet,
    current: &'a ExtensionSet,
) -> Vec<ComparisonRecord<'a>> {
    cached
        .changed_refs(current)
        .into_iter()
        .filter_map(|reference| {
            let old = cached.get(&reference);
            let new = current.get(&reference);
            Some(ComparisonRecord {
                reference: old.or(new)?.reference(),
                old,
                new,
            })
        })
        .collect()
}
