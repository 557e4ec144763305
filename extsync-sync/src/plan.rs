//! Operation planner.
//!
//! Rule precedence per channel (first match wins):
//! 1. channel added → `ImportChannel`, then `ImportContent` with the new sets
//! 2. channel removed → `RescanContent { purge: true }`
//! 3. exclude set grew → `RescanContent { purge: false }`
//! 4. include set shrank → `RescanContent { purge: false }`
//! 5. any other delta → `ImportContent` with the new sets
//!
//! The backend cannot retract imported nodes incrementally, so any removal
//! (rules 3 and 4) wins over additions in the same revision. Channels without
//! a delta produce nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use extsync_core::{ChannelId, ContentLayout, ExtensionRef, NodeId};

use crate::diff::{ChannelComparison, ComparisonRecord};

/// One idempotent synchronization operation against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOperation {
    ImportChannel {
        channel_id: ChannelId,
    },
    ImportContent {
        channel_id: ChannelId,
        include_node_ids: BTreeSet<NodeId>,
        exclude_node_ids: BTreeSet<NodeId>,
    },
    RescanContent {
        channel_id: ChannelId,
        /// Remove the channel's content instead of re-importing it.
        purge: bool,
    },
}

impl SyncOperation {
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            SyncOperation::ImportChannel { channel_id }
            | SyncOperation::ImportContent { channel_id, .. }
            | SyncOperation::RescanContent { channel_id, .. } => channel_id,
        }
    }

    pub fn is_purge(&self) -> bool {
        matches!(self, SyncOperation::RescanContent { purge: true, .. })
    }

    /// Short name used in logs and CLI output.
    pub fn verb(&self) -> &'static str {
        match self {
            SyncOperation::ImportChannel { .. } => "import-channel",
            SyncOperation::ImportContent { .. } => "import-content",
            SyncOperation::RescanContent { purge: true, .. } => "purge",
            SyncOperation::RescanContent { purge: false, .. } => "rescan",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOperation::ImportContent {
                channel_id,
                include_node_ids,
                exclude_node_ids,
            } => write!(
                f,
                "{} {} ({} included, {} excluded)",
                self.verb(),
                channel_id,
                include_node_ids.len(),
                exclude_node_ids.len()
            ),
            other => write!(f, "{} {}", other.verb(), other.channel_id()),
        }
    }
}

/// Operations for a single channel comparison.
pub fn plan_channel(channel: &ChannelComparison<'_>) -> Vec<SyncOperation> {
    let channel_id = channel.channel_id.clone();
    match (channel.old, channel.new) {
        (None, None) => vec![],
        (None, Some(new)) => vec![
            SyncOperation::ImportChannel {
                channel_id: channel_id.clone(),
            },
            SyncOperation::ImportContent {
                channel_id,
                include_node_ids: new.include_node_ids.clone(),
                exclude_node_ids: new.exclude_node_ids.clone(),
            },
        ],
        (Some(_), None) => vec![SyncOperation::RescanContent {
            channel_id,
            purge: true,
        }],
        (Some(_), Some(new)) => {
            let Some(delta) = channel.delta().filter(|d| !d.is_empty()) else {
                return vec![];
            };
            if !delta.exclude_added.is_empty() || !delta.include_removed.is_empty() {
                vec![SyncOperation::RescanContent {
                    channel_id,
                    purge: false,
                }]
            } else {
                vec![SyncOperation::ImportContent {
                    channel_id,
                    include_node_ids: new.include_node_ids.clone(),
                    exclude_node_ids: new.exclude_node_ids.clone(),
                }]
            }
        }
    }
}

/// Operations for every channel of `record`, in channel-id order.
pub fn plan(record: &ComparisonRecord<'_>) -> Vec<SyncOperation> {
    record
        .channels()
        .iter()
        .flat_map(plan_channel)
        .collect()
}

/// A planned operation with the extension it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStep {
    #[serde(rename = "ref")]
    pub reference: ExtensionRef,
    /// Content directory of the current extension; `None` when it was removed.
    pub source_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub operation: SyncOperation,
}

impl SyncStep {
    pub fn channel_id(&self) -> &ChannelId {
        self.operation.channel_id()
    }
}

/// Ordered steps of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<SyncStep>,
}

impl Plan {
    pub fn steps(&self) -> &[SyncStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncStep> {
        self.steps.iter()
    }
}

/// Plan every record of a pass.
///
/// Records are visited removed → updated → added, then the steps are stably
/// sorted by channel id with purges first. A channel moving from one extension
/// to another is therefore purged before it is imported again, and the
/// per-channel order of [`plan_channel`] is kept.
pub fn plan_pass(records: &[ComparisonRecord<'_>], layout: &ContentLayout) -> Plan {
    let mut ordered: Vec<&ComparisonRecord<'_>> = records.iter().collect();
    ordered.sort_by(|a, b| (a.change(), a.reference).cmp(&(b.change(), b.reference)));

    let mut steps = Vec::new();
    for record in ordered {
        let source_dir = record.new.map(|e| layout.content_dir(e.name()));
        for operation in plan(record) {
            steps.push(SyncStep {
                reference: record.reference.clone(),
                source_dir: source_dir.clone(),
                operation,
            });
        }
    }
    steps.sort_by(|a, b| {
        a.channel_id()
            .cmp(b.channel_id())
            .then_with(|| b.operation.is_purge().cmp(&a.operation.is_purge()))
    });
    Plan { steps }
}
