//! Sync driver: applies planned steps in order and records each outcome.
//!
//! A failed step never aborts steps of other channels under the default
//! policy; later steps of the same channel are skipped because they depend
//! on it (content cannot be imported into a channel that failed to import).
//! Whether the pass may commit is decided by [`ApplyReport::succeeded`].

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;

use extsync_core::ChannelId;

use crate::executor::Executor;
use crate::plan::{Plan, SyncStep};

/// What to do with the remaining steps once one has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep going with other channels.
    #[default]
    ContinueOnError,
    /// Skip every remaining step.
    FailFast,
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed { reason: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: SyncStep,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Outcomes of every step of a plan, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApplyReport {
    outcomes: Vec<StepOutcome>,
}

impl ApplyReport {
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// True iff every step succeeded. An empty plan succeeds.
    pub fn succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == StepStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Skipped))
    }

    fn count(&self, pred: impl Fn(&StepStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Apply `plan` through `executor`, strictly in sequence.
pub fn apply<E>(plan: &Plan, executor: &mut E, policy: FailurePolicy) -> ApplyReport
where
    E: Executor + ?Sized,
{
    let mut outcomes = Vec::with_capacity(plan.len());
    let mut failed_channels: BTreeSet<ChannelId> = BTreeSet::new();
    let mut abort = false;

    for step in plan.iter() {
        let status = if abort || failed_channels.contains(step.channel_id()) {
            tracing::info!("skipping {} ({})", step.operation, step.reference);
            StepStatus::Skipped
        } else {
            run_step(step, executor)
        };

        if matches!(status, StepStatus::Failed { .. }) {
            failed_channels.insert(step.channel_id().clone());
            abort = policy == FailurePolicy::FailFast;
        }
        outcomes.push(StepOutcome {
            step: step.clone(),
            status,
        });
    }

    ApplyReport { outcomes }
}

fn run_step<E>(step: &SyncStep, executor: &mut E) -> StepStatus
where
    E: Executor + ?Sized,
{
    tracing::info!("{} starting ({}): {}", step.operation, step.reference, Utc::now());
    match executor.execute(step) {
        Ok(()) => {
            tracing::info!("{} completed: {}", step.operation, Utc::now());
            StepStatus::Succeeded
        }
        Err(err) => {
            tracing::warn!("{} failed: {}", step.operation, err);
            StepStatus::Failed {
                reason: err.to_string(),
            }
        }
    }
}
