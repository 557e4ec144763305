//! Reconciliation pass: diff → plan → apply → commit.
//!
//! This is the canonical entrypoint for both `extsync sync` and `extsync run`.
//! The snapshot is committed only when every planned step succeeded, so a
//! failed step is planned again on the next pass.

use chrono::{DateTime, Utc};
use serde::Serialize;

use extsync_core::{Commit, ContentLayout, ExtensionRef, ExtensionSet};

use crate::diff::{compare, ExtensionChange};
use crate::driver::{apply, ApplyReport, FailurePolicy};
use crate::error::SyncError;
use crate::executor::Executor;
use crate::lock::{process_state, PassLock};
use crate::plan::{plan_pass, Plan};
use crate::snapshot_store::SnapshotStore;

/// Options for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Plan only: no step is executed and nothing is committed.
    pub dry_run: bool,
    pub failure_policy: FailurePolicy,
}

/// One changed extension reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    #[serde(rename = "ref")]
    pub reference: ExtensionRef,
    pub change: ExtensionChange,
    pub old_commit: Option<Commit>,
    pub new_commit: Option<Commit>,
}

/// Extension changes and the resulting plan, before anything is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassPlan {
    pub changes: Vec<ChangeSummary>,
    pub plan: Plan,
}

impl PassPlan {
    /// Whether cached and current differ at all.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Outcome of a pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    #[serde(flatten)]
    pub planned: PassPlan,
    /// `None` for dry runs.
    pub apply: Option<ApplyReport>,
    pub committed: bool,
}

impl PassReport {
    /// False iff some step did not succeed.
    pub fn succeeded(&self) -> bool {
        self.apply.as_ref().map_or(true, ApplyReport::succeeded)
    }
}

/// Diff `cached` against `current` and plan the resulting steps.
pub fn prepare(cached: &ExtensionSet, current: &ExtensionSet, layout: &ContentLayout) -> PassPlan {
    let records = compare(cached, current);
    let changes = records
        .iter()
        .map(|r| ChangeSummary {
            reference: r.reference.clone(),
            change: r.change(),
            old_commit: r.old.map(|e| e.commit().clone()),
            new_commit: r.new.map(|e| e.commit().clone()),
        })
        .collect();
    PassPlan {
        changes,
        plan: plan_pass(&records, layout),
    }
}

/// Run one pass against `current` without taking the pass lock.
///
/// `current` is passed in so callers can configure the executor from the
/// same discovery result.
pub fn reconcile<E>(
    store: &SnapshotStore,
    current: &ExtensionSet,
    executor: &mut E,
    options: PassOptions,
) -> Result<PassReport, SyncError>
where
    E: Executor + ?Sized,
{
    let started_at = Utc::now();
    let cached = store.load_cached();
    let planned = prepare(&cached, current, store.discovery().layout());

    for change in &planned.changes {
        tracing::info!("{} extension: {}", change.change, change.reference);
    }

    if options.dry_run {
        tracing::info!("[dry-run] {} step(s) planned", planned.plan.len());
        return Ok(PassReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: true,
            planned,
            apply: None,
            committed: false,
        });
    }

    let report = apply(&planned.plan, executor, options.failure_policy);
    let committed = if !report.succeeded() {
        tracing::warn!(
            "{} step(s) failed, {} skipped; keeping previous snapshot",
            report.failed(),
            report.skipped()
        );
        false
    } else if planned.has_changes() {
        store.commit(current)?;
        true
    } else {
        tracing::debug!("content extensions unchanged");
        false
    };

    Ok(PassReport {
        started_at,
        finished_at: Utc::now(),
        dry_run: false,
        planned,
        apply: Some(report),
        committed,
    })
}

/// Take the pass lock, then [`reconcile`]. Dry runs skip the lock.
pub fn run<E>(
    store: &SnapshotStore,
    current: &ExtensionSet,
    executor: &mut E,
    options: PassOptions,
) -> Result<PassReport, SyncError>
where
    E: Executor + ?Sized,
{
    let _lock = if options.dry_run {
        None
    } else {
        Some(PassLock::acquire(store.lock_path(), &process_state())?)
    };
    reconcile(store, current, executor, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecError;
    use crate::plan::SyncStep;
    use extsync_core::{Discovery, Extension, ReferencePattern};
    use serde_json::json;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> SnapshotStore {
        let discovery = Discovery::new(
            tmp.path().join("flatpak-info"),
            ContentLayout::new(tmp.path().join("ext")),
            ReferencePattern::new("org.learningequality.Kolibri.Content").unwrap(),
        );
        SnapshotStore::new(
            tmp.path().join("data/content-extensions.json"),
            tmp.path().join("data/extsync.lock"),
            discovery,
        )
    }

    fn current() -> ExtensionSet {
        [Extension::new(
            "org.learningequality.Kolibri.Content.Demo",
            "Demo",
            "1",
            json!({"channels": [{"channel_id": "c1", "node_ids": ["a"]}]}),
        )]
        .into_iter()
        .collect()
    }

    fn ok(_: &SyncStep) -> Result<(), ExecError> {
        Ok(())
    }

    #[test]
    fn dry_run_plans_without_executing_or_committing() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let mut never = |_: &SyncStep| -> Result<(), ExecError> { panic!("dry run executed") };
        let options = PassOptions {
            dry_run: true,
            ..PassOptions::default()
        };

        let report = run(&store, &current(), &mut never, options).expect("pass");
        assert_eq!(report.planned.plan.len(), 2);
        assert!(report.apply.is_none());
        assert!(!report.committed);
        assert!(!store.snapshot_path().exists());
    }

    #[test]
    fn successful_pass_commits_and_next_pass_is_noop() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let first = run(&store, &current(), &mut ok, PassOptions::default()).expect("pass");
        assert!(first.committed);
        assert_eq!(store.load_cached(), current());

        let second = run(&store, &current(), &mut ok, PassOptions::default()).expect("pass");
        assert!(!second.planned.has_changes());
        assert!(second.planned.plan.is_empty());
        assert!(!second.committed);
    }

    #[test]
    fn run_fails_while_another_pass_holds_the_lock() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let _held = PassLock::acquire(store.lock_path(), "pid=other").expect("lock");

        let err = run(&store, &current(), &mut ok, PassOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Locked { .. }), "got: {err}");
    }

    #[test]
    fn change_summary_lists_commits() {
        let planned = prepare(
            &ExtensionSet::new(),
            &current(),
            &ContentLayout::new("/ext"),
        );
        assert_eq!(planned.changes.len(), 1);
        assert_eq!(planned.changes[0].change, ExtensionChange::Added);
        assert_eq!(planned.changes[0].old_commit, None);
        assert_eq!(planned.changes[0].new_commit, Some(Commit::from("1")));
    }
}
