//! `extsync status` — known extensions and pass lock state.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use extsync_core::{Extension, ExtensionRef, ExtensionSet};
use extsync_sync::PassLock;

use super::Workspace;

/// Arguments for `extsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ExtensionState {
    Current,
    Added,
    Removed,
    Updated,
}

impl ExtensionState {
    fn label(self) -> String {
        match self {
            ExtensionState::Current => "current".green().to_string(),
            ExtensionState::Added => "added".cyan().to_string(),
            ExtensionState::Removed => "removed".red().to_string(),
            ExtensionState::Updated => "updated".yellow().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExtensionStatus {
    #[serde(rename = "ref")]
    reference: ExtensionRef,
    state: ExtensionState,
    commit: String,
    channels: usize,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    snapshot: String,
    pass_running: bool,
    lock_holder: Option<String>,
    extensions: Vec<ExtensionStatus>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "extension")]
    extension: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "commit")]
    commit: String,
    #[tabled(rename = "channels")]
    channels: usize,
}

impl StatusArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let ws = Workspace::load(config_path)?;
        let cached = ws.store.load_cached();
        let current = ws.store.discover_current();
        let (pass_running, lock_holder) = PassLock::probe(ws.store.lock_path())?;

        let report = StatusReport {
            snapshot: ws.store.snapshot_path().display().to_string(),
            pass_running,
            lock_holder: lock_holder.filter(|_| pass_running),
            extensions: extension_statuses(&cached, &current),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        print_table(report);
        Ok(())
    }
}

fn extension_statuses(cached: &ExtensionSet, current: &ExtensionSet) -> Vec<ExtensionStatus> {
    let added = ExtensionSet::added(cached, current);
    let removed = ExtensionSet::removed(cached, current);
    let updated = ExtensionSet::updated(cached, current);

    let refs: BTreeSet<&ExtensionRef> = cached.refs().into_iter().chain(current.refs()).collect();
    refs.into_iter()
        .filter_map(|reference| {
            let state = if added.contains(reference) {
                ExtensionState::Added
            } else if removed.contains(reference) {
                ExtensionState::Removed
            } else if updated.contains(reference) {
                ExtensionState::Updated
            } else {
                ExtensionState::Current
            };
            let shown: &Extension = current.get(reference).or(cached.get(reference))?;
            Some(ExtensionStatus {
                reference: reference.clone(),
                state,
                commit: shown.commit().to_string(),
                channels: shown.channels().len(),
            })
        })
        .collect()
}

fn print_table(report: StatusReport) {
    println!(
        "extsync v{} | {} extensions | snapshot {}",
        env!("CARGO_PKG_VERSION"),
        report.extensions.len(),
        report.snapshot,
    );
    if report.pass_running {
        let holder = report.lock_holder.as_deref().unwrap_or("unknown");
        println!("{} pass running ({holder})", "■".yellow().bold());
    }

    if report.extensions.is_empty() {
        println!("No content extensions.");
        return;
    }

    let rows: Vec<StatusRow> = report
        .extensions
        .into_iter()
        .map(|e| StatusRow {
            extension: e.reference.to_string(),
            state: e.state.label(),
            commit: e.commit,
            channels: e.channels,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ext(name: &str, commit: &str) -> Extension {
        Extension::new(
            format!("org.learningequality.Kolibri.Content.{name}"),
            name,
            commit,
            json!({"channels": [{"channel_id": "c1"}]}),
        )
    }

    #[test]
    fn states_cover_every_known_reference() {
        let cached: ExtensionSet = [ext("Kept", "1"), ext("Gone", "1"), ext("Bumped", "1")]
            .into_iter()
            .collect();
        let current: ExtensionSet = [ext("Kept", "1"), ext("Bumped", "2"), ext("New", "1")]
            .into_iter()
            .collect();

        let states: Vec<(String, ExtensionState, String)> = extension_statuses(&cached, &current)
            .into_iter()
            .map(|s| {
                let name = s.reference.as_str().rsplit('.').next().unwrap_or("").to_string();
                (name, s.state, s.commit)
            })
            .collect();
        assert_eq!(
            states,
            vec![
                ("Bumped".into(), ExtensionState::Updated, "2".into()),
                ("Gone".into(), ExtensionState::Removed, "1".into()),
                ("Kept".into(), ExtensionState::Current, "1".into()),
                ("New".into(), ExtensionState::Added, "1".into()),
            ]
        );
    }
}
