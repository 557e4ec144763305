//! `extsync sync` — one reconciliation pass against the backend.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;

use extsync_sync::{
    pipeline::{self, PassOptions, PassReport},
    BackendExecutor, FailurePolicy, StepStatus,
};

use super::Workspace;

/// Arguments for `extsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show the planned operations without running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Stop at the first failed operation.
    #[arg(long)]
    pub fail_fast: bool,
}

impl SyncArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let ws = Workspace::load(config_path)?;
        let current = ws.store.discover_current();
        let mut executor = BackendExecutor::new(
            &ws.config.backend,
            current.content_fallback_dirs(&ws.config.layout()),
        );
        let options = PassOptions {
            dry_run: self.dry_run,
            failure_policy: if self.fail_fast || ws.config.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::ContinueOnError
            },
        };

        let report = pipeline::run(&ws.store, &current, &mut executor, options)
            .context("reconciliation pass failed")?;
        print_report(&report);

        if !report.succeeded() {
            bail!("some operations failed; the next pass will retry them");
        }
        Ok(())
    }
}

fn print_report(report: &PassReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    if !report.planned.has_changes() {
        println!("{prefix}✓ content extensions up to date");
        return;
    }

    for change in &report.planned.changes {
        println!("{prefix}{} {}", change.change, change.reference);
    }

    match &report.apply {
        None => {
            for step in report.planned.plan.iter() {
                println!("  ~  {} ({})", step.operation, step.reference);
            }
        }
        Some(apply) => {
            for outcome in apply.outcomes() {
                let step = &outcome.step;
                match &outcome.status {
                    StepStatus::Succeeded => {
                        println!("  {}  {} ({})", "✓".green(), step.operation, step.reference)
                    }
                    StepStatus::Failed { reason } => println!(
                        "  {}  {} ({}): {}",
                        "✗".red(),
                        step.operation,
                        step.reference,
                        reason
                    ),
                    StepStatus::Skipped => println!(
                        "  {}  {} ({}) skipped",
                        "·".bright_black(),
                        step.operation,
                        step.reference
                    ),
                }
            }
        }
    }

    if report.committed {
        println!(
            "{prefix}snapshot committed at {}",
            report.finished_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    } else if !report.dry_run {
        println!("{prefix}snapshot not committed");
    }
}
