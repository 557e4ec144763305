//! `extsync run` — reconcile, then hand over to the backend.
//!
//! The pass is best effort: a failed or locked pass is logged and the backend
//! is launched anyway, seeing whatever content is already imported.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use clap::Args;

use extsync_sync::{
    executor::join_dirs,
    pipeline::{self, PassOptions},
    BackendExecutor, FailurePolicy,
};

use super::Workspace;

/// Arguments for `extsync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Arguments passed to the backend unchanged.
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl RunArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let ws = Workspace::load(config_path)?;
        let current = ws.store.discover_current();
        let fallback_dirs = current.content_fallback_dirs(&ws.config.layout());

        let mut executor = BackendExecutor::new(&ws.config.backend, fallback_dirs.clone());
        let options = PassOptions {
            dry_run: false,
            failure_policy: if ws.config.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::ContinueOnError
            },
        };
        match pipeline::run(&ws.store, &current, &mut executor, options) {
            Ok(report) if !report.succeeded() => {
                tracing::warn!("content extensions partially synced; starting anyway")
            }
            Ok(_) => {}
            Err(err) => tracing::warn!("skipping content extension sync: {err}"),
        }

        let program = &ws.config.backend.program;
        let status = Command::new(program)
            .args(&self.args)
            .env(&ws.config.backend.fallback_dirs_var, join_dirs(&fallback_dirs))
            .status()
            .with_context(|| format!("failed to start {}", program.display()))?;

        std::process::exit(status.code().unwrap_or(1));
    }
}
