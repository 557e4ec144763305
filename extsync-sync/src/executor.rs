//! Executors apply a single [`SyncStep`] to the content backend.
//!
//! The driver only sees success or failure; no backend output flows back.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;

use extsync_core::{BackendConfig, NodeId};

use crate::plan::{SyncOperation, SyncStep};

/// Why a step failed. Recorded per step, never fatal to the pass.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Exit { program: PathBuf, status: ExitStatus },

    #[error("{verb} needs a source directory")]
    MissingSource { verb: &'static str },

    #[error("{0}")]
    Other(String),
}

/// Applies one step, blocking until the backend has finished.
pub trait Executor {
    fn execute(&mut self, step: &SyncStep) -> Result<(), ExecError>;
}

impl<F> Executor for F
where
    F: FnMut(&SyncStep) -> Result<(), ExecError> + ?Sized,
{
    fn execute(&mut self, step: &SyncStep) -> Result<(), ExecError> {
        (*self)(step)
    }
}

/// Runs the content-management backend as a subprocess per step.
#[derive(Debug, Clone)]
pub struct BackendExecutor {
    program: PathBuf,
    manage_args: Vec<String>,
    fallback_dirs_var: String,
    fallback_dirs: Vec<PathBuf>,
}

impl BackendExecutor {
    pub fn new(config: &BackendConfig, fallback_dirs: Vec<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            manage_args: config.manage_args.clone(),
            fallback_dirs_var: config.fallback_dirs_var.clone(),
            fallback_dirs,
        }
    }

    /// Build the command for `step` without running it.
    pub fn command(&self, step: &SyncStep) -> Result<Command, ExecError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.manage_args);
        cmd.args(operation_args(step)?);
        cmd.env(&self.fallback_dirs_var, join_dirs(&self.fallback_dirs));
        Ok(cmd)
    }
}

impl Executor for BackendExecutor {
    fn execute(&mut self, step: &SyncStep) -> Result<(), ExecError> {
        let mut cmd = self.command(step)?;
        tracing::debug!("running {:?}", cmd);
        let status = cmd.status().map_err(|source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(ExecError::Exit {
                program: self.program.clone(),
                status,
            })
        }
    }
}

/// Backend arguments for a step, after the manage prefix.
pub fn operation_args(step: &SyncStep) -> Result<Vec<OsString>, ExecError> {
    let mut args: Vec<OsString> = Vec::new();
    match &step.operation {
        SyncOperation::ImportChannel { channel_id } => {
            let source = source_dir(step)?;
            args.push("importchannel".into());
            args.push("disk".into());
            args.push(channel_id.as_str().into());
            args.push(source.as_os_str().to_owned());
        }
        SyncOperation::ImportContent {
            channel_id,
            include_node_ids,
            exclude_node_ids,
        } => {
            let source = source_dir(step)?;
            args.push("importcontent".into());
            if !include_node_ids.is_empty() {
                args.push(format!("--node_ids={}", join_ids(include_node_ids)).into());
            }
            if !exclude_node_ids.is_empty() {
                args.push(format!("--exclude_node_ids={}", join_ids(exclude_node_ids)).into());
            }
            args.push("disk".into());
            args.push(channel_id.as_str().into());
            args.push(source.as_os_str().to_owned());
        }
        SyncOperation::RescanContent { channel_id, purge } => {
            args.push("scanforcontent".into());
            args.push(format!("--channels={channel_id}").into());
            if *purge {
                args.push("--channel-import-mode=none".into());
            }
        }
    }
    Ok(args)
}

fn source_dir(step: &SyncStep) -> Result<&Path, ExecError> {
    step.source_dir
        .as_deref()
        .ok_or(ExecError::MissingSource {
            verb: step.operation.verb(),
        })
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a NodeId>) -> String {
    ids.into_iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Join content directories the way the backend expects them (`;`-separated).
pub fn join_dirs(dirs: &[PathBuf]) -> OsString {
    let mut joined = OsString::new();
    for (i, dir) in dirs.iter().enumerate() {
        if i > 0 {
            joined.push(";");
        }
        joined.push(dir.as_os_str());
    }
    joined
}
