//! Invoker abstraction for planner demo runs.
//!
//! The [`Invoker`] trait decouples the batch loop from the actual planner
//! backend (a Hydra entry point selected via `--config-name`). Tests use
//! scripted invokers that return predetermined statuses without spawning
//! processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument};

use crate::batch::RunRequest;
use crate::process::run_passthrough;

/// Per-run result reported back to the batch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeStatus {
    /// Child exit code; `None` when the child died to a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl InvokeStatus {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Abstraction over planner execution backends.
pub trait Invoker {
    /// Run one configuration to completion and report its exit status.
    fn invoke(&self, request: &RunRequest) -> Result<InvokeStatus>;
}

/// Invoker that spawns the configured planner demo command.
pub struct PlannerInvoker {
    command: Vec<String>,
    override_key: String,
    timeout: Option<Duration>,
    logs_dir: Option<PathBuf>,
}

impl PlannerInvoker {
    pub fn new(
        command: Vec<String>,
        override_key: String,
        timeout: Option<Duration>,
        logs_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            command,
            override_key,
            timeout,
            logs_dir,
        }
    }

    /// Planner argv for one request: configured prefix, config selector,
    /// dotted dataset override.
    fn build_command(&self, request: &RunRequest) -> Result<Command> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("planner.command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--config-name")
            .arg(&request.config_name)
            .arg(format!("{}={}", self.override_key, request.dataset_path));
        Ok(cmd)
    }

    fn log_path(&self, request: &RunRequest) -> Option<PathBuf> {
        self.logs_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.log", request.config_slug())))
    }
}

impl Invoker for PlannerInvoker {
    #[instrument(skip_all, fields(config = %request.config_name))]
    fn invoke(&self, request: &RunRequest) -> Result<InvokeStatus> {
        let cmd = self.build_command(request)?;
        info!("starting planner demo");

        let run = run_passthrough(cmd, self.timeout, self.log_path(request).as_deref())
            .with_context(|| format!("run planner demo {}", request.config_name))?;

        debug!(
            exit_code = ?run.status.code(),
            timed_out = run.timed_out,
            "planner demo finished"
        );
        Ok(InvokeStatus {
            exit_code: run.status.code(),
            timed_out: run.timed_out,
        })
    }
}
