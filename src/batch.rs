//! Sequential batch execution over the fixed demo configuration list.
//!
//! The list is part of the contract: the dual-belief demo first, then the
//! ablations. Runs are strictly ordered, never skipped or deduplicated, and
//! the first failing run aborts the batch.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::invoker::Invoker;

/// The five demo configurations, in batch order.
pub const DEMO_CONFIGS: [&str; 5] = [
    "examples/cbwm_dual_belief_demo",
    "examples/cbwm_ablation_no_cbwm",
    "examples/cbwm_ablation_no_dual_belief",
    "examples/cbwm_ablation_no_l2d",
    "examples/cbwm_ablation_all_off",
];

/// One planner invocation: a configuration name plus the dataset it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub config_name: String,
    pub dataset_path: String,
}

impl RunRequest {
    /// Filesystem-safe name used for per-run log files.
    pub fn config_slug(&self) -> String {
        self.config_name.replace(['/', '\\'], "_")
    }
}

/// Reason why a batch stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStop {
    /// Every configuration exited zero.
    Completed,
    /// A configuration failed; no later configuration was started.
    Failed {
        config_name: String,
        exit_code: Option<i32>,
        timed_out: bool,
    },
}

/// Summary of a batch invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub dataset_path: String,
    pub runs_executed: u32,
    pub records: Vec<RunRecord>,
    pub stop: BatchStop,
}

/// Per-run record captured for `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub config_name: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_secs: f64,
}

/// Serializable batch summary written to `<logs_dir>/meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchMeta {
    pub batch_id: String,
    pub dataset_path: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: f64,
    pub completed: bool,
    pub runs: Vec<RunRecord>,
}

/// Run the demo configurations in order, stopping on the first failure.
///
/// One banner line per configuration goes to stdout before the invocation
/// starts; the invoker blocks until each child exits. A non-zero exit,
/// signal death, or timeout aborts the batch without starting later runs.
#[instrument(skip_all, fields(dataset_path = %dataset_path))]
pub fn run_batch<I: Invoker>(invoker: &I, dataset_path: &str) -> Result<BatchOutcome> {
    let mut records = Vec::new();
    for config_name in DEMO_CONFIGS {
        let request = RunRequest {
            config_name: config_name.to_string(),
            dataset_path: dataset_path.to_string(),
        };

        println!("=== running {config_name} ===");
        info!(config = config_name, "invoking planner demo");

        let started = Instant::now();
        let status = invoker
            .invoke(&request)
            .with_context(|| format!("invoke {config_name}"))?;
        records.push(RunRecord {
            config_name: request.config_name.clone(),
            exit_code: status.exit_code,
            timed_out: status.timed_out,
            duration_secs: started.elapsed().as_secs_f64(),
        });

        if !status.success() {
            info!(
                config = config_name,
                exit_code = ?status.exit_code,
                timed_out = status.timed_out,
                "planner demo failed, aborting batch"
            );
            return Ok(BatchOutcome {
                dataset_path: dataset_path.to_string(),
                runs_executed: records.len() as u32,
                stop: BatchStop::Failed {
                    config_name: request.config_name,
                    exit_code: status.exit_code,
                    timed_out: status.timed_out,
                },
                records,
            });
        }
    }

    info!(runs = DEMO_CONFIGS.len(), "batch complete");
    Ok(BatchOutcome {
        dataset_path: dataset_path.to_string(),
        runs_executed: records.len() as u32,
        records,
        stop: BatchStop::Completed,
    })
}

/// Serialize the batch summary as pretty-printed JSON with trailing newline.
pub fn write_meta(path: &Path, meta: &BatchMeta) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create meta dir {}", parent.display()))?;
    }
    let mut payload = serde_json::to_string_pretty(meta).context("serialize meta json")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
