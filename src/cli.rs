//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::batch::{BatchMeta, BatchOutcome, BatchStop, DEMO_CONFIGS, run_batch, write_meta};
use crate::config;
use crate::invoker::PlannerInvoker;
use crate::report;

/// List the demo configurations in batch order.
pub fn list_configs() -> Result<()> {
    for config_name in DEMO_CONFIGS {
        println!("{config_name}");
    }
    Ok(())
}

/// Options for `run` assembled from CLI flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub dataset: Option<String>,
    pub logs_dir: Option<PathBuf>,
}

/// Run the full batch and return the outcome for exit-code mapping.
pub fn run_demos(opts: &RunOptions) -> Result<BatchOutcome> {
    let cfg = config::load_config(&opts.config_path)?;
    let dataset_path = config::resolve_dataset_path(
        opts.dataset.as_deref(),
        std::env::var(config::DATASET_PATH_ENV).ok().as_deref(),
        &cfg.dataset,
    )?;
    debug!(dataset_path = %dataset_path, "dataset path resolved");

    let logs_dir = opts.logs_dir.clone().or_else(|| cfg.logs_dir.clone());
    let timeout = cfg.run_timeout_secs.map(Duration::from_secs);
    let invoker = PlannerInvoker::new(
        cfg.planner.command.clone(),
        cfg.dataset.override_key.clone(),
        timeout,
        logs_dir.clone(),
    );

    let started_at = Utc::now();
    info!(dataset_path = %dataset_path, "starting batch");
    let outcome = run_batch(&invoker, &dataset_path)?;
    let finished_at = Utc::now();

    if let Some(dir) = logs_dir {
        let meta = BatchMeta {
            batch_id: format!("batch-{}", started_at.format("%Y%m%d_%H%M%S")),
            dataset_path: dataset_path.clone(),
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            duration_secs: (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
            completed: outcome.stop == BatchStop::Completed,
            runs: outcome.records.clone(),
        };
        write_meta(&dir.join("meta.json"), &meta).context("write batch meta")?;
    }

    match &outcome.stop {
        BatchStop::Completed => {
            println!(
                "batch: runs={} dataset={} ok",
                outcome.runs_executed, dataset_path
            );
        }
        BatchStop::Failed {
            config_name,
            exit_code,
            timed_out,
        } => {
            let code = exit_code.map_or_else(|| "none".to_string(), |code| code.to_string());
            eprintln!(
                "batch: failed at {} exit_code={} timed_out={} after {} runs",
                config_name, code, timed_out, outcome.runs_executed
            );
        }
    }
    Ok(outcome)
}

/// Summarize belief metrics for a log file or directory.
pub fn report_metrics(input: &Path, divergence_key: &str) -> Result<()> {
    let (summary, warnings) = report::summarize(input, divergence_key)?;
    println!("report: records={}", summary.records);
    println!(
        "report: avg_concept_confidence={:.4}",
        summary.avg_concept_confidence
    );
    println!(
        "report: divergence key={} avg={:.4} max={:.4}",
        divergence_key, summary.avg_divergence, summary.max_divergence
    );
    println!("report: steps={}..{}", summary.first_step, summary.last_step);
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
