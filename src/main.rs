//! Batch runner for the CBWM planner demo configurations.
//!
//! Runs the dual-belief demo and its ablations sequentially against a single
//! dataset, stopping on the first failure. The planner itself is an external
//! program; this binary only orchestrates it.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cbwm_eval::batch::BatchStop;
use cbwm_eval::cli::{self, RunOptions};
use cbwm_eval::exit_codes;
use cbwm_eval::logging;
use cbwm_eval::report::DEFAULT_DIVERGENCE_KEY;

#[derive(Parser)]
#[command(
    name = "cbwm-eval",
    version,
    about = "Batch runner for CBWM planner demo configurations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the demo configurations in batch order.
    List,
    /// Run every demo configuration sequentially, stopping on first failure.
    Run {
        /// Path to the TOML config file (defaults used when missing).
        #[arg(long, default_value = "cbwm-eval.toml")]
        config: PathBuf,
        /// Dataset path (wins over the DATASET_PATH environment variable).
        #[arg(long)]
        dataset: Option<String>,
        /// Tee per-run output and write meta.json under this directory.
        #[arg(long)]
        logs_dir: Option<PathBuf>,
    },
    /// Summarize belief metrics from planner JSON/JSONL logs.
    Report {
        /// Log file, or directory containing *.json / *.jsonl / *.log files.
        input: PathBuf,
        /// Metric key to aggregate (e.g. belief_divergence, concept_js_divergence).
        #[arg(long, default_value = DEFAULT_DIVERGENCE_KEY)]
        divergence_key: String,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::List => {
            cli::list_configs()?;
            Ok(exit_codes::OK)
        }
        Command::Run {
            config,
            dataset,
            logs_dir,
        } => {
            let outcome = cli::run_demos(&RunOptions {
                config_path: config,
                dataset,
                logs_dir,
            })?;
            // The batch exits with the first failing run's own code.
            Ok(match outcome.stop {
                BatchStop::Completed => exit_codes::OK,
                BatchStop::Failed {
                    exit_code: Some(code),
                    ..
                } => code,
                BatchStop::Failed {
                    exit_code: None, ..
                } => exit_codes::INVALID,
            })
        }
        Command::Report {
            input,
            divergence_key,
        } => {
            cli::report_metrics(&input, &divergence_key)?;
            Ok(exit_codes::OK)
        }
    }
}
