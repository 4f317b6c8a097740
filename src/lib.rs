//! Batch runner for the CBWM planner demo experiment suite.
//!
//! The crate orchestrates an external planner-demo program over a fixed list
//! of demo/ablation configurations: resolve the dataset path, run each
//! configuration in order, abort on the first failure. The modules separate:
//!
//! - [`batch`]: the sequential fail-fast loop and its outcome types.
//! - [`invoker`]: the seam between batch orchestration and process spawning.
//! - [`process`]: child spawning with pass-through output and optional tee.
//! - [`config`]: TOML configuration and dataset-path resolution.
//! - [`report`]: belief-metric aggregation over planner JSON/JSONL logs.
//! - [`cli`]: the command implementations behind the binary.

pub mod batch;
pub mod cli;
pub mod config;
pub mod exit_codes;
pub mod invoker;
pub mod logging;
pub mod process;
pub mod report;
