//! Batch runner configuration, loaded from an optional TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Dataset used when neither `--dataset` nor the environment provides one.
pub const DEFAULT_DATASET_PATH: &str = "data/datasets/partnr_episodes/v0_0/val.json.gz";

/// Environment variable that overrides the dataset path.
pub const DATASET_PATH_ENV: &str = "DATASET_PATH";

/// Batch runner configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the values the stock demo setup
/// expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CbwmEvalConfig {
    /// Per-run wall-clock budget in seconds. Unset means runs block until
    /// the planner exits on its own.
    pub run_timeout_secs: Option<u64>,

    /// When set, tee each run's output to `<logs_dir>/<config slug>.log` and
    /// write a `meta.json` batch summary there.
    pub logs_dir: Option<PathBuf>,

    pub planner: PlannerConfig,
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Command prefix for the planner demo entry point
    /// (e.g. `["python", "-m", "habitat_llm.examples.planner_demo"]`).
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset path used when no override is given.
    pub default_path: String,

    /// Dotted key through which the dataset path is bound on the planner
    /// command line.
    pub override_key: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "python".to_string(),
                "-m".to_string(),
                "habitat_llm.examples.planner_demo".to_string(),
            ],
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            default_path: DEFAULT_DATASET_PATH.to_string(),
            override_key: "habitat.dataset.data_path".to_string(),
        }
    }
}

impl Default for CbwmEvalConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: None,
            logs_dir: None,
            planner: PlannerConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl CbwmEvalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.planner.command.is_empty() || self.planner.command[0].trim().is_empty() {
            return Err(anyhow!("planner.command must be a non-empty array"));
        }
        if self.dataset.default_path.trim().is_empty() {
            return Err(anyhow!("dataset.default_path must be non-empty"));
        }
        if self.dataset.override_key.trim().is_empty() {
            return Err(anyhow!("dataset.override_key must be non-empty"));
        }
        if let Some(secs) = self.run_timeout_secs
            && secs == 0
        {
            return Err(anyhow!("run_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CbwmEvalConfig::default()`.
pub fn load_config(path: &Path) -> Result<CbwmEvalConfig> {
    if !path.exists() {
        let cfg = CbwmEvalConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CbwmEvalConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CbwmEvalConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Resolve the dataset path: CLI flag, then environment variable, then the
/// configured default.
///
/// An empty value from the flag or the environment is an error rather than a
/// silent fall-through.
pub fn resolve_dataset_path(
    flag: Option<&str>,
    env_value: Option<&str>,
    dataset: &DatasetConfig,
) -> Result<String> {
    if let Some(path) = flag {
        if path.trim().is_empty() {
            return Err(anyhow!("--dataset must be non-empty"));
        }
        return Ok(path.to_string());
    }
    if let Some(path) = env_value {
        if path.trim().is_empty() {
            return Err(anyhow!("{DATASET_PATH_ENV} must be non-empty when set"));
        }
        return Ok(path.to_string());
    }
    Ok(dataset.default_path.clone())
}
