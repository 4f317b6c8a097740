//! Aggregation of belief metrics from planner JSON/JSONL logs.
//!
//! The planner demos append one JSON object per step. Records may carry
//! metrics at the top level or nested under `metrics`; concept confidence is
//! either a per-concept score map or a precomputed average; divergence can
//! additionally live inside a named `divergence` dictionary. Extraction is
//! tolerant: unparseable files produce a warning, not an error, and a file
//! whose lines are not JSONL is retried as a whole-file JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

/// Default divergence metric key.
pub const DEFAULT_DIVERGENCE_KEY: &str = "belief_divergence";

/// One extracted metric sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub step: i64,
    pub concept_confidence: Option<f64>,
    pub divergence: Option<f64>,
}

/// Aggregate over every readable record.
///
/// Missing confidence counts as 1.0 and missing divergence as 0.0, matching
/// how the planner logs omit settled metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    pub records: usize,
    pub avg_concept_confidence: f64,
    pub avg_divergence: f64,
    pub max_divergence: f64,
    pub first_step: i64,
    pub last_step: i64,
}

/// Collect log files for an input path.
///
/// A file input is used as-is; a directory collects `*.json`, `*.jsonl`, and
/// `*.log` entries in sorted order.
pub fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("no such log file or directory: {}", input.display());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("read {}", input.display()))? {
        let entry = entry.context("read entry")?;
        let path = entry.path();
        let ext = path.extension().and_then(|ext| ext.to_str());
        if path.is_file() && matches!(ext, Some("json" | "jsonl" | "log")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse records from one file: JSONL first, whole-document fallback.
fn read_records(path: &Path, warnings: &mut Vec<String>) -> Result<Vec<Value>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;

    let mut records = Vec::new();
    let mut line_parse_failed = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) if value.is_object() => records.push(value),
            // Scalar or array lines carry no metric fields.
            Ok(_) => {}
            Err(_) => {
                line_parse_failed = true;
                break;
            }
        }
    }
    if !line_parse_failed {
        return Ok(records);
    }
    if !records.is_empty() {
        // Keep the lines that did parse; the rest of the file is unreadable.
        warnings.push(format!(
            "{}: trailing lines are not valid JSON, kept {} records",
            path.display(),
            records.len()
        ));
        return Ok(records);
    }

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Array(items)) => {
            records.extend(items.into_iter().filter(Value::is_object));
        }
        Ok(value) if value.is_object() => records.push(value),
        Ok(_) | Err(_) => {
            warnings.push(format!("skip {}: not valid JSON or JSONL", path.display()));
        }
    }
    Ok(records)
}

fn numeric(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Find a metric either at the top level or under `metrics`.
fn extract_metric(record: &Value, key: &str) -> Option<f64> {
    if let Some(value) = record.get(key).and_then(numeric) {
        return Some(value);
    }
    record
        .get("metrics")
        .and_then(|metrics| metrics.get(key))
        .and_then(numeric)
}

/// Mean confidence when a per-concept score map is present.
fn average_concept_confidence(record: &Value) -> Option<f64> {
    if let Some(Value::Object(concepts)) = record.get("concept_confidence")
        && !concepts.is_empty()
    {
        let scores: Vec<f64> = concepts.values().filter_map(numeric).collect();
        if !scores.is_empty() {
            return Some(scores.iter().sum::<f64>() / scores.len() as f64);
        }
    }
    extract_metric(record, "avg_concept_confidence")
}

/// Divergence for `key`, falling back to aggregated divergence dicts.
fn extract_divergence(record: &Value, key: &str) -> Option<f64> {
    if let Some(value) = extract_metric(record, key) {
        return Some(value);
    }
    for holder in ["divergence", "belief_divergence"] {
        if let Some(value) = record
            .get(holder)
            .and_then(|dict| dict.get(key))
            .and_then(numeric)
        {
            return Some(value);
        }
    }
    None
}

fn extract_step(record: &Value, index: usize) -> i64 {
    for key in ["step", "timestep", "episode_step"] {
        if let Some(step) = record.get(key).and_then(numeric) {
            return step as i64;
        }
    }
    index as i64
}

/// Extract per-record samples in record order.
pub fn extract_samples(records: &[Value], divergence_key: &str) -> Vec<MetricSample> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| MetricSample {
            step: extract_step(record, index),
            concept_confidence: average_concept_confidence(record),
            divergence: extract_divergence(record, divergence_key),
        })
        .collect()
}

/// Read all records under `input` and aggregate the requested divergence key.
///
/// Errors when no log files exist or no record anywhere is readable;
/// individually malformed files are reported in the returned warnings.
pub fn summarize(input: &Path, divergence_key: &str) -> Result<(MetricsSummary, Vec<String>)> {
    let files = collect_files(input)?;
    if files.is_empty() {
        bail!("no JSON/JSONL logs found under {}", input.display());
    }

    let mut warnings = Vec::new();
    let mut records = Vec::new();
    for file in &files {
        records.extend(read_records(file, &mut warnings)?);
    }
    if records.is_empty() {
        bail!("no readable JSON records found in {} files", files.len());
    }
    debug!(records = records.len(), files = files.len(), "records loaded");

    let samples = extract_samples(&records, divergence_key);
    let mut summary = MetricsSummary {
        records: samples.len(),
        first_step: samples.first().map_or(0, |sample| sample.step),
        last_step: samples.last().map_or(0, |sample| sample.step),
        ..MetricsSummary::default()
    };

    let mut confidence_total = 0.0;
    let mut divergence_total = 0.0;
    for sample in &samples {
        confidence_total += sample.concept_confidence.unwrap_or(1.0);
        let divergence = sample.divergence.unwrap_or(0.0);
        divergence_total += divergence;
        if divergence > summary.max_divergence {
            summary.max_divergence = divergence;
        }
    }
    summary.avg_concept_confidence = confidence_total / samples.len() as f64;
    summary.avg_divergence = divergence_total / samples.len() as f64;

    Ok((summary, warnings))
}
