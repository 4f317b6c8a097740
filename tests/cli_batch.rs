//! CLI tests for the `run` and `list` commands.
//!
//! Spawns the real binary against a fake planner shell script and verifies
//! the batch contract: fixed order, dataset substitution, banners, fail-fast
//! exit-code propagation, and log/meta capture.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use cbwm_eval::batch::{BatchMeta, DEMO_CONFIGS};
use cbwm_eval::config::{CbwmEvalConfig, DEFAULT_DATASET_PATH, PlannerConfig, write_config};

/// Fake planner: records its config selector and dataset override, then
/// mimics success, failure, or a hang depending on environment knobs.
const PLANNER_SCRIPT: &str = r#"#!/bin/sh
printf '%s|%s\n' "$2" "$3" >> "$INVOKE_LOG"
if [ -n "$SLEEP_ON" ] && [ "$2" = "$SLEEP_ON" ]; then
    exec sleep 30
fi
if [ -n "$FAIL_ON" ] && [ "$2" = "$FAIL_ON" ]; then
    echo "planner exploded" >&2
    exit "${FAIL_CODE:-1}"
fi
echo "planner ok $2"
exit 0
"#;

struct FakePlanner {
    temp: tempfile::TempDir,
    invoke_log: PathBuf,
}

impl FakePlanner {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(mutate: impl FnOnce(&mut CbwmEvalConfig)) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let script_path = temp.path().join("planner.sh");
        fs::write(&script_path, PLANNER_SCRIPT).expect("write planner script");

        let mut cfg = CbwmEvalConfig {
            planner: PlannerConfig {
                command: vec![
                    "/bin/sh".to_string(),
                    script_path.to_string_lossy().into_owned(),
                ],
            },
            ..CbwmEvalConfig::default()
        };
        mutate(&mut cfg);
        write_config(&temp.path().join("cbwm-eval.toml"), &cfg).expect("write config");

        let invoke_log = temp.path().join("invocations.log");
        Self { temp, invoke_log }
    }

    /// Command for the binary under test, hermetic against ambient env.
    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cbwm-eval"));
        cmd.current_dir(self.temp.path())
            .env("INVOKE_LOG", &self.invoke_log)
            .env_remove("DATASET_PATH")
            .env_remove("FAIL_ON")
            .env_remove("FAIL_CODE")
            .env_remove("SLEEP_ON");
        cmd
    }

    fn run(&self) -> Output {
        self.command().arg("run").output().expect("run cbwm-eval")
    }

    /// Recorded `(config_name, dataset_override)` pairs, in invocation order.
    fn invocations(&self) -> Vec<(String, String)> {
        if !self.invoke_log.exists() {
            return Vec::new();
        }
        let contents = fs::read_to_string(&self.invoke_log).expect("read invoke log");
        contents
            .lines()
            .map(|line| {
                let (config, datum) = line.split_once('|').expect("log line format");
                (config.to_string(), datum.to_string())
            })
            .collect()
    }
}

fn expected_override(dataset: &str) -> String {
    format!("habitat.dataset.data_path={dataset}")
}

#[test]
fn run_executes_all_configs_in_order_with_default_dataset() {
    let planner = FakePlanner::new();
    let output = planner.run();

    assert_eq!(output.status.code(), Some(0));
    let invocations = planner.invocations();
    let configs: Vec<&str> = invocations.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(configs, DEMO_CONFIGS);
    assert!(
        invocations
            .iter()
            .all(|(_, datum)| datum == &expected_override(DEFAULT_DATASET_PATH))
    );
}

#[test]
fn dataset_env_overrides_default() {
    let planner = FakePlanner::new();
    let output = planner
        .command()
        .arg("run")
        .env("DATASET_PATH", "data/alt/val.json.gz")
        .output()
        .expect("run cbwm-eval");

    assert_eq!(output.status.code(), Some(0));
    assert!(
        planner
            .invocations()
            .iter()
            .all(|(_, datum)| datum == &expected_override("data/alt/val.json.gz"))
    );
}

#[test]
fn dataset_flag_wins_over_env() {
    let planner = FakePlanner::new();
    let output = planner
        .command()
        .args(["run", "--dataset", "data/flag/val.json.gz"])
        .env("DATASET_PATH", "data/env/val.json.gz")
        .output()
        .expect("run cbwm-eval");

    assert_eq!(output.status.code(), Some(0));
    assert!(
        planner
            .invocations()
            .iter()
            .all(|(_, datum)| datum == &expected_override("data/flag/val.json.gz"))
    );
}

#[test]
fn fail_fast_stops_batch_and_propagates_exit_code() {
    let planner = FakePlanner::new();
    let output = planner
        .command()
        .arg("run")
        .env("FAIL_ON", DEMO_CONFIGS[2])
        .env("FAIL_CODE", "7")
        .output()
        .expect("run cbwm-eval");

    assert_eq!(output.status.code(), Some(7));
    let invocations = planner.invocations();
    let configs: Vec<&str> = invocations.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(configs, &DEMO_CONFIGS[..3]);

    // The planner's own diagnostics pass through unwrapped.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("planner exploded"));
    assert!(stderr.contains(DEMO_CONFIGS[2]));
}

#[test]
fn banners_name_each_config_before_its_output() {
    let planner = FakePlanner::new();
    let output = planner.run();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    for config_name in DEMO_CONFIGS {
        let banner = format!("=== running {config_name} ===");
        let banner_at = stdout.find(&banner).expect("banner present");
        let run_output_at = stdout
            .find(&format!("planner ok {config_name}"))
            .expect("planner output present");
        assert!(banner_at < run_output_at, "banner precedes run output");
    }
    assert_eq!(stdout.matches("=== running ").count(), DEMO_CONFIGS.len());
}

#[test]
fn logs_dir_captures_runs_and_meta() {
    let planner = FakePlanner::new();
    let output = planner
        .command()
        .args(["run", "--logs-dir", "logs"])
        .output()
        .expect("run cbwm-eval");
    assert_eq!(output.status.code(), Some(0));

    let logs = planner.temp.path().join("logs");
    for config_name in DEMO_CONFIGS {
        let log_path = logs.join(format!("{}.log", config_name.replace('/', "_")));
        let contents = fs::read_to_string(&log_path).expect("run log exists");
        assert!(contents.contains(&format!("planner ok {config_name}")));
    }

    let meta_raw = fs::read_to_string(logs.join("meta.json")).expect("meta exists");
    let meta: BatchMeta = serde_json::from_str(&meta_raw).expect("meta parses");
    assert!(meta.completed);
    assert_eq!(meta.runs.len(), DEMO_CONFIGS.len());
    assert_eq!(meta.dataset_path, DEFAULT_DATASET_PATH);
    assert!(meta.runs.iter().all(|run| run.exit_code == Some(0)));
}

#[test]
fn timeout_kills_hung_planner() {
    let planner = FakePlanner::with_config(|cfg| {
        cfg.run_timeout_secs = Some(1);
    });
    let output = planner
        .command()
        .arg("run")
        .env("SLEEP_ON", DEMO_CONFIGS[0])
        .output()
        .expect("run cbwm-eval");

    // No child exit code to propagate, so the batch reports a runner error.
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(planner.invocations().len(), 1);
}

#[test]
fn list_prints_configs_in_order() {
    let planner = FakePlanner::new();
    let output = planner
        .command()
        .arg("list")
        .output()
        .expect("list cbwm-eval");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, DEMO_CONFIGS);
}
