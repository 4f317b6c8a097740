//! Helpers for running child processes with pass-through output.

use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, warn};
use wait_timeout::ChildExt;

/// Result of a pass-through child run.
#[derive(Debug)]
pub struct RunStatus {
    pub status: ExitStatus,
    pub timed_out: bool,
}

/// Run a command, forwarding child stdout/stderr line by line to the parent's
/// own stdout/stderr and optionally tee-ing both streams to `log_path`.
///
/// Output is drained concurrently while the child runs so neither pipe can
/// fill and deadlock. With `timeout` set the child is killed once the budget
/// elapses; otherwise the call blocks until the child exits.
#[tracing::instrument(skip_all, fields(timeout = ?timeout, logging = log_path.is_some()))]
pub fn run_passthrough(
    mut cmd: Command,
    timeout: Option<Duration>,
    log_path: Option<&Path>,
) -> Result<RunStatus> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let log_file = match log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create log dir {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("create log file {}", path.display()))?;
            Some(Mutex::new(BufWriter::new(file)))
        }
        None => None,
    };
    let log_file = Arc::new(log_file);

    let stdout_log = log_file.clone();
    let stdout_handle = thread::spawn(move || forward_stream(stdout, std::io::stdout(), &stdout_log));
    let stderr_log = log_file.clone();
    let stderr_handle = thread::spawn(move || forward_stream(stderr, std::io::stderr(), &stderr_log));

    let mut timed_out = false;
    let status = match timeout {
        Some(budget) => match child.wait_timeout(budget).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(
                    timeout_secs = budget.as_secs(),
                    "command timed out, killing"
                );
                timed_out = true;
                child.kill().context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
        None => child.wait().context("wait for command")?,
    };

    join_forwarder(stdout_handle).context("join stdout")?;
    join_forwarder(stderr_handle).context("join stderr")?;

    if let Some(mutex) = &*log_file
        && let Ok(mut writer) = mutex.lock()
    {
        writer.flush().context("flush log file")?;
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(RunStatus { status, timed_out })
}

/// Copy a stream to a sink line by line, tee-ing each line to the log file.
fn forward_stream<R: Read, W: Write>(
    reader: R,
    mut sink: W,
    log_file: &Arc<Option<Mutex<BufWriter<File>>>>,
) -> Result<()> {
    let mut buf_reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        // Forward and flush immediately so planner output stays live.
        sink.write_all(&line).context("forward line")?;
        sink.flush().context("flush forwarded line")?;

        if let Some(mutex) = &**log_file
            && let Ok(mut writer) = mutex.lock()
        {
            if let Err(e) = writer.write_all(&line) {
                warn!(err = %e, "failed to write to log file");
            }
        }
    }
    Ok(())
}

fn join_forwarder(handle: thread::JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output forwarder thread panicked")),
    }
}
