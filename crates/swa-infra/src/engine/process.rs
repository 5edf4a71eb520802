//! Engine subprocess execution with timeout and cancellation.
//!
//! Output is either captured through pipes (read in spawned tasks, capped
//! per stream) or redirected, stdout and stderr both, into a log file. The
//! child is killed and reaped when the timeout fires or the job is
//! cancelled.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use swa_core::job::ProcessTracker;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::command::EngineCommand;

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// How long to wait for pipe readers after the child is gone. Grandchildren
/// that inherited the pipes can keep them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Capture,
    /// Both streams are appended to this file.
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exit code; processes killed by a signal report `-1`.
    Exited(i32),
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub outcome: ProcessOutcome,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    fn empty(outcome: ProcessOutcome) -> Self {
        Self {
            outcome,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Spawn `command`, register it with `tracker`, and wait for it.
///
/// Returns `Err` only when the process cannot be spawned or waited on.
pub async fn run_engine(
    command: &EngineCommand,
    sink: &OutputSink,
    timeout: Duration,
    tracker: &ProcessTracker,
) -> std::io::Result<ProcessOutput> {
    if tracker.cancel_token().is_cancelled() {
        return Ok(ProcessOutput::empty(ProcessOutcome::Cancelled));
    }

    let mut cmd = command.to_command();
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    match sink {
        OutputSink::Capture => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        OutputSink::File(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let log = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            cmd.stdout(Stdio::from(log.try_clone()?)).stderr(Stdio::from(log));
        }
    }

    tracing::debug!(command = %command, "spawning engine");
    let mut child = cmd.spawn()?;
    let token = tracker.register(child.id());

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let outcome = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => Ok(ProcessOutcome::Exited(status.code().unwrap_or(-1))),
            Err(e) => Err(e),
        },
        _ = token.cancelled() => Ok(ProcessOutcome::Cancelled),
        _ = tokio::time::sleep(timeout) => Ok(ProcessOutcome::TimedOut),
    };

    if !matches!(outcome, Ok(ProcessOutcome::Exited(_))) {
        // Kill and reap so no zombie is left behind.
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
    tracker.unregister();
    let outcome = outcome?;

    match outcome {
        ProcessOutcome::TimedOut => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "engine timed out, process killed");
        }
        ProcessOutcome::Cancelled => tracing::info!("engine process cancelled"),
        ProcessOutcome::Exited(code) => tracing::debug!(exit_code = code, "engine exited"),
    }

    let stdout = drain(stdout_task).await;
    let stderr = drain(stderr_task).await;
    Ok(ProcessOutput {
        outcome,
        stdout,
        stderr,
    })
}

async fn drain(task: tokio::task::JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(DRAIN_GRACE, task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}

/// Read an output stream to EOF, keeping the first [`MAX_OUTPUT_BYTES`].
///
/// The remainder is discarded but still read so the child never sees a
/// closed pipe.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
