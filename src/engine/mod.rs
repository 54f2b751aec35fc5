//! Process boundary to the evaluation engine.
//!
//! The engine is an external executable. A run is dispatched by spawning it
//! with the job JSON on stdin; its stdout/stderr become the run's log-event
//! stream, and the NDJSON file it writes becomes the terminal `done` payload
//! once the process exits.

use crate::model::{EngineEvent, RunConfig, Submission};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to encode submission")]
    Encode(#[from] serde_json::Error),
    #[error("failed to start engine {program:?}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle for one dispatched run: its event subscription and the task
/// driving the engine process. Dropping the receiver ends the subscription.
pub struct RunHandle {
    pub events: UnboundedReceiver<EngineEvent>,
    pub task: tokio::task::JoinHandle<Result<()>>,
}

/// Spawn the engine for one run. Returns once the process has started;
/// feeding stdin, streaming output, and emitting `Done` happen in the
/// background task.
pub fn dispatch(cfg: &RunConfig, submission: Submission) -> Result<RunHandle, DispatchError> {
    let output_path = cfg.output.clone().unwrap_or_else(default_output_path);

    let mut command = Command::new(&cfg.engine);
    if cfg.use_gpu {
        command.arg("--use-gpu");
    }
    command
        .arg("--show-output")
        .arg("--output")
        .arg(&output_path)
        .arg("run")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| DispatchError::Spawn {
        program: cfg.engine.clone(),
        source,
    })?;

    tracing::info!(engine = %cfg.engine.display(), output = %output_path.display(), "dispatched run");

    let (event_tx, events) = mpsc::unbounded_channel();
    let task = tokio::spawn(drive_run(child, submission, output_path, event_tx));

    Ok(RunHandle { events, task })
}

/// Feed the submission, relay output, and emit the terminal event.
///
/// `Done` is always emitted once the process exits, even on a failed run:
/// the engine's own error output has already been streamed as log fragments,
/// and an absent output file decodes to zero results.
async fn drive_run(
    mut child: Child,
    submission: Submission,
    output_path: PathBuf,
    event_tx: UnboundedSender<EngineEvent>,
) -> Result<()> {
    let mut stdin = child.stdin.take().context("engine stdin not captured")?;
    let stdout = child.stdout.take().context("engine stdout not captured")?;
    let stderr = child.stderr.take().context("engine stderr not captured")?;

    let stdout_task = tokio::spawn(forward_output(stdout, event_tx.clone()));
    let stderr_task = tokio::spawn(forward_output(stderr, event_tx.clone()));

    stdin
        .write_all(submission.as_str().as_bytes())
        .await
        .context("writing submission to engine stdin")?;
    // Closing stdin marks the end of the submission.
    drop(stdin);

    let status = child.wait().await.context("waiting for engine")?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if !status.success() {
        tracing::warn!(%status, "engine exited with failure");
    }

    let payload = tokio::fs::read_to_string(&output_path)
        .await
        .unwrap_or_default();
    let _ = event_tx.send(EngineEvent::Done { payload });

    Ok(())
}

/// Relay one output stream as log fragments. Chunks, not lines, so progress
/// indicators and control sequences stream through unbuffered.
async fn forward_output<R>(mut reader: R, event_tx: UnboundedSender<EngineEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let fragment = String::from_utf8_lossy(&buf[..n]).into_owned();
                if event_tx.send(EngineEvent::Log(fragment)).is_err() {
                    break;
                }
            }
        }
    }
}

/// The default NDJSON output path if none was provided.
fn default_output_path() -> PathBuf {
    let format =
        time::macros::format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let datetime = time::OffsetDateTime::now_utc()
        .format(format)
        .unwrap_or_else(|_| "now".into());
    PathBuf::from(format!("output-{datetime}.ndjson"))
}
