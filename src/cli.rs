use crate::model::{AppEvent, RunConfig, RunResult};
use crate::orchestrator::{run_controller, UiCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for the stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    /// Raw fragment, written without a trailing newline (engine log chunks).
    StderrRaw(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = stderr.lock();

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::StderrRaw(msg) => {
                    let _ = write!(err, "{}", msg);
                    let _ = err.flush();
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "prompt-eval-cli",
    version,
    about = "Run prompt-evaluation jobs against local and remote models"
)]
pub struct Cli {
    /// Path to a job file (JSON). The TUI starts from a template when omitted.
    pub job: Option<PathBuf>,

    /// Evaluation engine executable
    #[arg(long, default_value = "prompt-eval")]
    pub engine: PathBuf,

    /// Ask the engine to use the GPU
    #[arg(long)]
    pub use_gpu: bool,

    /// Path for the engine's NDJSON output (defaults to a timestamped file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Delay before the advisory tab switch after submit and after completion
    #[arg(long, default_value = "1s")]
    pub focus_delay: humantime::Duration,

    /// Submit the job and print decoded results as a JSON array (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Submit the job, stream engine logs to stderr, print a text summary (no TUI)
    #[arg(long)]
    pub text: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if args.json || args.text {
        return run_headless(args).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(args).await
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        run_headless(args).await
    }
}

/// Build a [`RunConfig`] from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        engine: args.engine.clone(),
        use_gpu: args.use_gpu,
        output: args.output.clone(),
        focus_delay: Duration::from(args.focus_delay),
    }
}

/// Submit a job file through the controller without a TUI and print the
/// committed results once the run completes.
async fn run_headless(args: Cli) -> Result<()> {
    let path = args
        .job
        .clone()
        .ok_or_else(|| anyhow::anyhow!("a job file is required with --json/--text"))?;
    let spec = crate::job::load(&path)?;

    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let _ = cmd_tx.send(UiCommand::Submit(spec));

    // Every run ends with exactly one notice (success or failure), which is
    // the consumer's cue to stop the controller.
    let consumer_out = out_tx.clone();
    let stream_logs = args.text;
    let consumer = tokio::spawn(async move {
        let mut results: Vec<RunResult> = Vec::new();
        let mut failure: Option<String> = None;
        while let Some(ev) = event_rx.recv().await {
            match ev {
                AppEvent::LogFragment(fragment) => {
                    if stream_logs {
                        let _ = consumer_out.send(OutputLine::StderrRaw(fragment));
                    }
                }
                AppEvent::ResultsCommitted(committed) => results = committed,
                AppEvent::Notice(notice) => {
                    if notice.sticky {
                        failure = Some(notice.message);
                    }
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break;
                }
                AppEvent::RunStateChanged(_) | AppEvent::FocusTab(_) => {}
            }
        }
        (results, failure)
    });

    run_controller(&args, event_tx, cmd_rx).await?;
    let (results, failure) = consumer.await.context("event consumer failed")?;

    if let Some(message) = failure {
        drop(out_tx);
        let _ = out_handle.await;
        return Err(anyhow::anyhow!(message));
    }

    if args.json {
        let out = serde_json::to_string_pretty(&results)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in crate::text_summary::build_text_summary(&results).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
