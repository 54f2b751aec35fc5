//! Run lifecycle controller.
//!
//! Owns the Idle/Running state machine and emits events for presentation
//! layers. One run at a time: a submission dispatched while a run is active
//! is refused, never queued.

use crate::cli::{build_config, Cli};
use crate::decode::decode_results;
use crate::engine::{self, DispatchError, RunHandle};
use crate::model::{AppEvent, EngineEvent, Notice, RunState, Submission, Tab};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the run lifecycle.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Submit(crate::model::JobSpec),
    Quit,
}

/// Orchestrate runs based on UI commands and emit events back to
/// presentation layers. Returns once `Quit` is received and any active run
/// has finished; cancellation of a running job is not supported.
pub async fn run_controller(
    args: &Cli,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let cfg = build_config(args);
    let mut run_state = RunState::Idle;
    // The active run's event subscription; dropped when the run finishes so
    // late events cannot leak into the next run.
    let mut active: Option<RunHandle> = None;
    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(spec)) => {
                        if run_state == RunState::Running {
                            let _ = event_tx.send(AppEvent::Notice(Notice::transient(
                                "A run is already in progress",
                            )));
                            continue;
                        }
                        let dispatched = Submission::encode(&spec)
                            .map_err(DispatchError::from)
                            .and_then(|submission| engine::dispatch(&cfg, submission));
                        match dispatched {
                            Ok(handle) => {
                                active = Some(handle);
                                run_state = RunState::Running;
                                let _ = event_tx.send(AppEvent::RunStateChanged(RunState::Running));
                                schedule_focus(event_tx.clone(), Tab::Logs, cfg.focus_delay);
                            }
                            Err(e) => {
                                let e = anyhow::Error::from(e);
                                tracing::warn!(error = %e, "dispatch failed");
                                let _ = event_tx.send(AppEvent::Notice(Notice::sticky(format!(
                                    "Could not start engine: {e:#}"
                                ))));
                            }
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        if active.is_none() {
                            break Ok(());
                        }
                        // Quit waits for the active run so the engine process
                        // is reaped and the terminal event is observed.
                        quit_pending = true;
                    }
                }
            }
            ev = async {
                match active.as_mut() {
                    Some(handle) => handle.events.recv().await,
                    None => futures::future::pending().await,
                }
            } => {
                match ev {
                    Some(EngineEvent::Log(fragment)) => {
                        let _ = event_tx.send(AppEvent::LogFragment(fragment));
                    }
                    Some(EngineEvent::Done { payload }) => {
                        let handle = active.take();
                        run_state = RunState::Idle;
                        let _ = event_tx.send(AppEvent::RunStateChanged(RunState::Idle));

                        match decode_results(&payload) {
                            Ok(results) => {
                                let count = results.len();
                                let _ = event_tx.send(AppEvent::ResultsCommitted(results));
                                let _ = event_tx.send(AppEvent::Notice(Notice::transient(
                                    format!("Run complete: {count} output(s) generated"),
                                )));
                                schedule_focus(event_tx.clone(), Tab::Results, cfg.focus_delay);
                            }
                            Err(e) => {
                                tracing::warn!(line = e.line, "result payload malformed");
                                let _ = event_tx.send(AppEvent::Notice(Notice::sticky(format!(
                                    "Could not parse results: {e}"
                                ))));
                            }
                        }

                        reap(handle, &event_tx).await;
                        if quit_pending {
                            break Ok(());
                        }
                    }
                    None => {
                        // The engine task ended without a terminal event
                        // (e.g. stdin write failed). Recover to Idle so a new
                        // run can start; the error surfaces from the task.
                        let handle = active.take();
                        run_state = RunState::Idle;
                        let _ = event_tx.send(AppEvent::RunStateChanged(RunState::Idle));
                        reap(handle, &event_tx).await;
                        if quit_pending {
                            break Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Await the finished run task and surface any error it carries.
async fn reap(handle: Option<RunHandle>, event_tx: &UnboundedSender<AppEvent>) {
    let Some(handle) = handle else { return };
    match handle.task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = event_tx.send(AppEvent::Notice(Notice::sticky(format!("Engine: {e:#}"))));
        }
        Err(e) => {
            let _ = event_tx.send(AppEvent::Notice(Notice::sticky(format!(
                "Engine task failed: {e}"
            ))));
        }
    }
}

/// Advisory two-step reveal: ask the UI to focus a tab after a short delay.
/// Spawned so the state transition is never blocked on it.
fn schedule_focus(event_tx: UnboundedSender<AppEvent>, tab: Tab, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = event_tx.send(AppEvent::FocusTab(tab));
    });
}
