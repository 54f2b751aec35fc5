//! End-to-end controller tests against a scripted engine executable.
//!
//! The fake engine is a shell script honoring the real contract: it reads
//! the submission from stdin, writes log output to stdout, and leaves an
//! NDJSON payload at the path given by `--output`.

#![cfg(unix)]

use clap::Parser;
use prompt_eval_cli::cli::Cli;
use prompt_eval_cli::model::{AppEvent, JobSpec, Notice, RunState};
use prompt_eval_cli::orchestrator::{run_controller, UiCommand};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::timeout;

fn fake_engine(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-engine.sh");
    // Invoked as: fake-engine.sh --show-output --output <path> run -
    std::fs::write(&path, format!("#!/bin/sh\nout=\"$3\"\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn sample_job() -> JobSpec {
    serde_json::from_str(
        r#"{
            "prompt": "p",
            "system": "s",
            "variables": { "{{x}}": ["1"] },
            "localModels": [],
            "remoteModels": []
        }"#,
    )
    .unwrap()
}

fn cli_for(engine: &Path, output: &Path) -> Cli {
    Cli::parse_from([
        "prompt-eval-cli",
        "--engine",
        engine.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--focus-delay",
        "10ms",
    ])
}

async fn next_event(rx: &mut UnboundedReceiver<AppEvent>) -> AppEvent {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

#[tokio::test]
async fn submit_runs_to_completion_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(
        dir.path(),
        concat!(
            "cat > /dev/null\n",
            "printf 'a\\n'\n",
            "sleep 0.2\n",
            "printf 'b\\n'\n",
            "printf '{\"name\":\"m1\",\"system\":\"s1\",\"user\":\"u1\",\"response\":\"r1\"}\\n",
            "{\"name\":\"m2\",\"system\":\"s2\",\"user\":\"u2\",\"response\":\"r2\"}\\n' > \"$out\"",
        ),
    );
    let args = cli_for(&engine, &dir.path().join("out.ndjson"));

    let (event_tx, mut event_rx) = unbounded_channel();
    let (cmd_tx, cmd_rx) = unbounded_channel();
    let controller = tokio::spawn(async move { run_controller(&args, event_tx, cmd_rx).await });

    cmd_tx.send(UiCommand::Submit(sample_job())).unwrap();

    let mut order = Vec::new();
    let mut states = Vec::new();
    let mut logs = String::new();
    let mut committed = None;
    let notice = loop {
        match next_event(&mut event_rx).await {
            AppEvent::RunStateChanged(s) => {
                order.push("state");
                states.push(s);
            }
            AppEvent::LogFragment(f) => logs.push_str(&f),
            AppEvent::ResultsCommitted(r) => {
                order.push("results");
                committed = Some(r);
            }
            AppEvent::Notice(n) => break n,
            AppEvent::FocusTab(_) => {}
        }
    };

    cmd_tx.send(UiCommand::Quit).unwrap();
    controller.await.unwrap().unwrap();

    assert_eq!(states, [RunState::Running, RunState::Idle]);
    assert_eq!(logs, "a\nb\n");
    // Idle is observed before the wholesale commit.
    assert_eq!(order, ["state", "state", "results"]);
    let committed = committed.expect("results were committed");
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[0].name, "m1");
    assert_eq!(committed[1].name, "m2");
    assert_eq!(committed[1].response, "r2");
    assert!(!notice.sticky);
    assert!(notice.message.contains("2 output"));
}

#[tokio::test]
async fn submit_is_refused_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(
        dir.path(),
        concat!(
            "cat > /dev/null\n",
            "sleep 0.5\n",
            "printf '{\"name\":\"m\",\"system\":\"\",\"user\":\"\",\"response\":\"\"}\\n' > \"$out\"",
        ),
    );
    let args = cli_for(&engine, &dir.path().join("out.ndjson"));

    let (event_tx, mut event_rx) = unbounded_channel();
    let (cmd_tx, cmd_rx) = unbounded_channel();
    let controller = tokio::spawn(async move { run_controller(&args, event_tx, cmd_rx).await });

    cmd_tx.send(UiCommand::Submit(sample_job())).unwrap();

    let mut states = Vec::new();
    let mut notices: Vec<Notice> = Vec::new();
    let mut resubmitted = false;
    loop {
        match next_event(&mut event_rx).await {
            AppEvent::RunStateChanged(s) => {
                states.push(s);
                if s == RunState::Running && !resubmitted {
                    // Second submission while the first is still active.
                    cmd_tx.send(UiCommand::Submit(sample_job())).unwrap();
                    resubmitted = true;
                }
            }
            AppEvent::Notice(n) => {
                let done = n.message.contains("Run complete");
                notices.push(n);
                if done {
                    break;
                }
            }
            _ => {}
        }
    }

    cmd_tx.send(UiCommand::Quit).unwrap();
    controller.await.unwrap().unwrap();

    // Never Running twice without an intervening Idle.
    assert_eq!(states, [RunState::Running, RunState::Idle]);
    assert_eq!(notices.len(), 2);
    assert!(notices[0].message.contains("already in progress"));
    assert!(!notices[0].sticky);
}

#[tokio::test]
async fn malformed_payload_recovers_without_committing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fake_engine(
        dir.path(),
        concat!("cat > /dev/null\n", "printf '{\"bad json\\n' > \"$out\""),
    );
    let args = cli_for(&engine, &dir.path().join("out.ndjson"));

    let (event_tx, mut event_rx) = unbounded_channel();
    let (cmd_tx, cmd_rx) = unbounded_channel();
    let controller = tokio::spawn(async move { run_controller(&args, event_tx, cmd_rx).await });

    cmd_tx.send(UiCommand::Submit(sample_job())).unwrap();

    let mut states = Vec::new();
    let mut commits = 0;
    let mut sticky_notices = Vec::new();
    let mut resubmitted = false;
    loop {
        match next_event(&mut event_rx).await {
            AppEvent::RunStateChanged(s) => states.push(s),
            AppEvent::ResultsCommitted(_) => commits += 1,
            AppEvent::Notice(n) => {
                assert!(n.sticky, "decode failure must surface a sticky notice");
                sticky_notices.push(n);
                if resubmitted {
                    break;
                }
                // The machine is re-enterable after a failed run.
                cmd_tx.send(UiCommand::Submit(sample_job())).unwrap();
                resubmitted = true;
            }
            _ => {}
        }
    }

    cmd_tx.send(UiCommand::Quit).unwrap();
    controller.await.unwrap().unwrap();

    assert_eq!(commits, 0, "results must stay at their prior value");
    assert_eq!(
        states,
        [
            RunState::Running,
            RunState::Idle,
            RunState::Running,
            RunState::Idle
        ]
    );
    assert!(sticky_notices[0].message.contains("parse"));
}

#[tokio::test]
async fn dispatch_failure_stays_idle() {
    let dir = tempfile::tempdir().unwrap();
    let args = cli_for(
        &dir.path().join("missing-engine"),
        &dir.path().join("out.ndjson"),
    );

    let (event_tx, mut event_rx) = unbounded_channel();
    let (cmd_tx, cmd_rx) = unbounded_channel();
    let controller = tokio::spawn(async move { run_controller(&args, event_tx, cmd_rx).await });

    cmd_tx.send(UiCommand::Submit(sample_job())).unwrap();

    let notice = loop {
        match next_event(&mut event_rx).await {
            AppEvent::RunStateChanged(_) => panic!("state must stay Idle when dispatch fails"),
            AppEvent::Notice(n) => break n,
            _ => {}
        }
    };

    cmd_tx.send(UiCommand::Quit).unwrap();
    controller.await.unwrap().unwrap();

    assert!(notice.sticky);
    assert!(notice.message.contains("Could not start engine"));
}
