mod editor;
mod help;

use crate::cli::Cli;
use crate::logbuf::LogBuffer;
use crate::model::{
    from_editable, to_editable, AppEvent, EditableJob, Notice, RunResult, RunState, Tab,
};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How long a transient notice stays on the status line.
const NOTICE_TTL: Duration = Duration::from_secs(4);

struct UiState {
    tab: Tab,
    run_state: RunState,
    job: EditableJob,
    editor: editor::EditorState,
    logs: LogBuffer,
    /// Lines scrolled up from the log tail; 0 follows new output.
    logs_scroll_back: usize,
    results: Vec<RunResult>,
    results_scroll: usize,
    notice: Option<Notice>,
    notice_at: Option<Instant>,
}

impl UiState {
    fn new(job: EditableJob) -> Self {
        Self {
            tab: Tab::Editor,
            run_state: RunState::Idle,
            job,
            editor: editor::EditorState::default(),
            logs: LogBuffer::default(),
            logs_scroll_back: 0,
            results: Vec::new(),
            results_scroll: 0,
            notice: None,
            notice_at: None,
        }
    }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_at = Some(Instant::now());
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let spec = match args.job.as_deref() {
        Some(path) => crate::job::load(path)?,
        None => crate::job::template(),
    };

    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // The TUI runs in a dedicated thread to keep blocking terminal I/O out of the runtime.
    let ui_job = to_editable(&spec);
    let ui_handle = std::thread::spawn(move || run_threaded(ui_job, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&args, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    job: EditableJob,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; the controller reaches it
    // solely through the event stream.
    let mut state = UiState::new(job);
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain controller events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        // Transient notices expire; sticky ones stay until replaced.
        let expired = matches!(
            (&state.notice, state.notice_at),
            (Some(notice), Some(at)) if !notice.sticky && at.elapsed() >= NOTICE_TTL
        );
        if expired {
            state.notice = None;
            state.notice_at = None;
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &mut state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }

                let quit_combo =
                    k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c');

                // Text entry captures the keyboard until committed or cancelled.
                if state.tab == Tab::Editor && state.editor.editing.is_some() && !quit_combo {
                    editor::handle_edit_key(&mut state.job, &mut state.editor, k.code);
                    continue;
                }

                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => state.tab = state.tab.next(),
                    (_, KeyCode::Char('?')) => state.tab = Tab::Help,
                    (_, KeyCode::Char('r')) => {
                        // The controller owns the re-entrancy guard; submitting
                        // here is always safe.
                        let _ = cmd_tx.send(UiCommand::Submit(from_editable(&state.job)));
                    }
                    _ => handle_tab_key(&mut state, k.code),
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn handle_tab_key(state: &mut UiState, code: KeyCode) {
    match state.tab {
        Tab::Editor => {
            if let Some(notice) =
                editor::handle_key(&mut state.job, &mut state.editor, code, state.run_state)
            {
                state.set_notice(notice);
            }
        }
        Tab::Logs => match code {
            KeyCode::Up | KeyCode::Char('k') => state.logs_scroll_back += 1,
            KeyCode::Down | KeyCode::Char('j') => {
                state.logs_scroll_back = state.logs_scroll_back.saturating_sub(1)
            }
            KeyCode::Char('G') => state.logs_scroll_back = 0,
            _ => {}
        },
        Tab::Results => match code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.results_scroll = state.results_scroll.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => state.results_scroll += 1,
            KeyCode::Char('g') => state.results_scroll = 0,
            _ => {}
        },
        Tab::Help => {}
    }
}

fn apply_event(state: &mut UiState, ev: AppEvent) {
    match ev {
        AppEvent::RunStateChanged(run_state) => {
            if run_state == RunState::Running {
                // A fresh run owns the log view from its first fragment.
                state.logs.reset();
                state.logs_scroll_back = 0;
                // Any in-progress edit is abandoned; the job is read-only now.
                state.editor.editing = None;
            }
            state.run_state = run_state;
        }
        AppEvent::LogFragment(fragment) => state.logs.append(fragment),
        AppEvent::ResultsCommitted(results) => {
            state.results = results;
            state.results_scroll = 0;
        }
        AppEvent::Notice(notice) => state.set_notice(notice),
        AppEvent::FocusTab(tab) => state.tab = tab,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &mut UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(Block::default().borders(Borders::ALL).title("prompt-eval"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        Tab::Editor => {
            editor::draw_editor(chunks[1], f, &state.job, &mut state.editor, state.run_state)
        }
        Tab::Logs => draw_logs(chunks[1], f, state),
        Tab::Results => draw_results(chunks[1], f, state),
        Tab::Help => help::draw_help(chunks[1], f),
    }

    draw_status(chunks[2], f, state);
}

fn draw_logs(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let text = state.logs.snapshot().concat();
    let total_lines = text.lines().count();
    let viewport = area.height.saturating_sub(2) as usize;

    // Follow the tail unless the user scrolled back.
    let max_back = total_lines.saturating_sub(viewport);
    let back = state.logs_scroll_back.min(max_back);
    let y = (max_back - back) as u16;

    let title = if state.run_state == RunState::Running {
        "Logs (running…)"
    } else {
        "Logs"
    };
    let p = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((y, 0));
    f.render_widget(p, area);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();

    if state.results.is_empty() {
        lines.push(Line::from("No results yet. Press 'r' to run the job."));
    }
    for (i, result) in state.results.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", i + 1), label_style),
            Span::styled(result.name.clone(), Style::default().fg(Color::Cyan)),
        ]));
        lines.push(Line::from(vec![
            Span::styled("system   ", label_style),
            Span::raw(result.system.clone()),
        ]));
        lines.push(Line::from(vec![
            Span::styled("user     ", label_style),
            Span::raw(result.user.clone()),
        ]));
        lines.push(Line::from(Span::styled("response", label_style)));
        for line in result.response.lines() {
            lines.push(Line::from(format!("  {line}")));
        }
    }

    let y = state.results_scroll.min(lines.len().saturating_sub(1)) as u16;
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Results ({})", state.results.len())),
        )
        .scroll((y, 0));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = vec![match state.run_state {
        RunState::Running => Span::styled("● running", Style::default().fg(Color::Yellow)),
        RunState::Idle => Span::styled("○ idle", Style::default().fg(Color::DarkGray)),
    }];
    if let Some(notice) = &state.notice {
        let color = if notice.sticky {
            Color::Red
        } else {
            Color::Green
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            notice.message.clone(),
            Style::default().fg(color),
        ));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
