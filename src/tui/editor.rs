//! Job editor tab.
//!
//! Renders the editable job as a flat list of addressable rows and applies
//! positional edits: inserting/removing variables, values, and model
//! entries, and inline text editing of any field. All mutations are plain
//! `Vec` operations on the positional projection; the canonical mapping
//! form is only re-derived on submission.

use crate::model::{EditableJob, LocalModel, Notice, RemoteModel, RunState, VariableEntry};
use crossterm::event::KeyCode;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Which editable field a row addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Prompt,
    System,
    VariableKey(usize),
    VariableValue(usize, usize),
    LocalPath(usize),
    LocalTemplate(usize),
    LocalArchitecture(usize),
    RemoteName(usize),
    RemoteUrl(usize),
}

#[derive(Debug, Default)]
pub struct EditorState {
    pub selected: usize,
    /// In-progress text for the selected row; `None` when navigating.
    pub editing: Option<String>,
    pub scroll: usize,
}

/// Flatten the job into its row list; rendering and key handling share this
/// ordering so the cursor always addresses a real field.
pub fn rows(job: &EditableJob) -> Vec<Row> {
    let mut rows = vec![Row::Prompt, Row::System];
    for (i, var) in job.variables.iter().enumerate() {
        rows.push(Row::VariableKey(i));
        for j in 0..var.values.len() {
            rows.push(Row::VariableValue(i, j));
        }
    }
    for i in 0..job.local_models.len() {
        rows.push(Row::LocalPath(i));
        rows.push(Row::LocalTemplate(i));
        rows.push(Row::LocalArchitecture(i));
    }
    for i in 0..job.remote_models.len() {
        rows.push(Row::RemoteName(i));
        rows.push(Row::RemoteUrl(i));
    }
    rows
}

fn row_label(row: Row) -> String {
    match row {
        Row::Prompt => "prompt".into(),
        Row::System => "system".into(),
        Row::VariableKey(i) => format!("variable {}", i + 1),
        Row::VariableValue(_, j) => format!("  value {}", j + 1),
        Row::LocalPath(i) => format!("local {} path", i + 1),
        Row::LocalTemplate(i) => format!("local {} template", i + 1),
        Row::LocalArchitecture(i) => format!("local {} arch", i + 1),
        Row::RemoteName(i) => format!("remote {} name", i + 1),
        Row::RemoteUrl(i) => format!("remote {} url", i + 1),
    }
}

fn row_value(job: &EditableJob, row: Row) -> &str {
    match row {
        Row::Prompt => &job.prompt,
        Row::System => &job.system,
        Row::VariableKey(i) => &job.variables[i].key,
        Row::VariableValue(i, j) => &job.variables[i].values[j],
        Row::LocalPath(i) => &job.local_models[i].path,
        Row::LocalTemplate(i) => &job.local_models[i].template_path,
        Row::LocalArchitecture(i) => &job.local_models[i].architecture,
        Row::RemoteName(i) => &job.remote_models[i].name,
        Row::RemoteUrl(i) => &job.remote_models[i].api_base_url,
    }
}

fn set_row_value(job: &mut EditableJob, row: Row, text: String) {
    match row {
        Row::Prompt => job.prompt = text,
        Row::System => job.system = text,
        Row::VariableKey(i) => job.variables[i].key = text,
        Row::VariableValue(i, j) => job.variables[i].values[j] = text,
        Row::LocalPath(i) => job.local_models[i].path = text,
        Row::LocalTemplate(i) => job.local_models[i].template_path = text,
        Row::LocalArchitecture(i) => job.local_models[i].architecture = text,
        Row::RemoteName(i) => job.remote_models[i].name = text,
        Row::RemoteUrl(i) => job.remote_models[i].api_base_url = text,
    }
}

fn select(ed: &mut EditorState, job: &EditableJob, target: Row) {
    if let Some(pos) = rows(job).iter().position(|r| *r == target) {
        ed.selected = pos;
    }
}

fn clamp_selection(ed: &mut EditorState, job: &EditableJob) {
    let len = rows(job).len();
    if ed.selected >= len {
        ed.selected = len.saturating_sub(1);
    }
}

/// Handle a navigation/structural key. Returns a notice when the key was
/// understood but refused (the job is read-only while a run is active).
pub fn handle_key(
    job: &mut EditableJob,
    ed: &mut EditorState,
    code: KeyCode,
    run_state: RunState,
) -> Option<Notice> {
    clamp_selection(ed, job);
    let row_list = rows(job);
    let current = row_list.get(ed.selected).copied();

    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            ed.selected = ed.selected.saturating_sub(1);
            return None;
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if ed.selected + 1 < row_list.len() {
                ed.selected += 1;
            }
            return None;
        }
        _ => {}
    }

    if run_state == RunState::Running {
        return match code {
            KeyCode::Enter
            | KeyCode::Char('a')
            | KeyCode::Char('v')
            | KeyCode::Char('l')
            | KeyCode::Char('m')
            | KeyCode::Char('d') => Some(Notice::transient(
                "Job is read-only while a run is in progress",
            )),
            _ => None,
        };
    }

    match code {
        KeyCode::Enter => {
            if let Some(row) = current {
                ed.editing = Some(row_value(job, row).to_string());
            }
        }
        KeyCode::Char('a') => {
            // New variables land after the one under the cursor.
            let at = match current {
                Some(Row::VariableKey(i)) | Some(Row::VariableValue(i, _)) => i + 1,
                _ => job.variables.len(),
            };
            job.variables.insert(
                at,
                VariableEntry {
                    key: String::new(),
                    values: vec![String::new()],
                },
            );
            select(ed, job, Row::VariableKey(at));
        }
        KeyCode::Char('v') => match current {
            Some(Row::VariableKey(i)) => {
                job.variables[i].values.push(String::new());
                let j = job.variables[i].values.len() - 1;
                select(ed, job, Row::VariableValue(i, j));
            }
            Some(Row::VariableValue(i, j)) => {
                job.variables[i].values.insert(j + 1, String::new());
                select(ed, job, Row::VariableValue(i, j + 1));
            }
            _ => return Some(Notice::transient("Select a variable to add a value")),
        },
        KeyCode::Char('l') => {
            job.local_models.push(LocalModel::default());
            select(ed, job, Row::LocalPath(job.local_models.len() - 1));
        }
        KeyCode::Char('m') => {
            job.remote_models.push(RemoteModel::default());
            select(ed, job, Row::RemoteName(job.remote_models.len() - 1));
        }
        KeyCode::Char('d') => {
            match current {
                Some(Row::VariableKey(i)) => {
                    job.variables.remove(i);
                }
                Some(Row::VariableValue(i, j)) => {
                    job.variables[i].values.remove(j);
                }
                Some(Row::LocalPath(i))
                | Some(Row::LocalTemplate(i))
                | Some(Row::LocalArchitecture(i)) => {
                    job.local_models.remove(i);
                }
                Some(Row::RemoteName(i)) | Some(Row::RemoteUrl(i)) => {
                    job.remote_models.remove(i);
                }
                Some(Row::Prompt) | Some(Row::System) | None => {}
            }
            clamp_selection(ed, job);
        }
        _ => {}
    }
    None
}

/// Handle a key while a field is being edited.
pub fn handle_edit_key(job: &mut EditableJob, ed: &mut EditorState, code: KeyCode) {
    if ed.editing.is_none() {
        return;
    }
    match code {
        KeyCode::Enter => {
            let text = ed.editing.take().unwrap_or_default();
            if let Some(row) = rows(job).get(ed.selected).copied() {
                set_row_value(job, row, text);
            }
        }
        KeyCode::Esc => {
            ed.editing = None;
        }
        KeyCode::Backspace => {
            if let Some(buffer) = ed.editing.as_mut() {
                buffer.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(buffer) = ed.editing.as_mut() {
                buffer.push(c);
            }
        }
        _ => {}
    }
}

pub fn draw_editor(
    area: Rect,
    f: &mut Frame,
    job: &EditableJob,
    ed: &mut EditorState,
    run_state: RunState,
) {
    clamp_selection(ed, job);
    let row_list = rows(job);

    let viewport = area.height.saturating_sub(3) as usize;
    if ed.selected < ed.scroll {
        ed.scroll = ed.selected;
    } else if viewport > 0 && ed.selected >= ed.scroll + viewport {
        ed.scroll = ed.selected + 1 - viewport;
    }

    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::with_capacity(row_list.len() + 1);
    for (pos, row) in row_list.iter().enumerate().skip(ed.scroll) {
        let selected = pos == ed.selected;
        let value: String = if selected {
            match ed.editing.as_ref() {
                Some(buffer) => format!("{buffer}▏"),
                None => row_value(job, *row).to_string(),
            }
        } else {
            row_value(job, *row).to_string()
        };
        let value_style = if selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<18}", row_label(*row)), label_style),
            Span::styled(value, value_style),
        ]));
    }

    let hint = if run_state == RunState::Running {
        "running… job is read-only"
    } else {
        "enter edit · a variable · v value · l local · m remote · d delete · r run"
    };

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Editor")
            .title_bottom(Line::from(hint).right_aligned()),
    );
    f.render_widget(p, area);
}
