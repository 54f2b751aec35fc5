use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw_help(area: Rect, f: &mut Frame) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Magenta));
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            key("q"),
            Span::raw(" / "),
            key("Ctrl-C"),
            Span::raw("  Quit (waits for an active run)"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("r"),
            Span::raw("           Run the job"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("tab"),
            Span::raw("         Switch tabs"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("?"),
            Span::raw("           Show this help"),
        ]),
        Line::from(""),
        Line::from("Editor tab:"),
        Line::from(vec![
            Span::raw("  "),
            key("↑/↓"),
            Span::raw(" or "),
            key("j/k"),
            Span::raw("  Select a field"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("enter"),
            Span::raw("       Edit the selected field (enter commits, esc cancels)"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("a"),
            Span::raw("           Add a variable"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("v"),
            Span::raw("           Add a value to the selected variable"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("l"),
            Span::raw("           Add a local model"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("m"),
            Span::raw("           Add a remote model"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("d"),
            Span::raw("           Delete the selected entry"),
        ]),
        Line::from(""),
        Line::from("Logs / Results tabs:"),
        Line::from(vec![
            Span::raw("  "),
            key("↑/↓"),
            Span::raw(" or "),
            key("j/k"),
            Span::raw("  Scroll"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("G"),
            Span::raw(" / "),
            key("g"),
            Span::raw("       Jump to tail / top"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
