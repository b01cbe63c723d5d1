use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn keybind<'a>(keys: &[&'a str], pad: usize, action: &'a str) -> Line<'a> {
    let mut spans = vec![Span::raw("  ")];
    let mut width = 0;
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" / "));
            width += 3;
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Magenta)));
        width += key.chars().count();
    }
    spans.push(Span::raw(" ".repeat(pad.saturating_sub(width).max(1))));
    spans.push(Span::raw(action));
    Line::from(spans)
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        keybind(&["q", "Ctrl-C"], 12, "Quit"),
        keybind(&["u"], 12, "Update news (start a classifier run)"),
        keybind(&["tab"], 12, "Switch tabs"),
        keybind(&["?"], 12, "Show this help"),
        Line::from(""),
        Line::from("Filters:"),
        keybind(&["/"], 12, "Edit search (Enter or Esc to finish)"),
        keybind(&["g"], 12, "Cycle region"),
        keybind(&["s"], 12, "Cycle sentiment"),
        keybind(&["c"], 12, "Clear all filters"),
        Line::from(""),
        Line::from("News tab:"),
        keybind(&["↑/↓", "j/k"], 12, "Navigate"),
        keybind(&["y"], 12, "Copy article URL to clipboard"),
        keybind(&["e"], 12, "Export filtered articles as JSON"),
        keybind(&["x"], 12, "Export filtered articles as CSV"),
        Line::from(""),
        Line::from("The status line refreshes on its own while a classifier run is in progress;"),
        Line::from("new results are loaded automatically when the run finishes."),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
