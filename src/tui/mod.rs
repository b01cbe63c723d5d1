mod charts;
mod export;
mod help;
mod state;

use crate::api::HttpNewsApi;
use crate::cli::{build_config, initial_selection, Cli};
use crate::model::{Article, FilterSelection, ALL_OPTION};
use crate::orchestrator::{self, ChannelPresenter, UiCommand, UiUpdate};
use crate::view::{article_count_label, status_banner_text};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use export::ExportFormat;
use state::UiState;

const TAB_COUNT: usize = 3;

// Rows taken by everything on the News tab except the article list body:
// tabs, banner, filter bar, list borders and the info line.
const NEWS_CHROME_ROWS: u16 = 3 + 3 + 3 + 2 + 1;

fn list_rows(terminal_height: u16) -> usize {
    terminal_height.saturating_sub(NEWS_CHROME_ROWS).max(1) as usize
}

fn push_wrapped_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;
    let selection = initial_selection(&args);
    let api = Arc::new(HttpNewsApi::new(&cfg).context("build HTTP client")?);

    // Unbounded channels keep the controller from ever waiting on the renderer.
    let (update_tx, update_rx) = mpsc::unbounded_channel::<UiUpdate>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_selection = selection.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_selection, update_rx, cmd_tx));

    let res = orchestrator::run_controller(
        &cfg,
        api,
        ChannelPresenter::new(update_tx),
        selection,
        cmd_rx,
    )
    .await;

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
    selection: FilterSelection,
    mut update_rx: UnboundedReceiver<UiUpdate>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        selection,
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain updates without blocking to keep the UI responsive.
        let mut controller_gone = false;
        loop {
            match update_rx.try_recv() {
                Ok(update) => {
                    if let Some(cmd) = state.apply_update(update) {
                        let _ = cmd_tx.send(cmd);
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    controller_gone = true;
                    break;
                }
            }
        }
        if controller_gone {
            tracing::warn!("controller stopped, closing UI");
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let Ok(Event::Key(k)) = event::read() else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }

        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            let _ = cmd_tx.send(UiCommand::Quit);
            break Ok(());
        }

        if state.query_editing {
            match k.code {
                KeyCode::Enter | KeyCode::Esc => {
                    state.query_editing = false;
                    state.info.clear();
                }
                KeyCode::Backspace => {
                    if let Some(cmd) = state.pop_query_char() {
                        let _ = cmd_tx.send(cmd);
                    }
                }
                KeyCode::Char(c) => {
                    let _ = cmd_tx.send(state.push_query_char(c));
                }
                _ => {}
            }
            continue;
        }

        match (k.modifiers, k.code) {
            (_, KeyCode::Char('q')) => {
                let _ = cmd_tx.send(UiCommand::Quit);
                break Ok(());
            }
            (_, KeyCode::Char('u')) => {
                if state.refresh_busy {
                    state.info = "Update already in progress".into();
                } else {
                    let _ = cmd_tx.send(UiCommand::RefreshRequested);
                    state.info = "Update requested".into();
                }
            }
            (_, KeyCode::Char('/')) => {
                state.tab = 0;
                state.query_editing = true;
                state.info = "Type to search, Enter or Esc to finish".into();
            }
            (_, KeyCode::Char('g')) => {
                let _ = cmd_tx.send(state.cycle_region());
            }
            (_, KeyCode::Char('s')) => {
                let _ = cmd_tx.send(state.cycle_sentiment());
            }
            (_, KeyCode::Char('c')) => {
                if let Some(cmd) = state.clear_filters() {
                    let _ = cmd_tx.send(cmd);
                    state.info = "Filters cleared".into();
                }
            }
            (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                if state.tab == 0 {
                    state.select_prev();
                }
            }
            (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                if state.tab == 0 {
                    let rows = terminal
                        .size()
                        .map(|size| list_rows(size.height))
                        .unwrap_or(20);
                    state.select_next(rows);
                }
            }
            (_, KeyCode::Char('y')) => export::copy_selected_url(&mut state),
            (_, KeyCode::Char('e')) => export::export_and_show_path(&mut state, ExportFormat::Json),
            (_, KeyCode::Char('x')) => export::export_and_show_path(&mut state, ExportFormat::Csv),
            (_, KeyCode::Tab) => {
                state.tab = (state.tab + 1) % TAB_COUNT;
            }
            (_, KeyCode::BackTab) => {
                state.tab = (state.tab + TAB_COUNT - 1) % TAB_COUNT;
            }
            (_, KeyCode::Char('?')) => {
                state.tab = 2;
            }
            _ => {}
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("News"),
        Line::from("Regions"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("news-sentiment-cli"),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_news(chunks[1], f, state),
        1 => draw_regions(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_status_banner(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (text, color) = match state.status.as_ref() {
        None => ("Loading latest results…".to_string(), Color::Gray),
        Some(status) => {
            let color = if status.error.is_some() {
                Color::Red
            } else if status.running {
                Color::Yellow
            } else {
                Color::Green
            };
            (status_banner_text(status), color)
        }
    };
    let button = if state.refresh_busy {
        Span::styled(" Updating… ", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            " [u] Update news ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(19)].as_ref())
        .split(area);
    f.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(color)))
            .block(Block::default().borders(Borders::ALL).title("Status")),
        cols[0],
    );
    f.render_widget(
        Paragraph::new(button).block(Block::default().borders(Borders::ALL)),
        cols[1],
    );
}

fn draw_filter_bar(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let label = Style::default().fg(Color::Gray);
    let value = Style::default().fg(Color::White);
    let query_style = if state.query_editing {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED)
    } else {
        value
    };
    let mut query = state.selection.query.clone();
    if state.query_editing {
        query.push('▏');
    }
    let line = Line::from(vec![
        Span::styled("Search: ", label),
        Span::styled(query, query_style),
        Span::raw("   "),
        Span::styled("Region: ", label),
        Span::styled(
            state.selection.region.clone().unwrap_or_else(|| ALL_OPTION.into()),
            value,
        ),
        Span::raw("   "),
        Span::styled("Sentiment: ", label),
        match state.selection.sentiment {
            Some(s) => Span::styled(s.label(), Style::default().fg(charts::sentiment_color(s))),
            None => Span::styled(ALL_OPTION, value),
        },
    ]);
    f.render_widget(
        Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Filters (/ search, g region, s sentiment, c clear)"),
        ),
        area,
    );
}

fn draw_news(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    draw_status_banner(rows[0], f, state);
    draw_filter_bar(rows[1], f, state);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(rows[2]);
    draw_article_list(cols[0], f, state);
    draw_article_detail(cols[1], f, state.selected_article());

    f.render_widget(
        Paragraph::new(state.info.as_str()).style(Style::default().fg(Color::Gray)),
        rows[3],
    );
}

fn draw_article_list(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut title = format!("Articles {}", article_count_label(state.articles.len()));
    if !state.selection.is_identity() {
        title.push_str(&format!(" of {}", state.total_articles));
    }
    let block = Block::default().borders(Borders::ALL).title(title);

    if state.articles.is_empty() {
        let msg = if state.has_snapshot {
            "No articles match the current filters."
        } else {
            "No articles loaded yet."
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::Gray))
                .block(block),
            area,
        );
        return;
    }

    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .articles
        .iter()
        .enumerate()
        .skip(state.scroll_offset)
        .take(visible)
        .map(|(i, a)| {
            let mut style = Style::default();
            if i == state.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let title = if a.title.is_empty() {
                "Untitled"
            } else {
                a.title.as_str()
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<8}", a.sentiment.label()),
                    style.fg(charts::sentiment_color(a.sentiment)),
                ),
                Span::styled(format!("{:<10.10} ", a.region), style.fg(Color::Gray)),
                Span::styled(title.to_string(), style),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_article_detail(area: Rect, f: &mut ratatui::Frame, article: Option<&Article>) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let Some(a) = article else {
        f.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let mut lines: Vec<Line<'static>> = vec![
        Line::from(Span::styled(
            if a.title.is_empty() {
                "Untitled".to_string()
            } else {
                a.title.clone()
            },
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                a.sentiment.label(),
                Style::default().fg(charts::sentiment_color(a.sentiment)),
            ),
            Span::raw(" · "),
            Span::raw(a.region.clone()),
        ]),
        Line::from(""),
    ];
    push_wrapped_kv(&mut lines, "Source", &a.source, area.width);
    push_wrapped_kv(&mut lines, "Date", &a.date, area.width);
    push_wrapped_kv(&mut lines, "Tags", &a.tags.join(", "), area.width);
    push_wrapped_kv(&mut lines, "URL", &a.url, area.width);
    if !a.summary.trim().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Summary",
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(a.summary.clone()));
    }
    if !a.why_it_matters.trim().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Why it matters",
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(a.why_it_matters.clone()));
    }

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn draw_regions(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)].as_ref())
        .split(area);
    draw_status_banner(rows[0], f, state);
    charts::draw_region_chart(rows[1], f, &state.aggregate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_rows_leave_room_for_chrome() {
        assert_eq!(list_rows(40), 28);
        assert_eq!(list_rows(5), 1);
    }

    #[test]
    fn wrapped_kv_splits_long_values() {
        let mut out = Vec::new();
        push_wrapped_kv(&mut out, "URL", "abcdefghijklmnopqrstuvwxy", 20);
        // 16 usable columns: 11 chars after the label, then 14 per continuation line
        assert_eq!(out.len(), 2);
        push_wrapped_kv(&mut out, "Tags", "   ", 20);
        assert_eq!(out.len(), 2);
    }
}
