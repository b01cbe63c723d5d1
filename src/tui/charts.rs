use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use crate::model::Sentiment;
use crate::view::RegionTally;

const GROUP_GAP: u16 = 2;

pub fn sentiment_color(s: Sentiment) -> Color {
    match s {
        Sentiment::Bearish => Color::Red,
        Sentiment::Neutral => Color::Gray,
        Sentiment::Bullish => Color::Blue,
    }
}

/// Width of each bar so that every region group fits in `inner_width` columns.
fn bar_width_for(inner_width: u16, groups: usize) -> u16 {
    if groups == 0 {
        return 1;
    }
    let bars = (groups * Sentiment::ALL.len()) as u16;
    let gaps = GROUP_GAP.saturating_mul(groups.saturating_sub(1) as u16);
    (inner_width.saturating_sub(gaps) / bars.max(1)).clamp(1, 5)
}

/// Grouped bar chart: one group per region, one bar per sentiment.
pub fn draw_region_chart(area: Rect, f: &mut Frame, aggregate: &[RegionTally]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(5)].as_ref())
        .split(area);

    let mut legend = vec![Span::raw(" ")];
    for s in Sentiment::ALL {
        legend.push(Span::styled("■ ", Style::default().fg(sentiment_color(s))));
        legend.push(Span::raw(format!("{}   ", s.label())));
    }
    f.render_widget(Paragraph::new(Line::from(legend)), chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Sentiment by region");

    if aggregate.is_empty() {
        f.render_widget(
            Paragraph::new("No classified articles yet.")
                .style(Style::default().fg(Color::Gray))
                .block(block),
            chunks[1],
        );
        return;
    }

    let max = aggregate
        .iter()
        .flat_map(|t| Sentiment::ALL.map(|s| t.get(s)))
        .max()
        .unwrap_or(0)
        .max(1);
    let bar_width = bar_width_for(chunks[1].width.saturating_sub(2), aggregate.len());

    let chart = aggregate.iter().fold(
        BarChart::default()
            .block(block)
            .bar_width(bar_width)
            .bar_gap(0)
            .group_gap(GROUP_GAP)
            .max(max),
        |chart, tally| {
            let bars: Vec<Bar> = Sentiment::ALL
                .iter()
                .map(|&s| {
                    Bar::default()
                        .value(tally.get(s))
                        .style(Style::default().fg(sentiment_color(s)))
                        .value_style(
                            Style::default()
                                .fg(Color::Black)
                                .bg(sentiment_color(s))
                                .add_modifier(Modifier::BOLD),
                        )
                })
                .collect();
            chart.data(
                BarGroup::default()
                    .label(Line::from(format!("{} ({})", tally.region, tally.total())))
                    .bars(&bars),
            )
        },
    );

    f.render_widget(chart, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_width_shrinks_with_region_count() {
        assert_eq!(bar_width_for(80, 0), 1);
        assert_eq!(bar_width_for(80, 1), 5);
        // 4 regions: 12 bars and 6 columns of gaps in 40 columns
        assert_eq!(bar_width_for(40, 4), 2);
        assert_eq!(bar_width_for(10, 20), 1);
    }
}
