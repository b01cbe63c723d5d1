//! Text summary builder for CLI output.
//!
//! Formats a derived view and its run status as human-readable lines for text mode.

use crate::model::{FilterSelection, RunStatus, Sentiment};
use crate::view::{article_count_label, status_banner_text, DerivedView};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn describe_filters(selection: &FilterSelection) -> Option<String> {
    if selection.is_identity() {
        return None;
    }
    let mut parts = Vec::new();
    if !selection.query.is_empty() {
        parts.push(format!("query \"{}\"", selection.query));
    }
    if let Some(region) = selection.region.as_deref() {
        parts.push(format!("region {region}"));
    }
    if let Some(sentiment) = selection.sentiment {
        parts.push(format!("sentiment {sentiment}"));
    }
    Some(parts.join(", "))
}

pub(crate) fn build_text_summary(
    view: &DerivedView,
    status: &RunStatus,
    selection: &FilterSelection,
) -> TextSummary {
    let mut lines = vec![status_banner_text(status)];

    lines.push(String::new());
    lines.push("Sentiment by region (bearish / neutral / bullish):".to_string());
    let width = view
        .aggregate
        .iter()
        .map(|t| t.region.chars().count())
        .max()
        .unwrap_or(0);
    for tally in &view.aggregate {
        lines.push(format!(
            "  {:<width$}  {:>3} / {:>3} / {:>3}",
            tally.region,
            tally.get(Sentiment::Bearish),
            tally.get(Sentiment::Neutral),
            tally.get(Sentiment::Bullish),
        ));
    }

    lines.push(String::new());
    let mut heading = format!("Articles {}", article_count_label(view.articles.len()));
    if let Some(filters) = describe_filters(selection) {
        heading.push_str(&format!(" of {} matching {filters}", view.total_articles));
    }
    lines.push(heading);

    if view.articles.is_empty() {
        lines.push("  No articles match the current filters.".to_string());
    }
    for a in &view.articles {
        lines.push(format!(
            "  [{}] {} | {} | {}",
            a.sentiment,
            a.region,
            if a.title.is_empty() { "Untitled" } else { a.title.as_str() },
            a.date
        ));
        if !a.source.is_empty() {
            lines.push(format!("      Source: {}", a.source));
        }
        if !a.url.is_empty() {
            lines.push(format!("      {}", a.url));
        }
    }

    TextSummary { lines }
}
