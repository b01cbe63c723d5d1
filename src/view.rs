//! Derived views over a snapshot.
//!
//! Everything here is pure: a snapshot plus a filter selection in, a projection out.
//! Nothing is cached; callers recompute on every render.

use crate::model::{Article, FilterSelection, RawArticle, RunStatus, Sentiment, Snapshot, ALL_OPTION};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Map any raw label to a sentiment. Unknown or empty labels become neutral.
pub fn normalize_sentiment(raw: &str) -> Sentiment {
    match raw.trim().to_lowercase().as_str() {
        "bearish" => Sentiment::Bearish,
        "bullish" => Sentiment::Bullish,
        _ => Sentiment::Neutral,
    }
}

/// Primary field first, then the secondary one; empty strings count as absent.
fn first_present<'a>(primary: Option<&'a str>, secondary: Option<&'a str>) -> Option<&'a str> {
    primary
        .filter(|s| !s.is_empty())
        .or_else(|| secondary.filter(|s| !s.is_empty()))
}

fn raw_sentiment(a: &RawArticle) -> Sentiment {
    first_present(a.nbim_sentiment.as_deref(), a.sentiment.as_deref())
        .map(normalize_sentiment)
        .unwrap_or(Sentiment::Neutral)
}

fn to_article(region: &str, a: &RawArticle) -> Article {
    Article {
        title: a.title.clone().unwrap_or_default(),
        summary: a.summary.clone().unwrap_or_default(),
        why_it_matters: first_present(
            a.why_it_matters.as_deref(),
            a.why_it_matters_snake.as_deref(),
        )
        .unwrap_or_default()
        .to_string(),
        source: a.source.clone().unwrap_or_default(),
        url: a.url.clone().unwrap_or_default(),
        date: a.date.clone().unwrap_or_default(),
        tags: a.tags.clone().unwrap_or_default(),
        region: region.to_string(),
        sentiment: raw_sentiment(a),
    }
}

/// Regions in key order, articles in backend order.
pub fn flatten(snapshot: &Snapshot) -> Vec<Article> {
    snapshot
        .regions
        .iter()
        .flat_map(|group| group.articles.iter().map(|a| to_article(&group.name, a)))
        .collect()
}

fn haystack(a: &Article) -> String {
    let tags = a.tags.join(" ");
    [
        a.title.as_str(),
        a.summary.as_str(),
        a.why_it_matters.as_str(),
        a.source.as_str(),
        tags.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}

pub fn matches(a: &Article, selection: &FilterSelection) -> bool {
    if !selection.query.is_empty() && !haystack(a).contains(&selection.query.to_lowercase()) {
        return false;
    }
    if let Some(region) = selection.region.as_deref() {
        if a.region != region {
            return false;
        }
    }
    if let Some(sentiment) = selection.sentiment {
        if a.sentiment != sentiment {
            return false;
        }
    }
    true
}

pub fn apply_filters(flat: &[Article], selection: &FilterSelection) -> Vec<Article> {
    flat.iter()
        .filter(|a| matches(a, selection))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionTally {
    pub region: String,
    pub bearish: u64,
    pub neutral: u64,
    pub bullish: u64,
}

impl RegionTally {
    pub fn get(&self, s: Sentiment) -> u64 {
        match s {
            Sentiment::Bearish => self.bearish,
            Sentiment::Neutral => self.neutral,
            Sentiment::Bullish => self.bullish,
        }
    }

    pub fn total(&self) -> u64 {
        self.bearish + self.neutral + self.bullish
    }
}

pub fn aggregate_by_region_sentiment(snapshot: &Snapshot) -> Vec<RegionTally> {
    snapshot
        .regions
        .iter()
        .map(|group| {
            let mut tally = RegionTally {
                region: group.name.clone(),
                ..Default::default()
            };
            for a in &group.articles {
                match raw_sentiment(a) {
                    Sentiment::Bearish => tally.bearish += 1,
                    Sentiment::Neutral => tally.neutral += 1,
                    Sentiment::Bullish => tally.bullish += 1,
                }
            }
            tally
        })
        .collect()
}

/// `"all"` followed by the snapshot's region keys.
pub fn region_options(snapshot: &Snapshot) -> Vec<String> {
    std::iter::once(ALL_OPTION.to_string())
        .chain(snapshot.regions.iter().map(|g| g.name.clone()))
        .collect()
}

pub fn article_count_label(n: usize) -> String {
    format!("({n} articles)")
}

/// Render a backend timestamp in local time; unparseable values are shown verbatim.
pub fn format_last_updated(raw: &str) -> String {
    const DISPLAY: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    const NAIVE: &[time::format_description::BorrowedFormatItem<'static>] = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );

    let local = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let parsed = OffsetDateTime::parse(raw, &Rfc3339)
        .map(|t| t.to_offset(local))
        // Naive timestamps are the backend's local time; show them as-is.
        .or_else(|_| PrimitiveDateTime::parse(raw, NAIVE).map(|t| t.assume_offset(local)));

    match parsed {
        Ok(t) => t.format(DISPLAY).unwrap_or_else(|_| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}

/// Banner line describing the run status, matching the web client's wording.
pub fn status_banner_text(status: &RunStatus) -> String {
    if let Some(err) = status.error.as_deref() {
        return format!("Error: {err}");
    }
    if status.running {
        let mut text = "Refreshing in the background – showing cached results…".to_string();
        if status.progress.total > 0 {
            text.push_str(&format!(
                " ({}/{})",
                status.progress.processed, status.progress.total
            ));
        }
        return text;
    }
    match status.last_updated.as_deref() {
        Some(ts) => format!("Latest classifier run: {}", format_last_updated(ts)),
        None => "No cached data found yet.".to_string(),
    }
}

/// Everything a renderer needs for one frame of the article view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    pub articles: Vec<Article>,
    pub total_articles: usize,
    pub aggregate: Vec<RegionTally>,
    pub region_options: Vec<String>,
}

pub fn derive_view(snapshot: &Snapshot, selection: &FilterSelection) -> DerivedView {
    let flat = flatten(snapshot);
    let total_articles = flat.len();
    DerivedView {
        articles: apply_filters(&flat, selection),
        total_articles,
        aggregate: aggregate_by_region_sentiment(snapshot),
        region_options: region_options(snapshot),
    }
}
