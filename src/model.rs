use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Effective client settings. Serialized once into the startup log line.
#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub poll_overlap: PollOverlap,
    /// `None` keeps polling forever.
    pub max_poll_failures: Option<u32>,
    pub refresh_on_launch: bool,
    pub user_agent: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            poll_interval: Duration::from_secs(4),
            request_timeout: Duration::from_secs(10),
            poll_overlap: PollOverlap::Allow,
            max_poll_failures: None,
            refresh_on_launch: true,
            user_agent: format!("news-sentiment-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// What a poll tick does while an earlier status request is still unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PollOverlap {
    /// Issue the request anyway; each completion applies the same idempotent rule.
    Allow,
    /// Drop the tick.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bearish,
    Neutral,
    Bullish,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Bearish, Sentiment::Neutral, Sentiment::Bullish];

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
            Sentiment::Bullish => "bullish",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Article exactly as the backend stores it under a region key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, rename = "whyItMatters")]
    pub why_it_matters: Option<String>,
    /// Older snake_case spelling, read when `whyItMatters` is absent or empty.
    #[serde(default, rename = "why_it_matters")]
    pub why_it_matters_snake: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, rename = "nbimSentiment")]
    pub nbim_sentiment: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
}

/// Flattened article carrying its region and normalized sentiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub why_it_matters: String,
    pub source: String,
    pub url: String,
    pub date: String,
    pub tags: Vec<String>,
    pub region: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionGroup {
    pub name: String,
    pub articles: Vec<RawArticle>,
}

/// Region name to articles, in the order the backend sent the keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub regions: Vec<RegionGroup>,
}

impl Snapshot {
    pub fn article_count(&self) -> usize {
        self.regions.iter().map(|r| r.articles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of region name to article list")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Snapshot, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut regions = Vec::new();
                while let Some((name, articles)) =
                    map.next_entry::<String, Option<Vec<RawArticle>>>()?
                {
                    regions.push(RegionGroup {
                        name,
                        articles: articles.unwrap_or_default(),
                    });
                }
                Ok(Snapshot { regions })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub total: u64,
}

impl Progress {
    /// Enforce `processed <= total`.
    pub fn clamped(self) -> Self {
        Self {
            processed: self.processed.min(self.total),
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatus {
    pub running: bool,
    pub last_updated: Option<String>,
    pub error: Option<String>,
    pub progress: Progress,
}

/// Body of `GET /api/news`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPayload {
    #[serde(default)]
    pub data: Option<Snapshot>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub error: Option<String>,
}

impl NewsPayload {
    pub fn into_parts(self) -> (Snapshot, RunStatus) {
        let status = RunStatus {
            running: self.running,
            last_updated: self.last_updated,
            error: self.error,
            progress: self.progress.unwrap_or_default().clamped(),
        };
        (self.data.unwrap_or_default(), status)
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
}

pub const ALL_OPTION: &str = "all";

/// Search/region/sentiment selection. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub query: String,
    pub region: Option<String>,
    pub sentiment: Option<Sentiment>,
}

impl FilterSelection {
    pub fn is_identity(&self) -> bool {
        self.query.is_empty() && self.region.is_none() && self.sentiment.is_none()
    }

    /// Parse a selector value where `"all"` means no constraint.
    pub fn region_from_option(value: &str) -> Option<String> {
        if value == ALL_OPTION {
            None
        } else {
            Some(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_backend_key_order() {
        let json = r#"{"Oceania": [], "Asia": [{"title": "a"}], "Europe": [{"title": "b"}, {"title": "c"}]}"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = snap.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Oceania", "Asia", "Europe"]);
        assert_eq!(snap.article_count(), 3);
        assert_eq!(snap.regions[2].articles[1].title.as_deref(), Some("c"));
    }

    #[test]
    fn snapshot_null_region_is_empty() {
        let snap: Snapshot = serde_json::from_str(r#"{"EU": null}"#).unwrap();
        assert_eq!(snap.regions.len(), 1);
        assert!(snap.regions[0].articles.is_empty());
    }

    #[test]
    fn news_payload_with_null_data_and_missing_progress() {
        let json = r#"{"data": null, "running": true, "lastUpdated": null, "error": null}"#;
        let payload: NewsPayload = serde_json::from_str(json).unwrap();
        let (snap, status) = payload.into_parts();
        assert!(snap.is_empty());
        assert!(status.running);
        assert_eq!(status.progress, Progress::default());
    }

    #[test]
    fn news_payload_clamps_progress() {
        let json = r#"{"data": {}, "running": true, "lastUpdated": "2025-03-01T10:00:00",
            "progress": {"processed": 12, "total": 10}, "error": null}"#;
        let (_, status) = serde_json::from_str::<NewsPayload>(json)
            .unwrap()
            .into_parts();
        assert_eq!(status.progress, Progress { processed: 10, total: 10 });
        assert_eq!(status.last_updated.as_deref(), Some("2025-03-01T10:00:00"));
    }

    #[test]
    fn raw_article_reads_snake_case_why_it_matters() {
        let json = r#"{"title": "t", "why_it_matters": "because", "tags": ["esg"]}"#;
        let a: RawArticle = serde_json::from_str(json).unwrap();
        assert!(a.why_it_matters.is_none());
        assert_eq!(a.why_it_matters_snake.as_deref(), Some("because"));
        assert_eq!(a.tags, Some(vec!["esg".to_string()]));
    }

    #[test]
    fn article_with_both_why_it_matters_spellings_still_decodes() {
        let json = r#"{"data":{"EU":[{"title":"a","whyItMatters":"","why_it_matters":"because"}]},
            "running":false,"lastUpdated":"T1"}"#;
        let (snapshot, _) = serde_json::from_str::<NewsPayload>(json)
            .unwrap()
            .into_parts();
        let a = &snapshot.regions[0].articles[0];
        assert_eq!(a.why_it_matters.as_deref(), Some(""));
        assert_eq!(a.why_it_matters_snake.as_deref(), Some("because"));
    }

    #[test]
    fn status_payload_ignores_unknown_fields() {
        let json = r#"{"running": false, "lastUpdated": "T2", "error": null, "extra": 1}"#;
        let s: StatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(s.last_updated.as_deref(), Some("T2"));
        assert!(s.progress.is_none());
    }

    #[test]
    fn config_serializes_durations_in_humantime_form() {
        let json = serde_json::to_value(SyncConfig::default()).unwrap();
        assert_eq!(json["poll_interval"], "4s");
        assert_eq!(json["request_timeout"], "10s");
        assert_eq!(json["poll_overlap"], "allow");
        assert!(json["max_poll_failures"].is_null());
    }
}
