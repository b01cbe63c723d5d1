//! JSON and CSV export of a filtered article list.

use crate::model::Article;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn export_json(path: &Path, articles: &[Article]) -> Result<()> {
    let json = serde_json::to_string_pretty(articles)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn export_csv(path: &Path, articles: &[Article]) -> Result<()> {
    std::fs::write(path, to_csv(articles)).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// `news-<stamp>.<ext>` in the current directory, returned as an absolute path.
pub fn default_export_path(ext: &str) -> Result<PathBuf> {
    let stamp = time::OffsetDateTime::now_utc()
        .format(time::macros::format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "now".into());
    let current_dir = std::env::current_dir().context("get current directory")?;
    Ok(current_dir.join(format!("news-{stamp}.{ext}")))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn to_csv(articles: &[Article]) -> String {
    let mut out =
        String::from("region,sentiment,date,title,source,url,tags,summary,why_it_matters\n");
    for a in articles {
        let tags = a.tags.join(";");
        let row = [
            a.region.as_str(),
            a.sentiment.label(),
            a.date.as_str(),
            a.title.as_str(),
            a.source.as_str(),
            a.url.as_str(),
            tags.as_str(),
            a.summary.as_str(),
            a.why_it_matters.as_str(),
        ]
        .map(csv_field)
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}
