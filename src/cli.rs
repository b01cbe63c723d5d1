use crate::api::{HttpNewsApi, NewsApi};
use crate::model::{FilterSelection, PollOverlap, Sentiment, SyncConfig, ALL_OPTION};
use crate::view::derive_view;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// One line of one-shot output: the view on stdout, export notices on stderr.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Drain `rx` into the two sinks until every sender is dropped.
fn write_output_lines(
    mut rx: mpsc::UnboundedReceiver<OutputLine>,
    out: &mut impl Write,
    err: &mut impl Write,
) {
    while let Some(line) = rx.blocking_recv() {
        let _ = match line {
            OutputLine::Stdout(msg) => writeln!(out, "{msg}"),
            OutputLine::Stderr(msg) => writeln!(err, "{msg}"),
        };
    }
    let _ = out.flush();
    let _ = err.flush();
}

/// Terminal writes happen on a blocking thread so the runtime never stalls on a slow pipe.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let mut out = std::io::LineWriter::new(std::io::stdout().lock());
        let mut err = std::io::LineWriter::new(std::io::stderr().lock());
        write_output_lines(rx, &mut out, &mut err);
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SentimentArg {
    All,
    Bearish,
    Neutral,
    Bullish,
}

impl SentimentArg {
    fn as_filter(self) -> Option<Sentiment> {
        match self {
            SentimentArg::All => None,
            SentimentArg::Bearish => Some(Sentiment::Bearish),
            SentimentArg::Neutral => Some(Sentiment::Neutral),
            SentimentArg::Bullish => Some(Sentiment::Bullish),
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "news-sentiment-cli",
    version,
    about = "Classified regulatory news with background refresh, in the terminal"
)]
pub struct Cli {
    /// Base URL of the news backend
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Print the filtered view as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Interval between status polls
    #[arg(long, default_value = "4s")]
    pub poll_interval: humantime::Duration,

    /// Timeout applied to every backend request
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// What a poll tick does while the previous poll is still unresolved
    #[arg(long, value_enum, default_value_t = PollOverlap::Allow)]
    pub poll_overlap: PollOverlap,

    /// Stop polling after this many consecutive failures (default: never stop)
    #[arg(long)]
    pub max_poll_failures: Option<u32>,

    /// Use --refresh-on-launch true or --refresh-on-launch false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub refresh_on_launch: bool,

    /// Initial search text
    #[arg(long, default_value = "")]
    pub query: String,

    /// Initial region filter
    #[arg(long, default_value = ALL_OPTION)]
    pub region: String,

    /// Initial sentiment filter
    #[arg(long, value_enum, default_value_t = SentimentArg::All)]
    pub sentiment: SentimentArg,

    /// Export the filtered articles as JSON (text/json modes)
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Export the filtered articles as CSV (text/json modes)
    #[arg(long)]
    pub export_csv: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text && cfg!(feature = "tui")
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text cannot be combined"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args, false).await;
        }
    }

    let json = args.json;
    run_once(args, json).await
}

/// Build a `SyncConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<SyncConfig> {
    let poll_interval = Duration::from(args.poll_interval);
    if poll_interval.is_zero() {
        return Err(anyhow::anyhow!("--poll-interval must be greater than zero"));
    }
    if args.max_poll_failures == Some(0) {
        return Err(anyhow::anyhow!("--max-poll-failures must be at least 1"));
    }
    Ok(SyncConfig {
        base_url: args.base_url.clone(),
        poll_interval,
        request_timeout: Duration::from(args.request_timeout),
        poll_overlap: args.poll_overlap,
        max_poll_failures: args.max_poll_failures,
        refresh_on_launch: args.refresh_on_launch,
        user_agent: format!("news-sentiment-cli/{}", env!("CARGO_PKG_VERSION")),
    })
}

pub fn initial_selection(args: &Cli) -> FilterSelection {
    FilterSelection {
        query: args.query.clone(),
        region: FilterSelection::region_from_option(&args.region),
        sentiment: args.sentiment.as_filter(),
    }
}

/// Load once, derive the filtered view, print it and exit.
async fn run_once(args: Cli, json: bool) -> Result<()> {
    let cfg = build_config(&args)?;
    let api = HttpNewsApi::new(&cfg).context("build HTTP client")?;
    let selection = initial_selection(&args);
    tracing::debug!(config = %serde_json::to_string(&cfg).unwrap_or_default(), "one-shot load");

    let payload = api.fetch_news().await.context("failed to load news")?;
    let (snapshot, status) = payload.into_parts();
    let view = derive_view(&snapshot, &selection);
    tracing::info!(
        total = view.total_articles,
        shown = view.articles.len(),
        "loaded snapshot"
    );

    let (out_tx, out_handle) = spawn_output_writer();
    for msg in handle_exports(&args, &view.articles)? {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }

    if json {
        let out = serde_json::to_string_pretty(&view)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(&view, &status, &selection);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Handle export operations (JSON and CSV) for both text and JSON modes.
fn handle_exports(args: &Cli, articles: &[crate::model::Article]) -> Result<Vec<String>> {
    let mut messages = Vec::new();
    if let Some(p) = args.export_json.as_deref() {
        crate::export::export_json(p, articles)?;
        messages.push(format!("Exported JSON: {}", p.display()));
    }
    if let Some(p) = args.export_csv.as_deref() {
        crate::export::export_csv(p, articles)?;
        messages.push(format!("Exported CSV: {}", p.display()));
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_web_client() {
        let args = Cli::parse_from(["news-sentiment-cli"]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(4));
        assert_eq!(cfg.poll_overlap, PollOverlap::Allow);
        assert!(cfg.max_poll_failures.is_none());
        assert!(cfg.refresh_on_launch);
        assert_eq!(initial_selection(&args), FilterSelection::default());
    }

    #[test]
    fn flags_map_to_config_and_selection() {
        let args = Cli::parse_from([
            "news-sentiment-cli",
            "--poll-interval",
            "1500ms",
            "--poll-overlap",
            "skip",
            "--max-poll-failures",
            "3",
            "--refresh-on-launch",
            "false",
            "--region",
            "Europe",
            "--sentiment",
            "bearish",
            "--query",
            "ESG",
        ]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(1500));
        assert_eq!(cfg.poll_overlap, PollOverlap::Skip);
        assert_eq!(cfg.max_poll_failures, Some(3));
        assert!(!cfg.refresh_on_launch);

        let sel = initial_selection(&args);
        assert_eq!(sel.region.as_deref(), Some("Europe"));
        assert_eq!(sel.sentiment, Some(Sentiment::Bearish));
        assert_eq!(sel.query, "ESG");
    }

    #[test]
    fn output_lines_routed_to_their_sink_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(OutputLine::Stdout("view".into())).unwrap();
        tx.send(OutputLine::Stderr("Exported JSON: a.json".into())).unwrap();
        tx.send(OutputLine::Stdout("more".into())).unwrap();
        drop(tx);

        let (mut out, mut err) = (Vec::new(), Vec::new());
        write_output_lines(rx, &mut out, &mut err);
        assert_eq!(String::from_utf8(out).unwrap(), "view\nmore\n");
        assert_eq!(String::from_utf8(err).unwrap(), "Exported JSON: a.json\n");
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let args = Cli::parse_from(["news-sentiment-cli", "--poll-interval", "0s"]);
        assert!(build_config(&args).is_err());
    }
}
