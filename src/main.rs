mod api;
mod cli;
mod export;
mod logging;
mod model;
mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
mod view;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let target = if args.is_interactive() {
        logging::LogTarget::File
    } else {
        logging::LogTarget::Stderr
    };
    match logging::init(target) {
        Ok(Some(path)) => tracing::info!("logging to {}", path.display()),
        Ok(None) => {}
        // Logging is best-effort; the client works without it.
        Err(e) => eprintln!("warning: logging disabled: {e}"),
    }

    cli::run(args).await
}
