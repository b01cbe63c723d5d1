use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Export the currently filtered articles into the working directory.
/// Returns the absolute path of the exported file.
pub fn export_filtered(state: &UiState, format: ExportFormat) -> Result<PathBuf> {
    let path = crate::export::default_export_path(format.extension())?;
    match format {
        ExportFormat::Json => crate::export::export_json(&path, &state.articles)?,
        ExportFormat::Csv => crate::export::export_csv(&path, &state.articles)?,
    }
    Ok(path)
}

/// Export and report the outcome in the info line.
pub fn export_and_show_path(state: &mut UiState, format: ExportFormat) {
    match export_filtered(state, format) {
        Ok(path) => {
            tracing::info!(path = %path.display(), count = state.articles.len(), "exported articles");
            state.info = format!(
                "Exported {} articles: {}",
                state.articles.len(),
                path.display()
            );
            state.last_exported_path = Some(path.display().to_string());
        }
        Err(e) => {
            tracing::warn!(error = %e, "export failed");
            state.info = format!("Export failed: {e:#}");
        }
    }
}

/// Initialize the clipboard manager thread if not already initialized.
/// Clipboard operations run one at a time, each instance kept alive long enough
/// for clipboard managers on Linux to read it.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

/// Copy the selected article's URL, falling back to the last export path.
pub fn copy_selected_url(state: &mut UiState) {
    let text = match state.selected_article() {
        Some(a) if !a.url.is_empty() => a.url.clone(),
        _ => match state.last_exported_path.clone() {
            Some(p) => p,
            None => {
                state.info = "Nothing to copy".into();
                return;
            }
        },
    };
    state.info = match copy_to_clipboard(&text) {
        Ok(()) => format!("Copied: {text}"),
        Err(e) => format!("Clipboard error: {e:#}"),
    };
}
