use crate::model::{Article, FilterSelection, RunStatus, Sentiment, ALL_OPTION};
use crate::orchestrator::{RenderReason, UiCommand, UiUpdate};
use crate::view::RegionTally;

pub struct UiState {
    pub tab: usize,
    pub info: String,

    // Filter selection is owned by the UI and pushed to the controller on every edit.
    pub selection: FilterSelection,
    pub query_editing: bool,
    pub region_options: Vec<String>,

    // Last render from the controller
    pub has_snapshot: bool,
    pub articles: Vec<Article>,
    pub total_articles: usize,
    pub aggregate: Vec<RegionTally>,

    pub status: Option<RunStatus>,
    pub refresh_busy: bool,

    pub selected: usize, // Index into `articles`
    pub scroll_offset: usize,
    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            selection: FilterSelection::default(),
            query_editing: false,
            region_options: vec![ALL_OPTION.to_string()],
            has_snapshot: false,
            articles: Vec::new(),
            total_articles: 0,
            aggregate: Vec::new(),
            status: None,
            refresh_busy: false,
            selected: 0,
            scroll_offset: 0,
            last_exported_path: None,
        }
    }
}

impl UiState {
    /// Apply a controller update. Returns a command to send back when the update
    /// invalidated part of the local filter selection.
    pub fn apply_update(&mut self, update: UiUpdate) -> Option<UiCommand> {
        match update {
            UiUpdate::Snapshot(snapshot) => {
                let view = snapshot.view;
                let mut follow_up = None;
                if snapshot.reason == RenderReason::Loaded {
                    self.has_snapshot = true;
                    self.region_options = view.region_options;
                    // Reset the region filter if the region disappeared from the new snapshot
                    if let Some(region) = self.selection.region.as_deref() {
                        if !self.region_options.iter().any(|r| r == region) {
                            self.selection.region = None;
                            follow_up = Some(UiCommand::FilterChanged(self.selection.clone()));
                        }
                    }
                }
                self.articles = view.articles;
                self.total_articles = view.total_articles;
                self.aggregate = view.aggregate;
                self.clamp_selection();
                follow_up
            }
            UiUpdate::Status(status) => {
                // Errors and finished runs release the update control.
                self.refresh_busy = status.running && status.error.is_none();
                self.status = Some(status);
                None
            }
            UiUpdate::RefreshBusy(busy) => {
                self.refresh_busy = busy;
                None
            }
        }
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.articles.len() {
            self.selected = self.articles.len().saturating_sub(1);
        }
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
    }

    fn filter_changed(&mut self) -> UiCommand {
        self.selected = 0;
        self.scroll_offset = 0;
        UiCommand::FilterChanged(self.selection.clone())
    }

    pub fn push_query_char(&mut self, c: char) -> UiCommand {
        self.selection.query.push(c);
        self.filter_changed()
    }

    pub fn pop_query_char(&mut self) -> Option<UiCommand> {
        self.selection.query.pop()?;
        Some(self.filter_changed())
    }

    /// Advance to the next region option, wrapping back to "all".
    pub fn cycle_region(&mut self) -> UiCommand {
        let current = self.selection.region.as_deref().unwrap_or(ALL_OPTION);
        let idx = self
            .region_options
            .iter()
            .position(|r| r == current)
            .unwrap_or(0);
        let next = self
            .region_options
            .get((idx + 1) % self.region_options.len().max(1))
            .map(String::as_str)
            .unwrap_or(ALL_OPTION);
        self.selection.region = FilterSelection::region_from_option(next);
        self.filter_changed()
    }

    /// all → bearish → neutral → bullish → all
    pub fn cycle_sentiment(&mut self) -> UiCommand {
        self.selection.sentiment = match self.selection.sentiment {
            None => Some(Sentiment::Bearish),
            Some(Sentiment::Bearish) => Some(Sentiment::Neutral),
            Some(Sentiment::Neutral) => Some(Sentiment::Bullish),
            Some(Sentiment::Bullish) => None,
        };
        self.filter_changed()
    }

    pub fn clear_filters(&mut self) -> Option<UiCommand> {
        if self.selection.is_identity() {
            return None;
        }
        self.selection = FilterSelection::default();
        Some(self.filter_changed())
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.scroll_offset {
                self.scroll_offset = self.selected;
            }
        }
    }

    pub fn select_next(&mut self, visible_rows: usize) {
        if self.selected + 1 < self.articles.len() {
            self.selected += 1;
            let visible_rows = visible_rows.max(1);
            if self.selected >= self.scroll_offset + visible_rows {
                self.scroll_offset = self.selected + 1 - visible_rows;
            }
        }
    }

    pub fn selected_article(&self) -> Option<&Article> {
        self.articles.get(self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::SnapshotView;
    use crate::view::DerivedView;

    fn article(title: &str, region: &str) -> Article {
        Article {
            title: title.into(),
            summary: String::new(),
            why_it_matters: String::new(),
            source: String::new(),
            url: String::new(),
            date: String::new(),
            tags: Vec::new(),
            region: region.into(),
            sentiment: Sentiment::Neutral,
        }
    }

    fn loaded(regions: &[&str], articles: Vec<Article>) -> UiUpdate {
        let total_articles = articles.len();
        UiUpdate::Snapshot(Box::new(SnapshotView {
            reason: RenderReason::Loaded,
            view: DerivedView {
                articles,
                total_articles,
                aggregate: Vec::new(),
                region_options: std::iter::once(ALL_OPTION)
                    .chain(regions.iter().copied())
                    .map(String::from)
                    .collect(),
            },
        }))
    }

    #[test]
    fn loaded_snapshot_replaces_region_options() {
        let mut state = UiState::default();
        let cmd = state.apply_update(loaded(&["EU", "APAC"], vec![article("a", "EU")]));
        assert!(cmd.is_none());
        assert!(state.has_snapshot);
        assert_eq!(state.region_options, ["all", "EU", "APAC"]);
        assert_eq!(state.articles.len(), 1);
    }

    #[test]
    fn vanished_region_resets_filter_and_notifies_controller() {
        let mut state = UiState::default();
        state.selection.region = Some("LATAM".into());
        let cmd = state.apply_update(loaded(&["EU"], Vec::new()));
        assert!(state.selection.region.is_none());
        match cmd {
            Some(UiCommand::FilterChanged(sel)) => assert!(sel.region.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn filter_render_keeps_region_options() {
        let mut state = UiState::default();
        state.apply_update(loaded(&["EU", "APAC"], vec![article("a", "EU")]));
        state.apply_update(UiUpdate::Snapshot(Box::new(SnapshotView {
            reason: RenderReason::FilterChanged,
            view: DerivedView::default(),
        })));
        assert_eq!(state.region_options.len(), 3);
        assert!(state.articles.is_empty());
    }

    #[test]
    fn status_drives_busy_indicator() {
        let mut state = UiState::default();
        state.apply_update(UiUpdate::RefreshBusy(true));
        assert!(state.refresh_busy);

        state.apply_update(UiUpdate::Status(RunStatus {
            running: true,
            ..Default::default()
        }));
        assert!(state.refresh_busy);

        state.apply_update(UiUpdate::Status(RunStatus {
            running: true,
            error: Some("boom".into()),
            ..Default::default()
        }));
        assert!(!state.refresh_busy);

        state.apply_update(UiUpdate::RefreshBusy(true));
        state.apply_update(UiUpdate::Status(RunStatus::default()));
        assert!(!state.refresh_busy);
    }

    #[test]
    fn region_and_sentiment_cycle_wrap_to_all() {
        let mut state = UiState::default();
        state.apply_update(loaded(&["EU", "APAC"], Vec::new()));

        state.cycle_region();
        assert_eq!(state.selection.region.as_deref(), Some("EU"));
        state.cycle_region();
        assert_eq!(state.selection.region.as_deref(), Some("APAC"));
        state.cycle_region();
        assert!(state.selection.region.is_none());

        let seen: Vec<Option<Sentiment>> = (0..4)
            .map(|_| {
                state.cycle_sentiment();
                state.selection.sentiment
            })
            .collect();
        assert_eq!(
            seen,
            [
                Some(Sentiment::Bearish),
                Some(Sentiment::Neutral),
                Some(Sentiment::Bullish),
                None
            ]
        );
    }

    #[test]
    fn query_edits_emit_filter_commands() {
        let mut state = UiState::default();
        assert!(state.pop_query_char().is_none());
        match state.push_query_char('e') {
            UiCommand::FilterChanged(sel) => assert_eq!(sel.query, "e"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(state.pop_query_char().is_some());
        assert!(state.clear_filters().is_none());
    }

    #[test]
    fn selection_scrolls_and_clamps() {
        let mut state = UiState::default();
        let articles = (0..5).map(|i| article(&i.to_string(), "EU")).collect();
        state.apply_update(loaded(&["EU"], articles));
        for _ in 0..4 {
            state.select_next(2);
        }
        assert_eq!(state.selected, 4);
        assert_eq!(state.scroll_offset, 3);

        state.apply_update(loaded(&["EU"], vec![article("only", "EU")]));
        assert_eq!(state.selected, 0);
        assert_eq!(state.scroll_offset, 0);
        assert_eq!(state.selected_article().map(|a| a.title.as_str()), Some("only"));
    }
}
