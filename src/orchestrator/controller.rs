//! Sync controller.
//!
//! Sole owner of the client state. UI commands, poll ticks and request completions
//! are turned into `SyncEvent`s and applied one at a time, so two completions can
//! never mutate the store concurrently even when their requests overlap.

use super::presenter::{Presenter, RenderReason, SnapshotView};
use super::store::ClientStore;
use crate::api::{ApiError, NewsApi};
use crate::model::{FilterSelection, NewsPayload, PollOverlap, RunStatus, StatusPayload, SyncConfig};
use crate::view::derive_view;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Commands emitted by presentation layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    FilterChanged(FilterSelection),
    RefreshRequested,
    Quit,
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub(crate) enum SyncEvent {
    FilterChanged(FilterSelection),
    RefreshRequested,
    PollTick,
    LoadCompleted { seq: u64, payload: NewsPayload },
    LoadFailed { seq: u64, error: ApiError },
    RefreshAccepted,
    RefreshFailed(ApiError),
    StatusReceived(StatusPayload),
    PollFailed(ApiError),
}

pub(crate) struct SyncController<A, P> {
    api: Arc<A>,
    presenter: P,
    store: ClientStore,
    selection: FilterSelection,
    overlap: PollOverlap,
    max_poll_failures: Option<u32>,
    completion_tx: UnboundedSender<SyncEvent>,
    issued_loads: u64,
    applied_load: u64,
    loads_in_flight: usize,
    polls_in_flight: usize,
    poll_failures: u32,
    polling: bool,
}

impl<A: NewsApi, P: Presenter> SyncController<A, P> {
    pub fn new(
        api: Arc<A>,
        presenter: P,
        cfg: &SyncConfig,
        selection: FilterSelection,
        completion_tx: UnboundedSender<SyncEvent>,
    ) -> Self {
        Self {
            api,
            presenter,
            store: ClientStore::new(),
            selection,
            overlap: cfg.poll_overlap,
            max_poll_failures: cfg.max_poll_failures,
            completion_tx,
            issued_loads: 0,
            applied_load: 0,
            loads_in_flight: 0,
            polls_in_flight: 0,
            poll_failures: 0,
            polling: true,
        }
    }

    /// Cached load and (optionally) the background refresh, issued together.
    /// Neither waits for the other; polling is driven by the caller's ticker.
    pub fn init(&mut self, refresh_on_launch: bool) {
        self.load_snapshot();
        if refresh_on_launch {
            self.request_refresh();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn handle(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::FilterChanged(selection) => {
                self.selection = selection;
                self.render(RenderReason::FilterChanged);
            }
            SyncEvent::RefreshRequested => self.request_refresh(),
            SyncEvent::PollTick => self.poll_status(),
            SyncEvent::LoadCompleted { seq, payload } => self.on_load_completed(seq, payload),
            SyncEvent::LoadFailed { seq, error } => self.on_load_failed(seq, error),
            SyncEvent::RefreshAccepted => debug!("refresh accepted by backend"),
            SyncEvent::RefreshFailed(e) => {
                warn!(error = %e, "refresh request failed");
                self.presenter.on_refresh_busy(false);
            }
            SyncEvent::StatusReceived(status) => self.on_status(status),
            SyncEvent::PollFailed(e) => self.on_poll_failed(e),
        }
    }

    pub fn load_snapshot(&mut self) {
        self.issued_loads += 1;
        self.loads_in_flight += 1;
        let seq = self.issued_loads;
        let api = Arc::clone(&self.api);
        let tx = self.completion_tx.clone();
        debug!(seq, "loading snapshot");
        tokio::spawn(async move {
            let event = match api.fetch_news().await {
                Ok(payload) => SyncEvent::LoadCompleted { seq, payload },
                Err(error) => SyncEvent::LoadFailed { seq, error },
            };
            let _ = tx.send(event);
        });
    }

    pub fn request_refresh(&mut self) {
        self.presenter.on_refresh_busy(true);
        let api = Arc::clone(&self.api);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let event = match api.request_refresh().await {
                Ok(()) => SyncEvent::RefreshAccepted,
                Err(e) => SyncEvent::RefreshFailed(e),
            };
            let _ = tx.send(event);
        });
    }

    pub fn poll_status(&mut self) {
        if !self.polling {
            return;
        }
        if self.overlap == PollOverlap::Skip && self.polls_in_flight > 0 {
            debug!(in_flight = self.polls_in_flight, "previous poll unresolved; skipping tick");
            return;
        }
        self.polls_in_flight += 1;
        let api = Arc::clone(&self.api);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let event = match api.fetch_status().await {
                Ok(status) => SyncEvent::StatusReceived(status),
                Err(e) => SyncEvent::PollFailed(e),
            };
            let _ = tx.send(event);
        });
    }

    fn render(&mut self, reason: RenderReason) {
        let state = self.store.get();
        let view = derive_view(&state.snapshot, &self.selection);
        self.presenter.on_snapshot_ready(SnapshotView { reason, view });
    }

    fn on_load_completed(&mut self, seq: u64, payload: NewsPayload) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if seq <= self.applied_load {
            debug!(seq, applied = self.applied_load, "discarding stale snapshot response");
            return;
        }
        self.applied_load = seq;

        let (snapshot, status) = payload.into_parts();
        if snapshot.is_empty() {
            info!("backend has no cached articles yet");
        }
        info!(
            regions = snapshot.regions.len(),
            articles = snapshot.article_count(),
            last_updated = status.last_updated.as_deref().unwrap_or("-"),
            "snapshot loaded"
        );
        self.store.replace(snapshot, status.clone());
        self.render(RenderReason::Loaded);
        self.presenter.on_status_changed(status);
    }

    fn on_load_failed(&mut self, seq: u64, e: ApiError) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if seq <= self.applied_load {
            debug!(seq, error = %e, "older snapshot request failed after a newer one applied");
            return;
        }
        warn!(seq, error = %e, "snapshot load failed; keeping last good data");
        // Snapshot and status in the store stay as they were.
        let mut status = self.store.get().status.clone();
        status.error = Some(format!("Failed to load data: {e}"));
        self.presenter.on_status_changed(status);
    }

    fn on_status(&mut self, payload: StatusPayload) {
        self.polls_in_flight = self.polls_in_flight.saturating_sub(1);
        self.poll_failures = 0;

        let status = RunStatus {
            running: payload.running,
            last_updated: payload.last_updated,
            error: payload.error,
            progress: payload.progress.unwrap_or_default().clamped(),
        };
        let stale = !status.running
            && status.last_updated.is_some()
            && status.last_updated != self.store.get().last_rendered_update;
        self.presenter.on_status_changed(status);

        if !stale {
            return;
        }
        if self.loads_in_flight > 0 {
            debug!("newer run reported; reload already in flight");
            return;
        }
        info!("backend reports a newer completed run; reloading");
        self.load_snapshot();
    }

    fn on_poll_failed(&mut self, e: ApiError) {
        self.polls_in_flight = self.polls_in_flight.saturating_sub(1);
        self.poll_failures = self.poll_failures.saturating_add(1);
        warn!(error = %e, consecutive = self.poll_failures, "status poll failed");

        let Some(max) = self.max_poll_failures else {
            return;
        };
        if self.polling && self.poll_failures >= max {
            self.polling = false;
            error!(failures = self.poll_failures, "giving up on status polling");
            let mut status = self.store.get().status.clone();
            status.error = Some(format!(
                "Status polling stopped after {} consecutive failures: {e}",
                self.poll_failures
            ));
            self.presenter.on_status_changed(status);
        }
    }

    #[cfg(test)]
    fn presenter(&self) -> &P {
        &self.presenter
    }
}

/// Drive the controller until the presentation layer quits.
pub(crate) async fn run_controller<A: NewsApi, P: Presenter>(
    cfg: &SyncConfig,
    api: Arc<A>,
    presenter: P,
    selection: FilterSelection,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<SyncEvent>();
    info!(
        config = %serde_json::to_string(cfg).unwrap_or_default(),
        "sync controller starting"
    );
    let mut ctl = SyncController::new(api, presenter, cfg, selection, completion_tx);
    ctl.init(cfg.refresh_on_launch);

    let mut ticker = tokio::time::interval_at(Instant::now() + cfg.poll_interval, cfg.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let polling = ctl.is_polling();
        let event = tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(UiCommand::FilterChanged(selection)) => SyncEvent::FilterChanged(selection),
                Some(UiCommand::RefreshRequested) => SyncEvent::RefreshRequested,
                Some(UiCommand::Quit) | None => break,
            },
            // The controller keeps a sender alive, so this never yields None.
            Some(done) = completion_rx.recv() => done,
            _ = async {
                if polling {
                    ticker.tick().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => SyncEvent::PollTick,
        };
        ctl.handle(event);
    }

    debug!("sync controller stopped");
    Ok(())
}
