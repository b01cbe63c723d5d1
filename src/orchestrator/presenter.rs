//! Contract between the sync controller and whatever renders its output.

use crate::model::RunStatus;
use crate::view::DerivedView;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderReason {
    /// A new snapshot replaced the store; region options may have changed.
    Loaded,
    /// Same snapshot, different filter selection.
    FilterChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SnapshotView {
    pub reason: RenderReason,
    pub view: DerivedView,
}

/// Rendering side of the controller. Called from the controller task only.
pub(crate) trait Presenter {
    /// After every successful load and every filter change.
    fn on_snapshot_ready(&mut self, view: SnapshotView);

    /// After every poll response and every load outcome.
    fn on_status_changed(&mut self, status: RunStatus);

    /// Busy state of the update control.
    fn on_refresh_busy(&mut self, busy: bool);
}

/// Messages delivered to a presentation thread.
#[derive(Debug, Clone)]
pub(crate) enum UiUpdate {
    // Boxed to keep the enum small; the view carries the whole article list.
    Snapshot(Box<SnapshotView>),
    Status(RunStatus),
    RefreshBusy(bool),
}

/// Forwards presenter calls over a channel, e.g. to the TUI thread.
pub(crate) struct ChannelPresenter {
    tx: UnboundedSender<UiUpdate>,
}

impl ChannelPresenter {
    pub fn new(tx: UnboundedSender<UiUpdate>) -> Self {
        Self { tx }
    }
}

impl Presenter for ChannelPresenter {
    fn on_snapshot_ready(&mut self, view: SnapshotView) {
        let _ = self.tx.send(UiUpdate::Snapshot(Box::new(view)));
    }

    fn on_status_changed(&mut self, status: RunStatus) {
        let _ = self.tx.send(UiUpdate::Status(status));
    }

    fn on_refresh_busy(&mut self, busy: bool) {
        let _ = self.tx.send(UiUpdate::RefreshBusy(busy));
    }
}
