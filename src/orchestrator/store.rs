//! Client state store.
//!
//! Holds the last successfully loaded snapshot together with its run status. The
//! value is only ever swapped as a whole, so a reader holding the result of `get()`
//! sees a snapshot and status that arrived in the same response.

use crate::model::{RunStatus, Snapshot};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct ClientState {
    pub snapshot: Snapshot,
    pub status: RunStatus,
    /// `lastUpdated` of the snapshot currently on screen.
    pub last_rendered_update: Option<String>,
}

pub(crate) struct ClientStore {
    current: Arc<ClientState>,
}

impl ClientStore {
    pub fn new() -> Self {
        Self {
            current: Arc::new(ClientState::default()),
        }
    }

    /// Cheap read-only handle; stays valid (and unchanged) across later replaces.
    pub fn get(&self) -> Arc<ClientState> {
        Arc::clone(&self.current)
    }

    pub fn replace(&mut self, snapshot: Snapshot, status: RunStatus) {
        let last_rendered_update = status.last_updated.clone();
        self.current = Arc::new(ClientState {
            snapshot,
            status,
            last_rendered_update,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegionGroup;

    #[test]
    fn starts_empty() {
        let store = ClientStore::new();
        let state = store.get();
        assert!(state.snapshot.is_empty());
        assert!(state.last_rendered_update.is_none());
        assert!(!state.status.running);
    }

    #[test]
    fn replace_swaps_snapshot_and_status_together() {
        let mut store = ClientStore::new();
        let before = store.get();

        let snapshot = Snapshot {
            regions: vec![RegionGroup {
                name: "EU".into(),
                articles: vec![Default::default()],
            }],
        };
        let status = RunStatus {
            last_updated: Some("T1".into()),
            ..Default::default()
        };
        store.replace(snapshot.clone(), status.clone());

        let after = store.get();
        assert_eq!(after.snapshot, snapshot);
        assert_eq!(after.status, status);
        assert_eq!(after.last_rendered_update.as_deref(), Some("T1"));
        // Earlier readers keep their consistent view.
        assert!(before.snapshot.is_empty());
        assert!(before.status.last_updated.is_none());
    }
}
