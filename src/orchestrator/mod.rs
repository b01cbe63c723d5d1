//! Client-side synchronization.
//!
//! The controller owns the client state store and decides when the backend must be
//! asked for a full snapshot. Presentation layers talk to it through `UiCommand`s
//! and receive renders through the `Presenter` contract.

mod controller;
mod presenter;
mod store;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use presenter::{ChannelPresenter, RenderReason, SnapshotView, UiUpdate};
