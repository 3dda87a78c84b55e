//! State synchronizer: the single place where zone state changes and
//! redraws are requested.

mod core;
mod view;

pub use core::{StateSynchronizer, Toggle};
pub use view::{PanelView, RecordingView, Redraw};
