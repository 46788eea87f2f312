//! Event handlers that own the panel's mutable state.

pub mod input;
pub mod panel;

pub use panel::{Outcome, Panel, PanelState};
