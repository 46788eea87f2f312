//! Turns the configured item sequence and the tracked windows into
//! positioned widgets.

pub mod clock;
pub mod items;
pub mod panel;

pub use items::{PanelItem, parse_panel_items};
pub use panel::{BUTTON_MAX_WIDTH, BUTTON_PADDING, ButtonLabels, PanelLayout};
