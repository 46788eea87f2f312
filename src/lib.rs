//! A Wayland panel: a thin strip with a taskbar, a clock and flexible
//! spacing, redrawn whenever the compositor reports a change.

pub mod actor;
pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sys;
pub mod ui;

#[cfg(test)]
mod testing;
