//! Everything that talks to the outside world: the compositor connection,
//! OS triggers, pixel buffers and the loop that drives them.

pub mod display;
pub mod event;
pub mod event_sources;
pub mod run_loop;
pub mod surface_pool;
pub mod wayland;
