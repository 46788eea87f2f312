pub mod widget;
pub mod window;

pub use widget::{Action, Widget, WidgetKind};
pub use window::{Registry, ToplevelState, TrackedWindow, WindowHandle, WindowKey};
