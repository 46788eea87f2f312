use super::window::WindowKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetKind {
    TaskbarButton { window: WindowKey },
    Clock,
    Spacer,
}

/// A clickable region of the panel in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Widget {
    pub x: i32,
    pub width: i32,
    pub kind: WidgetKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    ActivateWindow(WindowKey),
}

impl Widget {
    pub fn right(&self) -> i32 { self.x + self.width }

    /// Half-open: `[x, x + width)`.
    pub fn contains(&self, x: i32) -> bool { x >= self.x && x < self.right() }

    pub fn action(&self) -> Option<Action> {
        match self.kind {
            WidgetKind::TaskbarButton { window } => Some(Action::ActivateWindow(window)),
            WidgetKind::Clock | WidgetKind::Spacer => None,
        }
    }
}
