use super::surface_pool::SlotId;
use crate::model::{ToplevelState, WindowHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeatId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputId(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseState {
    Down,
    Up,
}

/// Everything the display boundary reports, in delivery order.
#[derive(Debug)]
pub enum Event<H: WindowHandle> {
    WindowAppeared(H),
    WindowTitle { id: H::Id, title: String },
    WindowAppId { id: H::Id, app_id: String },
    WindowState { id: H::Id, state: ToplevelState },
    WindowDone(H::Id),
    WindowClosed(H::Id),

    /// Logical size chosen by the compositor for the panel surface.
    Configure { width: u32, height: u32 },
    SurfaceClosed,
    SurfaceEnter(OutputId),

    /// The output the panel was asked to appear on.
    OutputSelected(OutputId),
    OutputScale { output: OutputId, factor: i32 },
    OutputRemoved(OutputId),

    PointerEnter { seat: SeatId, x: f64, y: f64 },
    PointerMotion { seat: SeatId, x: f64, y: f64 },
    PointerButton { seat: SeatId, serial: u32, state: MouseState },
    SeatRemoved(SeatId),

    BufferReleased(SlotId),
}
