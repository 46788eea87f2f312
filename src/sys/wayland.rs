//! The panel's compositor connection: globals, the layer surface, shm
//! buffers and the foreign-toplevel window list.

mod dispatch;
mod shm;

use std::os::fd::BorrowedFd;

use thiserror::Error;
use tracing::{debug, info, warn};
use wayland_client::backend::{ObjectId, WaylandError};
use wayland_client::globals::{BindError, GlobalError, GlobalList, registry_queue_init};
use wayland_client::protocol::{wl_compositor, wl_output, wl_pointer, wl_registry, wl_seat, wl_shm, wl_surface};
use wayland_client::{ConnectError, Connection, DispatchError, EventQueue, Proxy, QueueHandle};
use wayland_protocols::wp::cursor_shape::v1::client::wp_cursor_shape_manager_v1::WpCursorShapeManagerV1;
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1;
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::{self, ZwlrLayerShellV1};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1::{
    self, KeyboardInteractivity, ZwlrLayerSurfaceV1,
};

pub use self::shm::ShmBuffer;
use super::display::{Display, DisplayError};
use super::event::{Event, OutputId, SeatId};
use super::surface_pool::{AllocError, BufferAllocator, SlotId};
use crate::common::config::{Config, Layer, Position};
use crate::model::WindowHandle;

const NAMESPACE: &str = "taskstrip";
const SEAT_VERSION: u32 = 5;
const OUTPUT_VERSION: u32 = 4;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to connect to the wayland display: {0}")]
    Connect(#[from] ConnectError),
    #[error("failed to list globals: {0}")]
    Globals(#[from] GlobalError),
    #[error("compositor does not provide {interface}: {source}")]
    MissingGlobal {
        interface: &'static str,
        #[source]
        source: BindError,
    },
    #[error("initial roundtrip failed: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("no output named {0:?}")]
    OutputNotFound(String),
}

/// A window reported by `zwlr_foreign_toplevel_manager_v1`.
#[derive(Debug)]
pub struct ToplevelHandle(ZwlrForeignToplevelHandleV1);

impl WindowHandle for ToplevelHandle {
    type Id = ObjectId;

    fn id(&self) -> ObjectId { self.0.id() }

    fn release(&self) { self.0.destroy(); }
}

/// Where and how the layer surface is placed.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceOptions {
    pub output: Option<String>,
    pub position: Position,
    pub layer: Layer,
    pub height: u32,
}

impl SurfaceOptions {
    pub fn from_config(config: &Config) -> Self {
        SurfaceOptions {
            output: config.output.clone(),
            position: config.position,
            layer: config.layer,
            height: config.height(),
        }
    }

    fn anchor(&self) -> zwlr_layer_surface_v1::Anchor {
        use zwlr_layer_surface_v1::Anchor;
        let edge = match self.position {
            Position::Top => Anchor::Top,
            Position::Bottom => Anchor::Bottom,
        };
        edge | Anchor::Left | Anchor::Right
    }

    fn layer(&self) -> zwlr_layer_shell_v1::Layer {
        use zwlr_layer_shell_v1::Layer as Wl;
        match self.layer {
            Layer::Background => Wl::Background,
            Layer::Bottom => Wl::Bottom,
            Layer::Top => Wl::Top,
            Layer::Overlay => Wl::Overlay,
        }
    }
}

struct Seat {
    name: u32,
    seat: wl_seat::WlSeat,
    pointer: Option<wl_pointer::WlPointer>,
}

struct Output {
    name: u32,
    output: wl_output::WlOutput,
    output_name: Option<String>,
}

/// Protocol objects plus the outbox the dispatch handlers write to.
pub struct State {
    events: Vec<Event<ToplevelHandle>>,
    compositor: wl_compositor::WlCompositor,
    shm: wl_shm::WlShm,
    layer_shell: ZwlrLayerShellV1,
    toplevel_manager: Option<ZwlrForeignToplevelManagerV1>,
    cursor_shape: Option<WpCursorShapeManagerV1>,
    seats: Vec<Seat>,
    outputs: Vec<Output>,
    surface: Option<wl_surface::WlSurface>,
    layer_surface: Option<ZwlrLayerSurfaceV1>,
}

impl State {
    fn push(&mut self, event: Event<ToplevelHandle>) { self.events.push(event); }

    fn add_seat(&mut self, registry: &wl_registry::WlRegistry, qh: &QueueHandle<State>, name: u32, version: u32) {
        let seat = registry.bind::<wl_seat::WlSeat, _, _>(name, version.min(SEAT_VERSION), qh, SeatId(name));
        debug!(name, "seat added");
        self.seats.push(Seat { name, seat, pointer: None });
    }

    fn add_output(
        &mut self,
        registry: &wl_registry::WlRegistry,
        qh: &QueueHandle<State>,
        name: u32,
        version: u32,
    ) {
        let output =
            registry.bind::<wl_output::WlOutput, _, _>(name, version.min(OUTPUT_VERSION), qh, OutputId(name));
        debug!(name, "output added");
        self.outputs.push(Output { name, output, output_name: None });
    }

    fn remove_global(&mut self, name: u32) {
        if let Some(index) = self.seats.iter().position(|seat| seat.name == name) {
            let seat = self.seats.swap_remove(index);
            release_seat(seat);
            debug!(name, "seat removed");
            self.push(Event::SeatRemoved(SeatId(name)));
        } else if let Some(index) = self.outputs.iter().position(|output| output.name == name) {
            let output = self.outputs.swap_remove(index);
            if output.output.version() >= 3 {
                output.output.release();
            }
            debug!(name, "output removed");
            self.push(Event::OutputRemoved(OutputId(name)));
        }
    }

    fn seat(&self, id: SeatId) -> Option<&wl_seat::WlSeat> {
        self.seats.iter().find(|seat| seat.name == id.0).map(|seat| &seat.seat)
    }
}

fn release_seat(seat: Seat) {
    if let Some(pointer) = seat.pointer
        && pointer.version() >= 3
    {
        pointer.release();
    }
    if seat.seat.version() >= 5 {
        seat.seat.release();
    }
}

fn bind_required<I>(
    globals: &GlobalList,
    qh: &QueueHandle<State>,
    version: std::ops::RangeInclusive<u32>,
) -> Result<I, SetupError>
where
    I: Proxy + 'static,
    State: wayland_client::Dispatch<I, ()>,
{
    globals.bind(qh, version, ()).map_err(|source| SetupError::MissingGlobal {
        interface: I::interface().name,
        source,
    })
}

fn bind_optional<I>(globals: &GlobalList, qh: &QueueHandle<State>, version: std::ops::RangeInclusive<u32>) -> Option<I>
where
    I: Proxy + 'static,
    State: wayland_client::Dispatch<I, ()>,
{
    match globals.bind(qh, version, ()) {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            warn!(interface = I::interface().name, "optional global unavailable: {err}");
            None
        }
    }
}

fn convert(err: WaylandError) -> DisplayError {
    match err {
        WaylandError::Io(err) => DisplayError::Io(err),
        WaylandError::Protocol(err) => DisplayError::Protocol(err.to_string()),
    }
}

pub struct WaylandDisplay {
    conn: Connection,
    queue: EventQueue<State>,
    qh: QueueHandle<State>,
    state: State,
    read_guard: Option<wayland_client::backend::ReadEventsGuard>,
}

impl WaylandDisplay {
    /// Connects, binds globals and maps the layer surface. Events produced
    /// during setup stay queued for the run loop.
    pub fn connect(options: &SurfaceOptions) -> Result<Self, SetupError> {
        let conn = Connection::connect_to_env()?;
        let (globals, mut queue) = registry_queue_init::<State>(&conn)?;
        let qh = queue.handle();

        let mut state = State {
            events: Vec::new(),
            compositor: bind_required(&globals, &qh, 4..=4)?,
            shm: bind_required(&globals, &qh, 1..=1)?,
            layer_shell: bind_required(&globals, &qh, 1..=3)?,
            toplevel_manager: bind_optional(&globals, &qh, 1..=3),
            cursor_shape: bind_optional(&globals, &qh, 1..=1),
            seats: Vec::new(),
            outputs: Vec::new(),
            surface: None,
            layer_surface: None,
        };
        if state.toplevel_manager.is_none() {
            warn!("window list unavailable; the taskbar stays empty");
        }

        for global in globals.contents().clone_list() {
            if global.interface == wl_seat::WlSeat::interface().name {
                state.add_seat(globals.registry(), &qh, global.name, global.version);
            } else if global.interface == wl_output::WlOutput::interface().name {
                state.add_output(globals.registry(), &qh, global.name, global.version);
            }
        }

        // Output names arrive with the first roundtrip.
        queue.roundtrip(&mut state)?;

        let output = match &options.output {
            Some(wanted) => {
                let output = state
                    .outputs
                    .iter()
                    .find(|output| output.output_name.as_deref() == Some(wanted.as_str()))
                    .ok_or_else(|| SetupError::OutputNotFound(wanted.clone()))?;
                info!(output = wanted, "placing panel on named output");
                let id = OutputId(output.name);
                let wl_output = output.output.clone();
                state.push(Event::OutputSelected(id));
                Some(wl_output)
            }
            None => None,
        };

        let surface = state.compositor.create_surface(&qh, ());
        let layer_surface = state.layer_shell.get_layer_surface(
            &surface,
            output.as_ref(),
            options.layer(),
            NAMESPACE.to_string(),
            &qh,
            (),
        );
        layer_surface.set_anchor(options.anchor());
        layer_surface.set_size(0, options.height);
        layer_surface.set_exclusive_zone(options.height as i32);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        surface.commit();
        state.surface = Some(surface);
        state.layer_surface = Some(layer_surface);

        queue.roundtrip(&mut state)?;
        info!(seats = state.seats.len(), outputs = state.outputs.len(), "connected");

        Ok(WaylandDisplay { conn, queue, qh, state, read_guard: None })
    }
}

impl BufferAllocator for WaylandDisplay {
    type Buffer = ShmBuffer;

    fn allocate(&mut self, slot: SlotId, width: u32, height: u32) -> Result<ShmBuffer, AllocError> {
        ShmBuffer::new(&self.state.shm, &self.qh, slot, width, height)
    }
}

impl Display for WaylandDisplay {
    type Handle = ToplevelHandle;

    fn dispatch_pending(&mut self, out: &mut Vec<Event<ToplevelHandle>>) -> Result<(), DisplayError> {
        let result = self.queue.dispatch_pending(&mut self.state);
        out.append(&mut self.state.events);
        result.map(|_| ()).map_err(|err| match err {
            DispatchError::Backend(err) => convert(err),
            err => DisplayError::Protocol(err.to_string()),
        })
    }

    fn prepare_read(&mut self) -> bool {
        match self.queue.prepare_read() {
            Some(guard) => {
                self.read_guard = Some(guard);
                true
            }
            None => false,
        }
    }

    fn connection_fd(&self) -> Option<BorrowedFd<'_>> {
        self.read_guard.as_ref().map(|guard| guard.connection_fd())
    }

    fn read(&mut self) -> Result<(), DisplayError> {
        match self.read_guard.take() {
            Some(guard) => guard.read().map(|_| ()).map_err(convert),
            None => Ok(()),
        }
    }

    fn cancel_read(&mut self) { self.read_guard = None; }

    fn flush(&mut self) -> Result<(), DisplayError> { self.conn.flush().map_err(convert) }

    fn submit(&mut self, buffer: &mut ShmBuffer, width: u32, height: u32, scale: i32) {
        let Some(surface) = &self.state.surface else {
            return;
        };
        surface.set_buffer_scale(scale);
        surface.attach(Some(buffer.wl_buffer()), 0, 0);
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();
    }

    fn activate(&mut self, window: &ToplevelHandle, seat: SeatId) {
        match self.state.seat(seat) {
            Some(wl_seat) => window.0.activate(wl_seat),
            None => warn!(?seat, "activation from an unknown seat"),
        }
    }

    fn shutdown(&mut self) {
        self.read_guard = None;
        if let Some(layer_surface) = self.state.layer_surface.take() {
            layer_surface.destroy();
        }
        if let Some(surface) = self.state.surface.take() {
            surface.destroy();
        }
        for seat in self.state.seats.drain(..) {
            release_seat(seat);
        }
        for output in self.state.outputs.drain(..) {
            if output.output.version() >= 3 {
                output.output.release();
            }
        }
        if let Some(manager) = self.state.toplevel_manager.take() {
            manager.stop();
        }
        if let Some(cursor_shape) = self.state.cursor_shape.take() {
            cursor_shape.destroy();
        }
        if self.state.layer_shell.version() >= 3 {
            self.state.layer_shell.destroy();
        }
        if let Err(err) = self.conn.flush() {
            debug!("final flush failed: {err}");
        }
        info!("disconnected");
    }
}
