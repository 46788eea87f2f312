//! Listener callbacks, translated into [`Event`]s on the state's outbox.

use tracing::{debug, info, trace};
use wayland_client::globals::GlobalListContents;
use wayland_client::protocol::{
    wl_buffer, wl_compositor, wl_output, wl_pointer, wl_registry, wl_seat, wl_shm, wl_shm_pool, wl_surface,
};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum, delegate_noop, event_created_child};
use wayland_protocols::wp::cursor_shape::v1::client::wp_cursor_shape_device_v1::{self, WpCursorShapeDeviceV1};
use wayland_protocols::wp::cursor_shape::v1::client::wp_cursor_shape_manager_v1::WpCursorShapeManagerV1;
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_handle_v1::{
    self, ZwlrForeignToplevelHandleV1,
};
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_manager_v1::{
    self, ZwlrForeignToplevelManagerV1,
};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1::{self, ZwlrLayerSurfaceV1};

use super::{State, ToplevelHandle};
use crate::model::ToplevelState;
use crate::sys::event::{Event, MouseState, OutputId, SeatId};
use crate::sys::surface_pool::SlotId;

delegate_noop!(State: ignore wl_compositor::WlCompositor);
delegate_noop!(State: ignore wl_shm::WlShm);
delegate_noop!(State: ignore wl_shm_pool::WlShmPool);
delegate_noop!(State: ignore ZwlrLayerShellV1);
delegate_noop!(State: ignore WpCursorShapeManagerV1);
delegate_noop!(State: ignore WpCursorShapeDeviceV1);

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for State {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &GlobalListContents,
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global { name, interface, version } => {
                if interface == wl_seat::WlSeat::interface().name {
                    state.add_seat(registry, qh, name, version);
                } else if interface == wl_output::WlOutput::interface().name {
                    state.add_output(registry, qh, name, version);
                }
            }
            wl_registry::Event::GlobalRemove { name } => state.remove_global(name),
            _ => {}
        }
    }
}

impl Dispatch<wl_seat::WlSeat, SeatId> for State {
    fn event(
        state: &mut Self,
        proxy: &wl_seat::WlSeat,
        event: wl_seat::Event,
        seat_id: &SeatId,
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let wl_seat::Event::Capabilities { capabilities: WEnum::Value(capabilities) } = event else {
            return;
        };
        let Some(seat) = state.seats.iter_mut().find(|seat| seat.name == seat_id.0) else {
            return;
        };
        let has_pointer = capabilities.contains(wl_seat::Capability::Pointer);
        match (has_pointer, seat.pointer.take()) {
            (true, None) => {
                debug!(?seat_id, "pointer available");
                seat.pointer = Some(proxy.get_pointer(qh, *seat_id));
            }
            (true, Some(pointer)) => seat.pointer = Some(pointer),
            (false, Some(pointer)) => {
                debug!(?seat_id, "pointer gone");
                if pointer.version() >= 3 {
                    pointer.release();
                }
            }
            (false, None) => {}
        }
    }
}

impl Dispatch<wl_pointer::WlPointer, SeatId> for State {
    fn event(
        state: &mut Self,
        pointer: &wl_pointer::WlPointer,
        event: wl_pointer::Event,
        seat: &SeatId,
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let seat = *seat;
        match event {
            wl_pointer::Event::Enter { serial, surface_x, surface_y, .. } => {
                if let Some(manager) = &state.cursor_shape {
                    let device = manager.get_pointer(pointer, qh, ());
                    device.set_shape(serial, wp_cursor_shape_device_v1::Shape::Default);
                    device.destroy();
                }
                state.push(Event::PointerEnter { seat, x: surface_x, y: surface_y });
            }
            wl_pointer::Event::Motion { surface_x, surface_y, .. } => {
                state.push(Event::PointerMotion { seat, x: surface_x, y: surface_y });
            }
            wl_pointer::Event::Button { serial, state: button_state, .. } => {
                let button_state = match button_state {
                    WEnum::Value(wl_pointer::ButtonState::Pressed) => MouseState::Down,
                    _ => MouseState::Up,
                };
                state.push(Event::PointerButton { seat, serial, state: button_state });
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_output::WlOutput, OutputId> for State {
    fn event(
        state: &mut Self,
        _: &wl_output::WlOutput,
        event: wl_output::Event,
        output: &OutputId,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_output::Event::Scale { factor } => {
                state.push(Event::OutputScale { output: *output, factor });
            }
            wl_output::Event::Name { name } => {
                trace!(?output, name, "output name");
                if let Some(known) = state.outputs.iter_mut().find(|o| o.name == output.0) {
                    known.output_name = Some(name);
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_surface::WlSurface, ()> for State {
    fn event(
        state: &mut Self,
        _: &wl_surface::WlSurface,
        event: wl_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_surface::Event::Enter { output } = event
            && let Some(id) = output.data::<OutputId>()
        {
            state.push(Event::SurfaceEnter(*id));
        }
    }
}

impl Dispatch<ZwlrLayerSurfaceV1, ()> for State {
    fn event(
        state: &mut Self,
        layer_surface: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure { serial, width, height } => {
                layer_surface.ack_configure(serial);
                state.push(Event::Configure { width, height });
            }
            zwlr_layer_surface_v1::Event::Closed => state.push(Event::SurfaceClosed),
            _ => {}
        }
    }
}

impl Dispatch<wl_buffer::WlBuffer, SlotId> for State {
    fn event(
        state: &mut Self,
        _: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        slot: &SlotId,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            state.push(Event::BufferReleased(*slot));
        }
    }
}

impl Dispatch<ZwlrForeignToplevelManagerV1, ()> for State {
    fn event(
        state: &mut Self,
        _: &ZwlrForeignToplevelManagerV1,
        event: zwlr_foreign_toplevel_manager_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_foreign_toplevel_manager_v1::Event::Toplevel { toplevel } => {
                state.push(Event::WindowAppeared(ToplevelHandle(toplevel)));
            }
            zwlr_foreign_toplevel_manager_v1::Event::Finished => {
                info!("window list finished");
                state.toplevel_manager = None;
            }
            _ => {}
        }
    }

    event_created_child!(State, ZwlrForeignToplevelManagerV1, [
        zwlr_foreign_toplevel_manager_v1::EVT_TOPLEVEL_OPCODE => (ZwlrForeignToplevelHandleV1, ())
    ]);
}

/// Unpacks the protocol's array of native-endian `u32` state values.
fn parse_states(raw: &[u8]) -> ToplevelState {
    ToplevelState::from_raw(
        raw.chunks_exact(4).map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
    )
}

impl Dispatch<ZwlrForeignToplevelHandleV1, ()> for State {
    fn event(
        state: &mut Self,
        handle: &ZwlrForeignToplevelHandleV1,
        event: zwlr_foreign_toplevel_handle_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let id = handle.id();
        match event {
            zwlr_foreign_toplevel_handle_v1::Event::Title { title } => {
                state.push(Event::WindowTitle { id, title });
            }
            zwlr_foreign_toplevel_handle_v1::Event::AppId { app_id } => {
                state.push(Event::WindowAppId { id, app_id });
            }
            zwlr_foreign_toplevel_handle_v1::Event::State { state: raw } => {
                state.push(Event::WindowState { id, state: parse_states(&raw) });
            }
            zwlr_foreign_toplevel_handle_v1::Event::Done => state.push(Event::WindowDone(id)),
            zwlr_foreign_toplevel_handle_v1::Event::Closed => state.push(Event::WindowClosed(id)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn state_array_is_native_endian_u32() {
        let raw: Vec<u8> = [2u32, 3].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(parse_states(&raw), ToplevelState::ACTIVATED | ToplevelState::FULLSCREEN);
        assert_eq!(parse_states(&[]), ToplevelState::empty());
    }
}
