use chrono::NaiveTime;
use tracing::{debug, info, instrument, trace, warn};

use super::input::{PointerTracker, dispatch_press};
use crate::common::collections::HashMap;
use crate::common::config::{Colors, Config};
use crate::layout_engine::clock::format_clock;
use crate::layout_engine::{PanelItem, PanelLayout};
use crate::model::{Action, Registry, Widget, WindowHandle, WindowKey};
use crate::sys::display::Display;
use crate::sys::event::{Event, MouseState, OutputId, SeatId};
use crate::sys::surface_pool::{SlotId, SurfacePool};
use crate::ui::canvas::Canvas;
use crate::ui::painter::Scene;
use crate::ui::text::TextRenderer;

/// Largest output scale the panel renders at; larger factors are clamped.
pub const MAX_SCALE: i32 = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct PanelState {
    pub width: u32,
    pub height: u32,
    pub scale: i32,
    pub items: Vec<PanelItem>,
    pub colors: Colors,
    pub markup: bool,
}

impl PanelState {
    /// Size stays zero until the compositor configures the surface.
    pub fn from_config(config: &Config) -> Self {
        PanelState {
            width: 0,
            height: 0,
            scale: 1,
            items: config.items(),
            colors: config.colors,
            markup: config.markup,
        }
    }
}

/// What the run loop must do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Idle,
    Render,
    Activate { window: WindowKey, seat: SeatId },
    BufferReleased(SlotId),
    Terminate,
}

pub struct Panel<H: WindowHandle> {
    pub state: PanelState,
    pub windows: Registry<H>,
    widgets: Vec<Widget>,
    pointers: PointerTracker,
    output_scales: HashMap<OutputId, i32>,
    active_output: Option<OutputId>,
    pending_frame: bool,
}

impl<H: WindowHandle> Panel<H> {
    pub fn new(state: PanelState) -> Self {
        Panel {
            state,
            windows: Registry::new(),
            widgets: Vec::new(),
            pointers: PointerTracker::default(),
            output_scales: HashMap::default(),
            active_output: None,
            pending_frame: false,
        }
    }

    /// Widgets of the most recent render pass.
    pub fn widgets(&self) -> &[Widget] { &self.widgets }

    pub fn active_output(&self) -> Option<OutputId> { self.active_output }

    /// Whether a frame was dropped for lack of a free buffer. Clears the flag.
    pub fn take_pending_frame(&mut self) -> bool { std::mem::take(&mut self.pending_frame) }

    #[instrument(name = "panel::handle_event", level = "debug", skip(self))]
    pub fn handle_event(&mut self, event: Event<H>) -> Outcome {
        match event {
            Event::WindowAppeared(handle) => {
                let key = self.windows.upsert_on_report(handle);
                debug!(?key, "window appeared");
                Outcome::Render
            }
            Event::WindowTitle { id, title } => {
                let known = self.windows.update_title(&id, title);
                self.render_if_known(known, &id)
            }
            Event::WindowAppId { id, app_id } => {
                let known = self.windows.update_app_id(&id, app_id);
                self.render_if_known(known, &id)
            }
            Event::WindowState { id, state } => {
                let known = self.windows.update_active_state(&id, state);
                self.render_if_known(known, &id)
            }
            Event::WindowDone(id) => {
                let known = self.windows.key_of(&id).is_some();
                self.render_if_known(known, &id)
            }
            Event::WindowClosed(id) => {
                let known = self.windows.remove(&id);
                self.render_if_known(known, &id)
            }
            Event::Configure { width, height } => {
                self.state.width = width;
                if height > 0 {
                    self.state.height = height;
                }
                debug!(width = self.state.width, height = self.state.height, "configured");
                Outcome::Render
            }
            Event::SurfaceClosed => {
                info!("panel surface closed by the compositor");
                Outcome::Terminate
            }
            Event::OutputSelected(output) => {
                self.active_output = Some(output);
                self.apply_output_scale()
            }
            Event::SurfaceEnter(output) => {
                if self.active_output.is_none() {
                    self.active_output = Some(output);
                }
                self.apply_output_scale()
            }
            Event::OutputScale { output, factor } => {
                self.output_scales.insert(output, factor);
                if self.active_output == Some(output) {
                    self.apply_output_scale()
                } else {
                    Outcome::Idle
                }
            }
            Event::OutputRemoved(output) => {
                self.output_scales.remove(&output);
                if self.active_output == Some(output) {
                    info!(?output, "panel output removed");
                    Outcome::Terminate
                } else {
                    Outcome::Idle
                }
            }
            Event::PointerEnter { seat, x, y } | Event::PointerMotion { seat, x, y } => {
                self.pointers.update(seat, x, y);
                Outcome::Idle
            }
            Event::PointerButton { seat, serial, state } => {
                if state != MouseState::Down {
                    return Outcome::Idle;
                }
                let Some(x) = self.pointers.x(seat) else {
                    debug!(?seat, serial, "press without a known pointer position");
                    return Outcome::Idle;
                };
                match dispatch_press(&self.widgets, x) {
                    Some(Action::ActivateWindow(window)) => Outcome::Activate { window, seat },
                    None => Outcome::Idle,
                }
            }
            Event::SeatRemoved(seat) => {
                self.pointers.remove(seat);
                Outcome::Idle
            }
            Event::BufferReleased(slot) => Outcome::BufferReleased(slot),
        }
    }

    fn render_if_known(&self, known: bool, id: &H::Id) -> Outcome {
        if known {
            Outcome::Render
        } else {
            debug!(?id, "event for unknown window");
            Outcome::Idle
        }
    }

    fn apply_output_scale(&mut self) -> Outcome {
        let Some(factor) = self.active_output.and_then(|output| self.output_scales.get(&output)) else {
            return Outcome::Idle;
        };
        let scale = match *factor {
            factor if factor < 1 => {
                warn!(factor, "ignoring output scale below 1");
                1
            }
            factor if factor > MAX_SCALE => {
                warn!(factor, max = MAX_SCALE, "clamping output scale");
                MAX_SCALE
            }
            factor => factor,
        };
        if scale == self.state.scale {
            return Outcome::Idle;
        }
        debug!(scale, "output scale changed");
        self.state.scale = scale;
        Outcome::Render
    }

    pub fn activate<D>(&self, display: &mut D, window: WindowKey, seat: SeatId)
    where
        D: Display<Handle = H>,
    {
        match self.windows.get(window) {
            Some(window) => {
                debug!(label = window.label(), ?seat, "activating window");
                display.activate(&window.handle, seat);
            }
            None => debug!(?window, "activation target is gone"),
        }
    }

    /// Lays out, paints and submits one frame. A frame that finds no free
    /// buffer is dropped and marked pending.
    #[instrument(name = "panel::render", level = "trace", skip_all)]
    pub fn render<D>(
        &mut self,
        pool: &mut SurfacePool<D::Buffer>,
        display: &mut D,
        text: &dyn TextRenderer,
        now: NaiveTime,
    ) where
        D: Display<Handle = H>,
    {
        let PanelState { width, height, scale, .. } = self.state;
        if width == 0 || height == 0 {
            trace!(width, height, "surface not configured yet");
            return;
        }
        let Some((physical_width, physical_height)) = physical_size(width, height, scale) else {
            warn!(width, height, scale, "surface size out of range, skipping frame");
            return;
        };

        let clock_label = format_clock(&now);
        let layout = PanelLayout::new(
            &self.state.items,
            width as i32,
            &self.windows,
            &clock_label,
            self.state.markup,
        );
        self.widgets = layout.compute(text);

        let had_free = pool.has_free();
        let Some(mut lease) = pool.acquire(display, physical_width, physical_height) else {
            // Only a busy pool is retried on release; failed allocations are not.
            self.pending_frame = !had_free;
            return;
        };
        self.pending_frame = false;

        let Some(mut canvas) = Canvas::new(lease.pixels(), physical_width, physical_height, scale)
        else {
            return;
        };
        let scene = Scene {
            widgets: &self.widgets,
            windows: &self.windows,
            clock_label: &clock_label,
            width: width as i32,
            height: height as i32,
            colors: &self.state.colors,
            labels: &layout.labels,
        };
        scene.paint(&mut canvas, text);
        canvas.finish();

        display.submit(lease.buffer(), physical_width, physical_height, scale);
        lease.submit();
    }
}

/// Buffer dimensions for a logical size at `scale`, if they fit the
/// protocol's signed 32-bit sizes.
fn physical_size(width: u32, height: u32, scale: i32) -> Option<(u32, u32)> {
    let scale = u32::try_from(scale).ok()?;
    let width = width.checked_mul(scale)?;
    let height = height.checked_mul(scale)?;
    (i32::try_from(width).is_ok() && i32::try_from(height).is_ok()).then_some((width, height))
}
