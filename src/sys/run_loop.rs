//! The outermost driver: protocol read/dispatch/flush, the blocking wait and
//! render scheduling.

use chrono::{Local, NaiveTime};
use tracing::{debug, error, info, instrument, trace};

use super::display::Display;
use super::event::Event;
use super::event_sources::{EventSources, Ready};
use super::surface_pool::SurfacePool;
use crate::actor::panel::{Outcome, Panel};
use crate::ui::text::TextRenderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Terminating,
}

pub struct RunLoop<D: Display, S, T> {
    display: D,
    sources: S,
    text: T,
    panel: Panel<D::Handle>,
    pool: SurfacePool<D::Buffer>,
    state: LoopState,
    events: Vec<Event<D::Handle>>,
}

fn local_time() -> NaiveTime { Local::now().time() }

impl<D, S, T> RunLoop<D, S, T>
where
    D: Display,
    S: EventSources,
    T: TextRenderer,
{
    pub fn new(display: D, sources: S, text: T, panel: Panel<D::Handle>) -> Self {
        RunLoop {
            display,
            sources,
            text,
            panel,
            pool: SurfacePool::new(),
            state: LoopState::Idle,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState { self.state }

    pub fn display(&self) -> &D { &self.display }

    pub fn panel(&self) -> &Panel<D::Handle> { &self.panel }

    /// Runs until a termination condition, then releases everything.
    pub fn run(&mut self) {
        self.start();
        while self.state == LoopState::Running {
            self.turn();
        }
        self.shutdown();
    }

    /// Dispatches what the handshake queued and forces the first frame.
    pub fn start(&mut self) {
        self.dispatch_queued();
        if self.state == LoopState::Idle {
            self.state = LoopState::Running;
            info!("panel running");
            self.render();
        }
    }

    /// One iteration of the loop body.
    pub fn turn(&mut self) {
        self.dispatch_queued();
        while !self.display.prepare_read() {
            self.dispatch_queued();
            if self.state != LoopState::Running {
                return;
            }
        }
        if self.state != LoopState::Running {
            self.display.cancel_read();
            return;
        }

        if let Err(err) = self.display.flush()
            && !err.is_would_block()
        {
            error!("failed to flush the display connection: {err}");
            self.display.cancel_read();
            self.terminate();
            return;
        }

        let ready = match self.sources.wait(self.display.connection_fd()) {
            Ok(ready) => ready,
            Err(err) => {
                error!("failed to wait for events: {err}");
                self.display.cancel_read();
                self.terminate();
                return;
            }
        };

        if ready.contains(Ready::PROTOCOL) {
            if let Err(err) = self.display.read()
                && !err.is_would_block()
            {
                error!("failed to read from the display connection: {err}");
                self.terminate();
                return;
            }
        } else {
            self.display.cancel_read();
        }

        if ready.intersects(Ready::TIMEOUT | Ready::SIGNAL) {
            info!(?ready, "stopping");
            self.terminate();
            return;
        }

        if ready.contains(Ready::CLOCK) {
            self.sources.consume_clock_tick();
            self.render();
        }
    }

    fn dispatch_queued(&mut self) {
        let mut events = std::mem::take(&mut self.events);
        if let Err(err) = self.display.dispatch_pending(&mut events) {
            error!("failed to dispatch protocol events: {err}");
            self.terminate();
        }
        for event in events.drain(..) {
            self.handle(event);
        }
        self.events = events;
    }

    fn handle(&mut self, event: Event<D::Handle>) {
        match self.panel.handle_event(event) {
            Outcome::Idle => {}
            Outcome::Render => self.render(),
            Outcome::Activate { window, seat } => self.panel.activate(&mut self.display, window, seat),
            Outcome::BufferReleased(slot) => {
                self.pool.release(slot);
                if self.panel.take_pending_frame() {
                    trace!(?slot, "redrawing dropped frame");
                    self.render();
                }
            }
            Outcome::Terminate => self.terminate(),
        }
    }

    fn terminate(&mut self) {
        if self.state != LoopState::Terminating {
            debug!(from = ?self.state, "terminating");
            self.state = LoopState::Terminating;
        }
    }

    fn render(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        self.panel.render(&mut self.pool, &mut self.display, &self.text, local_time());
    }

    /// Releases windows, then buffers, then protocol objects.
    #[instrument(name = "run_loop::shutdown", skip(self))]
    pub fn shutdown(&mut self) {
        self.state = LoopState::Terminating;
        self.panel.windows.clear();
        self.pool.clear();
        self.display.shutdown();
    }
}
