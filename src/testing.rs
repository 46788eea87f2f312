//! Stand-ins for the compositor, OS triggers and font backend.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::fd::BorrowedFd;
use std::rc::Rc;

use crate::model::WindowHandle;
use crate::sys::display::{Display, DisplayError};
use crate::sys::event::{Event, SeatId};
use crate::sys::event_sources::{EventSources, Ready};
use crate::sys::surface_pool::{AllocError, BufferAllocator, PixelBuffer, SlotId};
use crate::ui::canvas::{Canvas, ClipRect};
use crate::ui::color::Color;
use crate::ui::text::{TextMeasure, TextRenderer, TextSize};

#[derive(Clone, Debug, Default)]
pub struct ReleaseLog(Rc<RefCell<Vec<u32>>>);

impl ReleaseLog {
    pub fn released(&self) -> Vec<u32> { self.0.borrow().clone() }
}

#[derive(Debug)]
pub struct FakeHandle {
    id: u32,
    log: ReleaseLog,
}

impl FakeHandle {
    pub fn new(id: u32, log: &ReleaseLog) -> Self { FakeHandle { id, log: log.clone() } }
}

impl WindowHandle for FakeHandle {
    type Id = u32;

    fn id(&self) -> u32 { self.id }

    fn release(&self) { self.log.0.borrow_mut().push(self.id); }
}

#[derive(Debug)]
pub struct FakeBuffer {
    pub slot: SlotId,
    pixels: Vec<u8>,
}

impl PixelBuffer for FakeBuffer {
    fn pixels(&mut self) -> &mut [u8] { &mut self.pixels }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Submission {
    pub slot: SlotId,
    pub width: u32,
    pub height: u32,
    pub scale: i32,
}

/// A display whose protocol traffic is scripted by the test.
#[derive(Default)]
pub struct FakeDisplay {
    /// Events handed out by the next `dispatch_pending`.
    pub queue: Vec<Event<FakeHandle>>,
    /// Batches that successive `read` calls move into `queue`.
    pub on_read: VecDeque<Vec<Event<FakeHandle>>>,
    pub flush_error: Option<DisplayError>,
    pub fail_allocations: bool,
    pub allocations: usize,
    pub reads: usize,
    pub cancelled_reads: usize,
    pub submissions: Vec<Submission>,
    pub activations: Vec<(u32, SeatId)>,
    pub shut_down: bool,
}

impl BufferAllocator for FakeDisplay {
    type Buffer = FakeBuffer;

    fn allocate(&mut self, slot: SlotId, width: u32, height: u32) -> Result<FakeBuffer, AllocError> {
        if self.fail_allocations {
            return Err(AllocError::InvalidSize { width, height });
        }
        self.allocations += 1;
        Ok(FakeBuffer { slot, pixels: vec![0; (width * height * 4) as usize] })
    }
}

impl Display for FakeDisplay {
    type Handle = FakeHandle;

    fn dispatch_pending(&mut self, out: &mut Vec<Event<FakeHandle>>) -> Result<(), DisplayError> {
        out.append(&mut self.queue);
        Ok(())
    }

    fn prepare_read(&mut self) -> bool { self.queue.is_empty() }

    fn connection_fd(&self) -> Option<BorrowedFd<'_>> { None }

    fn read(&mut self) -> Result<(), DisplayError> {
        self.reads += 1;
        if let Some(mut batch) = self.on_read.pop_front() {
            self.queue.append(&mut batch);
        }
        Ok(())
    }

    fn cancel_read(&mut self) { self.cancelled_reads += 1; }

    fn flush(&mut self) -> Result<(), DisplayError> {
        match self.flush_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn submit(&mut self, buffer: &mut FakeBuffer, width: u32, height: u32, scale: i32) {
        self.submissions.push(Submission { slot: buffer.slot, width, height, scale });
    }

    fn activate(&mut self, window: &FakeHandle, seat: SeatId) { self.activations.push((window.id, seat)); }

    fn shutdown(&mut self) { self.shut_down = true; }
}

/// Returns the scripted readiness sets in order, then a termination signal.
#[derive(Default)]
pub struct ScriptedSources {
    pub script: VecDeque<Ready>,
    pub ticks_consumed: usize,
    pub waits: usize,
}

impl ScriptedSources {
    pub fn new(script: impl IntoIterator<Item = Ready>) -> Self {
        ScriptedSources { script: script.into_iter().collect(), ..Default::default() }
    }
}

impl EventSources for ScriptedSources {
    fn wait(&mut self, _protocol: Option<BorrowedFd<'_>>) -> nix::Result<Ready> {
        self.waits += 1;
        Ok(self.script.pop_front().unwrap_or(Ready::SIGNAL))
    }

    fn consume_clock_tick(&mut self) { self.ticks_consumed += 1; }
}

/// Every character is 7 pixels wide and a line is 12 pixels tall.
pub struct FixedWidthText;

impl TextMeasure for FixedWidthText {
    fn measure(&self, text: &str) -> TextSize {
        TextSize { width: 7 * text.chars().count() as i32, height: 12 }
    }
}

impl TextRenderer for FixedWidthText {
    fn draw(&self, _: &mut Canvas<'_>, _: &str, _: i32, _: i32, _: ClipRect, _: Color) {}
}
