use std::io;
use std::os::fd::BorrowedFd;

use thiserror::Error;

use super::event::{Event, SeatId};
use super::surface_pool::BufferAllocator;
use crate::model::WindowHandle;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("operation would block")]
    WouldBlock,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
}

impl DisplayError {
    pub fn is_would_block(&self) -> bool {
        match self {
            DisplayError::WouldBlock => true,
            DisplayError::Io(err) => err.kind() == io::ErrorKind::WouldBlock,
            DisplayError::Protocol(_) => false,
        }
    }
}

/// The compositor connection as seen by the run loop.
///
/// Reading follows a two-phase protocol: [`prepare_read`] announces the
/// intent, and exactly one of [`read`] or [`cancel_read`] completes it.
///
/// [`prepare_read`]: Display::prepare_read
/// [`read`]: Display::read
/// [`cancel_read`]: Display::cancel_read
pub trait Display: BufferAllocator {
    type Handle: WindowHandle;

    /// Dispatches already queued protocol messages and appends the resulting
    /// events to `out`.
    fn dispatch_pending(&mut self, out: &mut Vec<Event<Self::Handle>>) -> Result<(), DisplayError>;

    /// Returns false if events are still queued; dispatch them first.
    fn prepare_read(&mut self) -> bool;

    fn connection_fd(&self) -> Option<BorrowedFd<'_>>;

    fn read(&mut self) -> Result<(), DisplayError>;

    fn cancel_read(&mut self);

    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Attaches `buffer` to the panel surface and commits.
    fn submit(&mut self, buffer: &mut Self::Buffer, width: u32, height: u32, scale: i32);

    fn activate(&mut self, window: &Self::Handle, seat: SeatId);

    /// Destroys protocol objects. Called once, after windows and buffers are
    /// gone.
    fn shutdown(&mut self);
}
