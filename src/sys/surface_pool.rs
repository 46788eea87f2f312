use std::io;

use thiserror::Error;
use tracing::{debug, error, trace, warn};

pub const POOL_SIZE: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("invalid buffer size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("shared memory: {0}")]
    Io(#[from] io::Error),
}

/// Pixel memory that can be handed to the compositor.
pub trait PixelBuffer {
    fn pixels(&mut self) -> &mut [u8];
}

pub trait BufferAllocator {
    type Buffer: PixelBuffer;

    fn allocate(&mut self, slot: SlotId, width: u32, height: u32)
    -> Result<Self::Buffer, AllocError>;
}

struct Allocated<B> {
    buffer: B,
    width: u32,
    height: u32,
}

/// Two reusable buffers. A busy buffer is never handed out until the
/// compositor releases it.
pub struct SurfacePool<B> {
    buffers: [Option<Allocated<B>>; POOL_SIZE],
    busy: [bool; POOL_SIZE],
}

impl<B> Default for SurfacePool<B> {
    fn default() -> Self { SurfacePool { buffers: Default::default(), busy: [false; POOL_SIZE] } }
}

/// Exclusive access to one free buffer for the duration of a frame. Only
/// [`Lease::submit`] marks the buffer busy; dropping the lease leaves it free.
pub struct Lease<'a, B> {
    id: SlotId,
    allocated: &'a mut Allocated<B>,
    busy: &'a mut bool,
}

impl<'a, B: PixelBuffer> Lease<'a, B> {
    pub fn id(&self) -> SlotId { self.id }

    pub fn buffer(&mut self) -> &mut B { &mut self.allocated.buffer }

    pub fn pixels(&mut self) -> &mut [u8] { self.allocated.buffer.pixels() }

    pub fn submit(self) {
        trace!(slot = ?self.id, "buffer submitted");
        *self.busy = true;
    }
}

impl<B: PixelBuffer> SurfacePool<B> {
    pub fn new() -> Self { Self::default() }

    /// Hands out a free buffer of exactly `width × height`, reallocating it if
    /// its size changed. Returns `None` when both buffers are busy or the
    /// allocation failed; the frame is dropped in that case.
    pub fn acquire<A>(&mut self, alloc: &mut A, width: u32, height: u32) -> Option<Lease<'_, B>>
    where
        A: BufferAllocator<Buffer = B>,
    {
        if width == 0 || height == 0 {
            warn!(width, height, "refusing to allocate an empty buffer");
            return None;
        }
        let Some(index) = self.busy.iter().rposition(|busy| !busy) else {
            debug!("no free buffer, dropping frame");
            return None;
        };
        let id = SlotId(index);
        let slot = &mut self.buffers[index];

        let reuse = slot.as_ref().is_some_and(|a| a.width == width && a.height == height);
        if !reuse {
            // The old memory goes before the new is mapped.
            *slot = None;
            match alloc.allocate(id, width, height) {
                Ok(buffer) => {
                    debug!(?id, width, height, "allocated buffer");
                    *slot = Some(Allocated { buffer, width, height });
                }
                Err(err) => {
                    error!(?id, width, height, "failed to allocate buffer: {err}");
                    return None;
                }
            }
        }

        let allocated = slot.as_mut()?;
        Some(Lease { id, allocated, busy: &mut self.busy[index] })
    }

    /// Marks the buffer free again once the compositor stopped reading it.
    pub fn release(&mut self, id: SlotId) {
        match self.busy.get_mut(id.0) {
            Some(busy) => *busy = false,
            None => warn!(?id, "release for unknown buffer"),
        }
    }

    pub fn is_busy(&self, id: SlotId) -> bool { self.busy.get(id.0).copied().unwrap_or(false) }

    pub fn has_free(&self) -> bool { self.busy.iter().any(|busy| !busy) }

    /// Drops every buffer.
    pub fn clear(&mut self) {
        self.buffers = Default::default();
        self.busy = [false; POOL_SIZE];
    }
}
