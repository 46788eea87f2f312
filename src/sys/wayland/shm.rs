use std::fs::File;
use std::os::fd::AsFd;

use memmap2::MmapMut;
use wayland_client::QueueHandle;
use wayland_client::protocol::{wl_buffer, wl_shm};

use super::State;
use crate::sys::surface_pool::{AllocError, PixelBuffer, SlotId};

/// An ARGB8888 `wl_buffer` over an unlinked temporary file.
pub struct ShmBuffer {
    buffer: wl_buffer::WlBuffer,
    mmap: MmapMut,
    _file: File,
}

impl ShmBuffer {
    pub(super) fn new(
        shm: &wl_shm::WlShm,
        qh: &QueueHandle<State>,
        slot: SlotId,
        width: u32,
        height: u32,
    ) -> Result<Self, AllocError> {
        let invalid = || AllocError::InvalidSize { width, height };
        let stride = width.checked_mul(4).ok_or_else(invalid)?;
        let size = stride.checked_mul(height).ok_or_else(invalid)?;
        let (width_i, height_i, stride_i, size_i) = (
            i32::try_from(width).map_err(|_| invalid())?,
            i32::try_from(height).map_err(|_| invalid())?,
            i32::try_from(stride).map_err(|_| invalid())?,
            i32::try_from(size).map_err(|_| invalid())?,
        );

        let file = tempfile::tempfile()?;
        file.set_len(u64::from(size))?;
        // SAFETY: the file is private to this process and is never truncated
        // while the mapping lives.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let pool = shm.create_pool(file.as_fd(), size_i, qh, ());
        let buffer =
            pool.create_buffer(0, width_i, height_i, stride_i, wl_shm::Format::Argb8888, qh, slot);
        pool.destroy();

        Ok(ShmBuffer { buffer, mmap, _file: file })
    }

    pub fn wl_buffer(&self) -> &wl_buffer::WlBuffer { &self.buffer }
}

impl PixelBuffer for ShmBuffer {
    fn pixels(&mut self) -> &mut [u8] { &mut self.mmap }
}

impl Drop for ShmBuffer {
    fn drop(&mut self) { self.buffer.destroy(); }
}
