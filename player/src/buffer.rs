use anyhow::{Context, Result};
use std::os::fd::AsFd;
use std::sync::{Arc, Mutex};
use wayland_client::protocol::{wl_buffer, wl_shm, wl_shm_pool};
use wayland_client::{Dispatch, QueueHandle};

use crate::surface::Canvas;

/// Release tracking, shared with the `wl_buffer` event handler
#[derive(Debug, Default)]
pub struct BufferState {
    pub busy: bool,
}

pub type SharedBufferState = Arc<Mutex<BufferState>>;

/// Helper for creating and managing shared memory buffers for Wayland
pub struct ShmBuffer {
    pool: wl_shm_pool::WlShmPool,
    buffer: wl_buffer::WlBuffer,
    mmap: memmap2::MmapMut,
    width: u32,
    height: u32,
    state: SharedBufferState,
}

impl ShmBuffer {
    pub fn new<D>(
        shm: &wl_shm::WlShm,
        width: u32,
        height: u32,
        qh: &QueueHandle<D>,
    ) -> Result<Self>
    where
        D: Dispatch<wl_shm_pool::WlShmPool, ()>
            + Dispatch<wl_buffer::WlBuffer, SharedBufferState>
            + 'static,
    {
        let stride = width.checked_mul(4).context("Buffer too wide")?; // ARGB8888
        let size = stride.checked_mul(height).context("Buffer too large")?;
        let pool_size = i32::try_from(size).context("Buffer too large for wl_shm")?;

        // Create a temporary file for shared memory
        let file = tempfile::tempfile().context("Failed to create shm file")?;
        file.set_len(size as u64)?;

        // Memory map the file
        let mmap = unsafe { memmap2::MmapMut::map_mut(&file)? };

        let pool = shm.create_pool(file.as_fd(), pool_size, qh, ());

        let state = SharedBufferState::default();
        let buffer = pool.create_buffer(
            0,
            width as i32,
            height as i32,
            stride as i32,
            wl_shm::Format::Argb8888,
            qh,
            Arc::clone(&state),
        );

        Ok(Self {
            pool,
            buffer,
            mmap,
            width,
            height,
            state,
        })
    }

    /// Copy the canvas into the buffer. Sizes must match.
    pub fn write_canvas(&mut self, canvas: &Canvas) -> Result<()> {
        let (width, height) = canvas.pixels().dimensions();
        if (width, height) != (self.width, self.height) {
            anyhow::bail!(
                "Canvas size mismatch: buffer is {}x{}, canvas is {}x{}",
                self.width,
                self.height,
                width,
                height
            );
        }

        canvas.write_argb8888(&mut self.mmap);
        Ok(())
    }

    pub fn buffer(&self) -> &wl_buffer::WlBuffer {
        &self.buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Mark as in use by the compositor (call after attach)
    pub fn mark_busy(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.busy = true;
        }
    }

    /// Whether the compositor released the buffer
    pub fn is_released(&self) -> bool {
        self.state.lock().map(|state| !state.busy).unwrap_or(false)
    }
}

impl Drop for ShmBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.pool.destroy();
    }
}
