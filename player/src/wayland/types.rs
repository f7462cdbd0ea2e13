//! Window state and its [`DisplaySurface`] / [`InputSource`] front.

use anyhow::{Context, Result};
use common::{Color, InputEvent};
use image::RgbaImage;
use smithay_client_toolkit::{
    compositor::CompositorState,
    output::OutputState,
    registry::RegistryState,
    seat::SeatState,
    shell::{WaylandSurface, xdg::window::Window},
    shm::Shm,
};
use wayland_client::{
    EventQueue, QueueHandle,
    backend::WaylandError,
    protocol::{wl_keyboard, wl_pointer},
};

use crate::buffer::ShmBuffer;
use crate::surface::{Canvas, DisplaySurface, InputSource};

/// Buffers kept around waiting for the compositor to release them
const MAX_POOL_SIZE: usize = 3;

/// Wayland protocol state for the kiosk window.
///
/// Input handlers push into `pending_events`; the kiosk loop drains them once
/// per tick.
pub struct KioskWindow {
    pub(super) registry_state: RegistryState,
    #[allow(dead_code)] // Keeps the wl_compositor binding alive
    pub(super) compositor_state: CompositorState,
    pub(super) output_state: OutputState,
    pub(super) seat_state: SeatState,
    pub(super) shm: Shm,
    pub(super) window: Window,
    pub(super) keyboard: Option<wl_keyboard::WlKeyboard>,
    pub(super) pointer: Option<wl_pointer::WlPointer>,
    pub(super) canvas: Canvas,
    pub(super) background_color: Color,
    /// Window size to use when the compositor leaves the choice to us
    pub(super) fallback_size: (u32, u32),
    pub(super) configured: bool,
    pub(super) pending_events: Vec<InputEvent>,
    /// Current buffer + buffers possibly still held by the compositor
    pub(super) buffer_pool: Vec<ShmBuffer>,
}

impl KioskWindow {
    /// A released buffer matching the canvas size, or a new one
    fn take_buffer(&mut self, qh: &QueueHandle<Self>) -> Result<ShmBuffer> {
        let (width, height) = self.canvas.size();

        if let Some(index) = self
            .buffer_pool
            .iter()
            .position(|buf| buf.width() == width && buf.height() == height && buf.is_released())
        {
            return Ok(self.buffer_pool.swap_remove(index));
        }

        log::debug!("Creating new buffer ({}x{})", width, height);
        ShmBuffer::new(self.shm.wl_shm(), width, height, qh)
    }

    /// Drop released buffers beyond the pool limit
    fn cleanup_buffer_pool(&mut self) {
        let (width, height) = self.canvas.size();
        self.buffer_pool
            .retain(|buf| !buf.is_released() || (buf.width() == width && buf.height() == height));

        let mut to_remove = self.buffer_pool.len().saturating_sub(MAX_POOL_SIZE);
        self.buffer_pool.retain(|buf| {
            if to_remove > 0 && buf.is_released() {
                to_remove -= 1;
                false
            } else {
                true
            }
        });

        if self.buffer_pool.len() > MAX_POOL_SIZE {
            log::warn!(
                "Buffer pool has {} busy buffers (max: {}), compositor is not releasing them",
                self.buffer_pool.len(),
                MAX_POOL_SIZE
            );
        }
    }

    /// Copy the canvas into a buffer and commit it
    fn commit_canvas(&mut self, qh: &QueueHandle<Self>) -> Result<()> {
        let mut buffer = self.take_buffer(qh)?;
        buffer.write_canvas(&self.canvas)?;

        let surface = self.window.wl_surface();
        surface.attach(Some(buffer.buffer()), 0, 0);
        surface.damage_buffer(0, 0, buffer.width() as i32, buffer.height() as i32);
        surface.commit();
        buffer.mark_busy();

        self.buffer_pool.push(buffer);
        self.cleanup_buffer_pool();
        Ok(())
    }
}

/// The kiosk window together with its event queue
pub struct WaylandKiosk {
    pub(super) event_queue: EventQueue<KioskWindow>,
    pub(super) state: KioskWindow,
}

impl DisplaySurface for WaylandKiosk {
    fn size(&self) -> (u32, u32) {
        self.state.canvas.size()
    }

    fn fill(&mut self, color: Color) {
        self.state.canvas.fill(color);
    }

    fn blit(&mut self, image: &RgbaImage, x: i64, y: i64) {
        self.state.canvas.blit(image, x, y);
    }

    fn present(&mut self) -> Result<()> {
        let qh = self.event_queue.handle();
        self.state.commit_canvas(&qh)?;
        self.state.canvas.present()?;
        self.event_queue
            .flush()
            .context("Failed to flush Wayland requests")
    }
}

impl InputSource for WaylandKiosk {
    fn poll_events(&mut self) -> Result<Vec<InputEvent>> {
        self.event_queue
            .flush()
            .context("Failed to flush Wayland requests")?;

        if let Some(guard) = self.event_queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e).context("Failed to read Wayland events"),
            }
        }

        self.event_queue
            .dispatch_pending(&mut self.state)
            .context("Failed to dispatch Wayland events")?;

        Ok(std::mem::take(&mut self.state.pending_events))
    }
}
