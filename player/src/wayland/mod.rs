//! Wayland window integration
//!
//! - types: window state and the `DisplaySurface`/`InputSource` implementation
//! - event_handlers: Wayland protocol event handlers (window, seat, buffers)

mod event_handlers;
mod types;

use anyhow::{Context, Result};
use smithay_client_toolkit::{
    compositor::CompositorState,
    output::OutputState,
    registry::RegistryState,
    seat::SeatState,
    shell::{
        WaylandSurface,
        xdg::{XdgShell, window::WindowDecorations},
    },
    shm::Shm,
};
use wayland_client::{Connection, globals::registry_queue_init};

use crate::config::{Options, SLUG};
use crate::surface::Canvas;

pub use types::WaylandKiosk;
pub(crate) use types::KioskWindow;

/// Connect to the compositor and open the kiosk window.
///
/// Returns once the compositor has configured the window, so the surface
/// already has its final size.
pub fn connect(options: &Options) -> Result<WaylandKiosk> {
    log::info!("Connecting to Wayland compositor...");

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland compositor")?;
    let (globals, mut event_queue) =
        registry_queue_init(&conn).context("Failed to initialize Wayland registry")?;
    let qh = event_queue.handle();

    let compositor_state =
        CompositorState::bind(&globals, &qh).context("wl_compositor not available")?;
    let xdg_shell = XdgShell::bind(&globals, &qh).context("xdg_wm_base not available")?;
    let shm = Shm::bind(&globals, &qh).context("wl_shm not available")?;

    let surface = compositor_state.create_surface(&qh);
    let window = xdg_shell.create_window(surface, WindowDecorations::RequestServer, &qh);
    window.set_title(options.caption.clone());
    window.set_app_id(SLUG);
    if options.fullscreen {
        window.set_fullscreen(None);
    }
    window.commit();

    let (width, height) = options.screen_size;
    let mut state = KioskWindow {
        registry_state: RegistryState::new(&globals),
        compositor_state,
        output_state: OutputState::new(&globals, &qh),
        seat_state: SeatState::new(&globals, &qh),
        shm,
        window,
        keyboard: None,
        pointer: None,
        canvas: Canvas::new(width, height, options.background_color),
        background_color: options.background_color,
        fallback_size: options.screen_size,
        configured: false,
        pending_events: Vec::new(),
        buffer_pool: Vec::new(),
    };

    log::info!("Connected to Wayland compositor");

    while !state.configured {
        event_queue
            .blocking_dispatch(&mut state)
            .context("Wayland connection lost before the window was configured")?;
    }

    Ok(WaylandKiosk { event_queue, state })
}
