//! The kiosk loop: input dispatch, playback lifecycle and frame pacing.

use anyhow::Result;
use common::{InputEvent, Key, MouseButton};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::Options;
use crate::decoder::MediaOpener;
use crate::log_and_continue;
use crate::playback::{Clock, PlaybackSession, SystemClock};
use crate::selector::{BackgroundSelector, MusicSelector, SelectorState};
use crate::surface::{DisplaySurface, InputSource};

/// What an input event asks the kiosk to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    RefreshBackground,
    TogglePlayback,
}

impl Action {
    pub fn from_event(event: InputEvent) -> Option<Self> {
        match event {
            InputEvent::Quit
            | InputEvent::KeyUp(Key::Escape)
            | InputEvent::MouseUp(MouseButton::Right) => Some(Self::Quit),
            InputEvent::KeyUp(Key::Space) | InputEvent::MouseUp(MouseButton::Left) => {
                Some(Self::RefreshBackground)
            }
            InputEvent::KeyUp(Key::Enter) => Some(Self::TogglePlayback),
            _ => None,
        }
    }
}

/// How the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The user asked to quit
    Quit,
    /// A termination signal arrived
    Interrupted,
}

/// Idle/playing controller, driven one tick at a time
pub struct Kiosk<O: MediaOpener> {
    music: MusicSelector,
    backgrounds: BackgroundSelector,
    selection: SelectorState,
    opener: O,
    clock: Rc<dyn Clock>,
    rng: StdRng,
    session: Option<PlaybackSession>,
    dirty: bool,
    done: bool,
    last_size: Option<(u32, u32)>,
}

impl<O: MediaOpener> Kiosk<O> {
    pub fn new(
        music: MusicSelector,
        backgrounds: BackgroundSelector,
        opener: O,
        clock: Rc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        Self {
            music,
            backgrounds,
            selection: SelectorState::default(),
            opener,
            clock,
            rng,
            session: None,
            dirty: false,
            done: false,
            last_size: None,
        }
    }

    /// Kiosk reading backgrounds and music from the resolved option paths
    pub fn from_options(options: &Options, opener: O) -> Self {
        let music_dirs = options.music_dirs();
        log::info!("Reading music from: {}", options.music_dir.display());
        log::debug!("Music directories: {:?}", music_dirs);

        Self::new(
            MusicSelector::new(music_dirs),
            BackgroundSelector::new(options.backgrounds_dir(), options.background_color),
            opener,
            Rc::new(SystemClock::new()),
            StdRng::from_os_rng(),
        )
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Draw the first background and show it
    pub fn start(&mut self, surface: &mut dyn DisplaySurface) -> Result<()> {
        self.redraw_background(surface);
        self.last_size = Some(surface.size());
        surface.present()?;
        self.dirty = false;
        Ok(())
    }

    pub fn handle_event(&mut self, event: InputEvent, surface: &mut dyn DisplaySurface) {
        match Action::from_event(event) {
            Some(Action::Quit) => {
                log::debug!("Quit requested by {:?}", event);
                self.done = true;
            }
            Some(Action::RefreshBackground) => self.redraw_background(surface),
            Some(Action::TogglePlayback) => self.toggle_playback(),
            None => log::trace!("Ignoring {:?}", event),
        }
    }

    /// Advance playback and present the surface if anything changed
    pub fn tick(&mut self, surface: &mut dyn DisplaySurface) -> Result<()> {
        let size = surface.size();

        if let Some(session) = self.session.as_mut() {
            if !session.has_finished() {
                self.dirty = session.advance(surface);
            }
            if session.has_finished() {
                log::info!(
                    "Finished: {} ({} frames)",
                    session.path().display(),
                    session.stats().frames_shown
                );
                self.session = None;
                self.redraw_background(surface);
            }
        } else if self.last_size.is_some_and(|last| last != size) {
            log::debug!("Surface resized to {}x{}", size.0, size.1);
            self.redraw_background(surface);
        }
        self.last_size = Some(size);

        if self.dirty {
            surface.present()?;
            self.dirty = false;
        }

        Ok(())
    }

    /// Stop any active playback
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    fn redraw_background(&mut self, surface: &mut dyn DisplaySurface) {
        log_and_continue!(
            self.backgrounds
                .choose(surface, &mut self.selection, &mut self.rng),
            "draw background"
        );
        self.dirty = true;
    }

    fn toggle_playback(&mut self) {
        match self.session.as_mut() {
            Some(session) => session.stop(),
            None => self.start_playback(),
        }
    }

    fn start_playback(&mut self) {
        let path = match self.music.choose(&mut self.selection, &mut self.rng) {
            Ok(path) => path,
            Err(e) => {
                log::error!("{}", e);
                return;
            }
        };

        match self.opener.open(&path) {
            Ok(decoder) => {
                log::info!("Playing: {}", path.display());
                self.session = Some(PlaybackSession::new(path, decoder, Rc::clone(&self.clock)));
            }
            Err(e) => log::error!("Failed to open {}: {:#}", path.display(), e),
        }
    }
}

/// Sleeps so that ticks happen at most `fps` times per second
#[derive(Debug)]
pub struct FrameLimiter {
    frame: Option<Duration>,
    last: Option<Instant>,
}

impl FrameLimiter {
    /// `fps` of 0 means unbounded
    pub fn new(fps: u32) -> Self {
        Self {
            frame: (fps > 0).then(|| Duration::from_secs(1) / fps),
            last: None,
        }
    }

    pub fn frame_duration(&self) -> Option<Duration> {
        self.frame
    }

    /// Wait for the next tick boundary. Returns the time since the previous tick.
    pub fn tick(&mut self) -> Duration {
        if let (Some(frame), Some(last)) = (self.frame, self.last) {
            let elapsed = last.elapsed();
            if elapsed < frame {
                std::thread::sleep(frame - elapsed);
            }
        }

        let now = Instant::now();
        let since = self.last.map(|last| now - last).unwrap_or_default();
        self.last = Some(now);
        since
    }
}

/// Run the kiosk on `window` until the user quits or `interrupted` is set
pub fn run<W, O>(
    window: &mut W,
    kiosk: &mut Kiosk<O>,
    fps: u32,
    interrupted: &AtomicBool,
) -> Result<RunOutcome>
where
    W: DisplaySurface + InputSource,
    O: MediaOpener,
{
    let mut limiter = FrameLimiter::new(fps);
    log::debug!("Frame limit: {:?}", limiter.frame_duration());
    kiosk.start(window)?;

    loop {
        if interrupted.load(Ordering::Relaxed) {
            kiosk.shutdown();
            return Ok(RunOutcome::Interrupted);
        }

        for event in window.poll_events()? {
            kiosk.handle_event(event, window);
        }
        if kiosk.is_done() {
            kiosk.shutdown();
            return Ok(RunOutcome::Quit);
        }

        kiosk.tick(window)?;
        limiter.tick();
    }
}
