//! Video playback state machine.
//!
//! A [`PlaybackSession`] owns one decoder and is driven once per tick by the
//! kiosk loop. Each call to [`PlaybackSession::advance`] either fetches a
//! frame, waits for its presentation deadline, or shows it. End of stream,
//! decode errors and render errors all finish the session; nothing is
//! propagated to the caller.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::decoder::{DecodedFrame, FrameFetch, MediaDecoder};
use crate::presenter;
use crate::stats::PlaybackStats;
use crate::surface::DisplaySurface;

const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Monotonic time source for presentation deadlines
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Waiting for the decoder to hand over a frame
    AwaitingFrame,
    /// Holding a frame until its deadline
    ScheduledWait,
    /// Holding a frame that is due
    ReadyToDisplay,
    Finished,
}

/// One run of video playback from start to finish or stop
pub struct PlaybackSession {
    path: PathBuf,
    decoder: Option<Box<dyn MediaDecoder>>,
    pending: Option<DecodedFrame>,
    deadline: Option<Duration>,
    state: PlaybackState,
    clock: Rc<dyn Clock>,
    stats: PlaybackStats,
}

impl PlaybackSession {
    pub fn new(
        path: impl Into<PathBuf>,
        decoder: Box<dyn MediaDecoder>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let stats = PlaybackStats::new(clock.now());
        Self {
            path: path.into(),
            decoder: Some(decoder),
            pending: None,
            deadline: None,
            state: PlaybackState::AwaitingFrame,
            clock,
            stats,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_finished(&self) -> bool {
        self.state == PlaybackState::Finished
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    /// Drive the session for one tick.
    ///
    /// Returns true only if a frame was drawn on `surface`. Never blocks.
    pub fn advance(&mut self, surface: &mut dyn DisplaySurface) -> bool {
        loop {
            match self.state {
                PlaybackState::Finished => return false,
                PlaybackState::AwaitingFrame => {
                    if !self.fetch() {
                        return false;
                    }
                }
                PlaybackState::ScheduledWait => {
                    if self.deadline.is_some_and(|deadline| self.clock.now() < deadline) {
                        return false;
                    }
                    self.state = PlaybackState::ReadyToDisplay;
                }
                PlaybackState::ReadyToDisplay => return self.display(surface),
            }
        }
    }

    /// Ask the decoder for a frame. Returns true if the frame is due now.
    fn fetch(&mut self) -> bool {
        let Some(decoder) = self.decoder.as_mut() else {
            self.finish();
            return false;
        };

        match decoder.next_frame() {
            FrameFetch::Pending => false,
            FrameFetch::EndOfStream => {
                log::debug!("End of stream: {}", self.path.display());
                self.finish();
                false
            }
            FrameFetch::Error(e) => {
                log::error!("Failed to decode {}: {}", self.path.display(), e);
                self.finish();
                false
            }
            FrameFetch::Frame(frame) => {
                let delay = frame.delay;
                self.pending = Some(frame);

                if delay > 0.0 {
                    let wait = Duration::try_from_secs_f64(delay).unwrap_or(Duration::MAX);
                    self.deadline = Some(self.clock.now().saturating_add(wait));
                    self.state = PlaybackState::ScheduledWait;
                    false
                } else {
                    self.deadline = None;
                    self.state = PlaybackState::ReadyToDisplay;
                    true
                }
            }
        }
    }

    fn display(&mut self, surface: &mut dyn DisplaySurface) -> bool {
        let late = self.deadline.take().is_none();
        let Some(frame) = self.pending.take() else {
            self.state = PlaybackState::AwaitingFrame;
            return false;
        };

        match presenter::present_frame(surface, &frame) {
            Ok(()) => {
                self.stats.record_shown(late);
                self.stats.maybe_log_stats(self.clock.now(), STATS_INTERVAL);
                self.state = PlaybackState::AwaitingFrame;
                true
            }
            Err(e) => {
                log::error!("Failed to render frame of {}: {:#}", self.path.display(), e);
                self.finish();
                false
            }
        }
    }

    /// Stop playback and release the decoder. Idempotent.
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Finished {
            log::debug!("Stopping {}", self.path.display());
        }
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.close();
        }
        self.pending = None;
        self.deadline = None;

        if self.state != PlaybackState::Finished {
            self.state = PlaybackState::Finished;
            self.stats.log_summary(self.clock.now());
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.close();
        }
    }
}
