//! Playback statistics tracking
//!
//! Counts frames shown by a session and how many of them arrived late, and
//! logs a summary when the session ends.

use std::time::Duration;

/// Tracks statistics for one playback session
#[derive(Debug, Clone)]
pub struct PlaybackStats {
    /// Frames blitted to the surface
    pub(crate) frames_shown: u64,

    /// Frames whose presentation time had already passed when decoded
    pub(crate) frames_late: u64,

    /// Session clock reading when playback started
    started: Duration,

    /// Session clock reading when stats were last logged
    last_stats_log: Duration,
}

impl PlaybackStats {
    pub fn new(started: Duration) -> Self {
        Self {
            frames_shown: 0,
            frames_late: 0,
            started,
            last_stats_log: started,
        }
    }

    pub fn record_shown(&mut self, late: bool) {
        self.frames_shown += 1;
        if late {
            self.frames_late += 1;
        }
    }

    /// Share of late frames as a percentage
    pub fn late_rate(&self) -> f64 {
        if self.frames_shown == 0 {
            0.0
        } else {
            (self.frames_late as f64 / self.frames_shown as f64) * 100.0
        }
    }

    /// Average displayed frames per second since start
    pub fn average_fps(&self, now: Duration) -> f64 {
        let elapsed = now.saturating_sub(self.started).as_secs_f64();
        if elapsed <= 0.0 {
            0.0
        } else {
            self.frames_shown as f64 / elapsed
        }
    }

    /// Log statistics at debug level if `interval` has elapsed
    pub fn maybe_log_stats(&mut self, now: Duration, interval: Duration) {
        if now.saturating_sub(self.last_stats_log) < interval {
            return;
        }

        log::debug!(
            "Playback stats ({:.2} fps): {} shown, {} late ({:.1}%)",
            self.average_fps(now),
            self.frames_shown,
            self.frames_late,
            self.late_rate()
        );

        self.last_stats_log = now;
    }

    /// Final summary line
    pub fn log_summary(&self, now: Duration) {
        log::info!(
            "Playback ended after {:.1}s: {} frames shown, {} late ({:.1}%)",
            now.saturating_sub(self.started).as_secs_f64(),
            self.frames_shown,
            self.frames_late,
            self.late_rate()
        );
    }
}
