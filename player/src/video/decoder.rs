//! GStreamer-backed [`MediaDecoder`]

use anyhow::Result;
use common::{PixelFormat, VideokeError};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::path::Path;
use std::sync::Arc;

use super::pipeline::{self, StreamTracks};
use crate::decoder::{DecodeError, DecodedFrame, FrameFetch, MediaDecoder, MediaOpener};

/// Bounded wait for the pipeline to reach `Null` on close
const TEARDOWN_TIMEOUT: gst::ClockTime = gst::ClockTime::from_seconds(2);

/// Frame interval assumed until the caps report a frame rate
const DEFAULT_FRAME_DURATION: f64 = 1.0 / 30.0;

/// Replace `frame` with newer queued frames while it is more than `tolerance`
/// seconds late. Stops at the first frame within tolerance or when nothing
/// else is queued. Returns the frame to show and how many were skipped.
pub(super) fn skip_stale<F>(
    mut frame: DecodedFrame,
    tolerance: f64,
    mut next: F,
) -> Result<(DecodedFrame, u64), DecodeError>
where
    F: FnMut() -> Option<Result<DecodedFrame, DecodeError>>,
{
    let mut skipped = 0;
    while frame.delay < -tolerance {
        match next() {
            Some(Ok(newer)) => {
                frame = newer;
                skipped += 1;
            }
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }
    Ok((frame, skipped))
}

fn frame_duration(info: &gst_video::VideoInfo) -> f64 {
    let fps = info.fps();
    if fps.numer() > 0 && fps.denom() > 0 {
        fps.denom() as f64 / fps.numer() as f64
    } else {
        DEFAULT_FRAME_DURATION
    }
}

/// Decodes one file. Never blocks in [`MediaDecoder::next_frame`].
pub struct GstDecoder {
    pipeline: gst::Pipeline,
    app_sink: gst_app::AppSink,
    bus: Option<gst::Bus>,
    tracks: Arc<StreamTracks>,
    caps_logged: bool,
    /// Seconds per frame, from the negotiated caps
    frame_duration: f64,
    frames_skipped: u64,
    closed: bool,
}

impl GstDecoder {
    /// Build the pipeline for `path` and start playing it
    pub fn open(path: &Path) -> Result<Self> {
        let (pipeline, app_sink, tracks) = pipeline::build_pipeline(path)?;
        let bus = pipeline.bus();

        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let _ = pipeline.set_state(gst::State::Null);
            anyhow::bail!("Failed to start pipeline for {}: {:?}", path.display(), e);
        }

        Ok(Self {
            pipeline,
            app_sink,
            bus,
            tracks,
            caps_logged: false,
            frame_duration: DEFAULT_FRAME_DURATION,
            frames_skipped: 0,
            closed: false,
        })
    }

    /// Surface pipeline errors posted since the last call
    fn check_bus(&self) -> Option<DecodeError> {
        let bus = self.bus.as_ref()?;

        while let Some(msg) = bus.pop() {
            match msg.view() {
                gst::MessageView::Error(err) => {
                    let source_name = err
                        .src()
                        .map(|s| s.path_string().to_string())
                        .unwrap_or_else(|| "pipeline".to_string());
                    if let Some(debug) = err.debug() {
                        log::debug!("GStreamer debug info: {}", debug);
                    }
                    return Some(DecodeError::Stream {
                        source_name,
                        message: err.error().to_string(),
                    });
                }
                gst::MessageView::Warning(warning) => {
                    log::warn!("GStreamer warning: {}", warning.error());
                }
                gst::MessageView::Eos(_) => {
                    log::debug!("Pipeline reached end of stream");
                }
                _ => {}
            }
        }

        None
    }

    fn sample_to_frame(&mut self, sample: &gst::Sample) -> Result<DecodedFrame, DecodeError> {
        let caps = sample
            .caps()
            .ok_or_else(|| DecodeError::Frame("sample has no caps".to_string()))?;
        let info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|e| DecodeError::Frame(format!("unreadable caps: {}", e)))?;
        let buffer = sample
            .buffer()
            .ok_or_else(|| DecodeError::Frame("sample has no buffer".to_string()))?;
        let map = buffer
            .map_readable()
            .map_err(|e| DecodeError::Frame(format!("buffer not readable: {}", e)))?;

        if !self.caps_logged {
            pipeline::log_stream_info(&info);
            self.frame_duration = frame_duration(&info);
            self.caps_logged = true;
        }

        let offset = info.offset()[0];
        let stride = usize::try_from(info.stride()[0])
            .map_err(|_| DecodeError::Frame("negative stride".to_string()))?;
        let data = map
            .as_slice()
            .get(offset..)
            .ok_or_else(|| DecodeError::Frame("plane offset past buffer end".to_string()))?;

        Ok(DecodedFrame {
            data: data.to_vec(),
            format: PixelFormat::from_name(&info.format().to_string()),
            width: info.width(),
            height: info.height(),
            stride,
            delay: self.delay_for(sample, buffer.pts()),
        })
    }

    /// Seconds until `pts` is due on the pipeline clock; 0 when unknown
    fn delay_for(&self, sample: &gst::Sample, pts: Option<gst::ClockTime>) -> f64 {
        let Some(pts) = pts else {
            return 0.0;
        };
        let due = sample
            .segment()
            .and_then(|segment| segment.downcast_ref::<gst::ClockTime>())
            .and_then(|segment| segment.to_running_time(pts))
            .unwrap_or(pts);
        let Some(now) = self.pipeline.current_running_time() else {
            return 0.0;
        };

        (due.nseconds() as f64 - now.nseconds() as f64) / 1_000_000_000.0
    }
}

impl MediaDecoder for GstDecoder {
    fn next_frame(&mut self) -> FrameFetch {
        if self.closed {
            return FrameFetch::Error(DecodeError::Stopped);
        }
        if let Some(error) = self.check_bus().or_else(|| self.tracks.missing_video()) {
            return FrameFetch::Error(error);
        }

        let Some(sample) = self.app_sink.try_pull_sample(gst::ClockTime::ZERO) else {
            return if self.app_sink.is_eos() {
                FrameFetch::EndOfStream
            } else {
                FrameFetch::Pending
            };
        };
        let frame = match self.sample_to_frame(&sample) {
            Ok(frame) => frame,
            Err(e) => return FrameFetch::Error(e),
        };

        // Catch up with the audio clock instead of showing every late frame
        let tolerance = self.frame_duration;
        let result = skip_stale(frame, tolerance, || {
            self.app_sink
                .try_pull_sample(gst::ClockTime::ZERO)
                .map(|sample| self.sample_to_frame(&sample))
        });

        match result {
            Ok((frame, skipped)) => {
                if skipped > 0 {
                    log::trace!("Skipped {} late frames", skipped);
                    self.frames_skipped += skipped;
                }
                FrameFetch::Frame(frame)
            }
            Err(e) => FrameFetch::Error(e),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.frames_skipped > 0 {
            log::debug!("Skipped {} late frames in total", self.frames_skipped);
        }

        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            log::warn!("Failed to stop pipeline: {:?}", e);
            return;
        }
        let (result, state, _) = self.pipeline.state(TEARDOWN_TIMEOUT);
        if result.is_err() || state != gst::State::Null {
            log::warn!("Pipeline did not stop cleanly (state {:?})", state);
        }
        log::debug!("Pipeline stopped");
    }
}

impl Drop for GstDecoder {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens files with [`GstDecoder`]
pub struct GstOpener;

impl GstOpener {
    pub fn new() -> Result<Self> {
        pipeline::initialize_gstreamer()?;
        Ok(Self)
    }
}

impl MediaOpener for GstOpener {
    fn open(&mut self, path: &Path) -> Result<Box<dyn MediaDecoder>> {
        let decoder = GstDecoder::open(path)
            .map_err(|e| VideokeError::Video(format!("{}: {:#}", path.display(), e)))?;
        Ok(Box::new(decoder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::testing::solid_frame;
    use std::collections::VecDeque;

    const FRAME: f64 = 0.04;

    fn queue(delays: &[f64]) -> VecDeque<Result<DecodedFrame, DecodeError>> {
        delays
            .iter()
            .enumerate()
            .map(|(i, &delay)| Ok(solid_frame(1, 1, [i as u8, 0, 0], delay)))
            .collect()
    }

    #[test]
    fn test_late_frames_are_skipped() {
        let mut queued = queue(&[-0.3, -0.01, 0.02]);
        let first = solid_frame(1, 1, [9, 0, 0], -0.5);

        let (frame, skipped) = skip_stale(first, FRAME, || queued.pop_front()).unwrap();
        assert_eq!(skipped, 2);
        assert_eq!(frame.delay, -0.01);
        assert_eq!(queued.len(), 1);
    }

    #[test]
    fn test_slightly_late_frame_is_kept() {
        let mut queued = queue(&[0.0]);
        let first = solid_frame(1, 1, [9, 0, 0], -0.02);

        let (frame, skipped) = skip_stale(first, FRAME, || queued.pop_front()).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(frame.delay, -0.02);
        assert_eq!(queued.len(), 1);
    }

    #[test]
    fn test_stale_frame_shown_when_nothing_newer() {
        let first = solid_frame(1, 1, [9, 0, 0], -1.0);
        let (frame, skipped) = skip_stale(first, FRAME, || None).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(frame.delay, -1.0);
    }

    #[test]
    fn test_error_while_catching_up() {
        let mut queued: VecDeque<_> = [Err(DecodeError::Frame("bad caps".to_string()))].into();
        let first = solid_frame(1, 1, [9, 0, 0], -1.0);

        let result = skip_stale(first, FRAME, || queued.pop_front());
        assert_eq!(result.unwrap_err(), DecodeError::Frame("bad caps".to_string()));
    }
}
