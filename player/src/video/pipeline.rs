//! GStreamer pipeline setup and configuration
//!
//! `uridecodebin` picks demuxer and decoders (hardware ones when available).
//! Video goes through `videoconvert` into an `appsink` that the kiosk thread
//! polls; audio is played by GStreamer itself and drives the pipeline clock.

use anyhow::{Context, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::decoder::DecodeError;

/// Decoded frames queued ahead of the kiosk thread
const MAX_QUEUED_FRAMES: u32 = 4;

/// Initialize GStreamer (idempotent, safe to call multiple times)
pub fn initialize_gstreamer() -> Result<()> {
    static GSTREAMER_INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

    GSTREAMER_INITIALIZED
        .get_or_init(|| {
            gst::init().map_err(|e| e.to_string())?;
            log::info!("GStreamer initialized");
            Ok(())
        })
        .clone()
        .map_err(|e| anyhow::anyhow!("Failed to initialize GStreamer: {}", e))
}

/// Which streams `uridecodebin` exposed, shared with its signal handlers
#[derive(Debug, Default)]
pub struct StreamTracks {
    video_linked: AtomicBool,
    pads_complete: AtomicBool,
}

impl StreamTracks {
    pub fn mark_video_linked(&self) {
        self.video_linked.store(true, Ordering::Release);
    }

    pub fn mark_pads_complete(&self) {
        self.pads_complete.store(true, Ordering::Release);
    }

    /// Error once every stream is known and none of them was video.
    ///
    /// The appsink can neither preroll nor reach end of stream in that case.
    pub fn missing_video(&self) -> Option<DecodeError> {
        let complete = self.pads_complete.load(Ordering::Acquire);
        let linked = self.video_linked.load(Ordering::Acquire);
        (complete && !linked).then_some(DecodeError::NoVideo)
    }
}

fn make_element(factory: &str) -> Result<gst::Element> {
    gst::ElementFactory::make(factory)
        .build()
        .with_context(|| format!("Failed to create {}", factory))
}

/// Build a playback pipeline for a local file
///
/// # Returns
///
/// Tuple of (pipeline, app_sink, tracks) where app_sink can receive decoded
/// frames and tracks reports whether a video stream was found
pub fn build_pipeline(
    path: &Path,
) -> Result<(gst::Pipeline, gst_app::AppSink, Arc<StreamTracks>)> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let uri = gst::glib::filename_to_uri(&path, None)
        .with_context(|| format!("Invalid file path: {}", path.display()))?;

    log::debug!("Creating GStreamer pipeline for: {}", uri);

    let pipeline = gst::Pipeline::new();

    let source = gst::ElementFactory::make("uridecodebin")
        .property("uri", uri.as_str())
        .build()
        .context("Failed to create uridecodebin")?;

    let videoconvert = make_element("videoconvert")?;

    let app_sink = gst_app::AppSink::builder()
        .caps(
            &gst_video::VideoCapsBuilder::new()
                .format(gst_video::VideoFormat::Bgrx)
                .build(),
        )
        .build();
    configure_app_sink(&app_sink);

    pipeline
        .add_many([&source, &videoconvert, app_sink.upcast_ref()])
        .context("Failed to add elements to pipeline")?;
    videoconvert
        .link(&app_sink)
        .context("Failed to link videoconvert to appsink")?;

    let tracks = Arc::new(StreamTracks::default());

    let pipeline_weak = pipeline.downgrade();
    let videoconvert_weak = videoconvert.downgrade();
    let pad_tracks = Arc::clone(&tracks);
    source.connect_pad_added(move |_src, src_pad| {
        let caps = src_pad
            .current_caps()
            .unwrap_or_else(|| src_pad.query_caps(None));
        let Some(name) = caps.structure(0).map(|s| s.name().to_string()) else {
            return;
        };

        if name.starts_with("video/") {
            let Some(videoconvert) = videoconvert_weak.upgrade() else {
                return;
            };
            match link_pad(src_pad, &videoconvert) {
                Ok(()) => pad_tracks.mark_video_linked(),
                Err(e) => log::warn!("Failed to link video pad: {:#}", e),
            }
        } else if name.starts_with("audio/") {
            let Some(pipeline) = pipeline_weak.upgrade() else {
                return;
            };
            if let Err(e) = add_audio_branch(&pipeline, src_pad) {
                log::warn!("Failed to set up audio, playing muted: {:#}", e);
            }
        } else {
            log::debug!("Ignoring {} stream", name);
        }
    });

    let done_tracks = Arc::clone(&tracks);
    source.connect_no_more_pads(move |_src| {
        done_tracks.mark_pads_complete();
        if done_tracks.missing_video().is_some() {
            log::warn!("No video stream found");
        }
    });

    Ok((pipeline, app_sink, tracks))
}

/// Configure AppSink for polling from the kiosk thread
///
/// - `sync=false`: frames are handed over as soon as they are decoded; the
///   kiosk schedules them against the pipeline clock itself
/// - `max-buffers`: bounded queue between the streaming thread and the kiosk
/// - `drop=false`: upstream blocks instead of skipping frames
pub fn configure_app_sink(app_sink: &gst_app::AppSink) {
    app_sink.set_property("sync", false);
    app_sink.set_property("max-buffers", MAX_QUEUED_FRAMES);
    app_sink.set_property("drop", false);
}

fn link_pad(src_pad: &gst::Pad, element: &gst::Element) -> Result<()> {
    let sink_pad = element
        .static_pad("sink")
        .context("Element has no sink pad")?;
    if sink_pad.is_linked() {
        return Ok(());
    }

    src_pad
        .link(&sink_pad)
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    log::debug!("Linked pad {} to {}", src_pad.name(), element.name());
    Ok(())
}

/// `audioconvert ! audioresample ! autoaudiosink`, added once an audio stream shows up
fn add_audio_branch(pipeline: &gst::Pipeline, src_pad: &gst::Pad) -> Result<()> {
    if pipeline.by_name("audio-out").is_some() {
        return Ok(());
    }

    let convert = make_element("audioconvert")?;
    let resample = make_element("audioresample")?;
    let sink = gst::ElementFactory::make("autoaudiosink")
        .name("audio-out")
        .build()
        .context("Failed to create autoaudiosink")?;
    let chain = [&convert, &resample, &sink];

    pipeline
        .add_many(chain)
        .context("Failed to add audio elements")?;
    gst::Element::link_many(chain).context("Failed to link audio elements")?;
    for element in chain {
        element
            .sync_state_with_parent()
            .context("Failed to start audio element")?;
    }

    link_pad(src_pad, &convert)
}

/// Log stream properties from the negotiated caps
pub fn log_stream_info(info: &gst_video::VideoInfo) {
    let fps = info.fps();
    if fps.denom() > 0 && fps.numer() > 0 {
        log::info!(
            "Video stream: {}x{} {} @ {:.2} fps",
            info.width(),
            info.height(),
            info.format(),
            fps.numer() as f64 / fps.denom() as f64
        );
    } else {
        log::info!(
            "Video stream: {}x{} {} (variable frame rate)",
            info.width(),
            info.height(),
            info.format()
        );
    }
}
