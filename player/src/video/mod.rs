//! Video decoding through GStreamer
//!
//! - `pipeline`: GStreamer pipeline setup and configuration
//! - `decoder`: `GstDecoder`, the non-blocking frame source used by playback
//!
//! # Architecture
//!
//! 1. `uridecodebin` demuxes the file and picks decoders
//! 2. `videoconvert` converts to BGRx for the appsink
//! 3. Audio goes straight to `autoaudiosink` and runs the pipeline clock
//! 4. The kiosk thread polls the appsink once per tick and schedules each
//!    frame against the pipeline's running time
//!
//! Without the `video` feature [`GstOpener`] refuses to open anything.

#[cfg(feature = "video")]
mod decoder;
#[cfg(feature = "video")]
mod pipeline;

#[cfg(feature = "video")]
pub use decoder::GstOpener;

#[cfg(not(feature = "video"))]
pub use opener_stub::GstOpener;

#[cfg(not(feature = "video"))]
mod opener_stub {
    use anyhow::Result;
    use common::VideokeError;
    use std::path::Path;

    use crate::decoder::{MediaDecoder, MediaOpener};

    /// Stub opener when video feature is disabled
    pub struct GstOpener;

    impl GstOpener {
        pub fn new() -> Result<Self> {
            log::warn!("Video support not compiled in, playback is disabled");
            Ok(Self)
        }
    }

    impl MediaOpener for GstOpener {
        fn open(&mut self, _path: &Path) -> Result<Box<dyn MediaDecoder>> {
            Err(VideokeError::Video("Video support not compiled in".to_string()).into())
        }
    }
}
