//! Media decoder seam.
//!
//! The playback state machine only talks to these traits; the GStreamer
//! implementation lives in [`crate::video`].

use anyhow::Result;
use common::PixelFormat;
use std::path::Path;
use thiserror::Error;

/// One decoded video frame
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub data: Vec<u8>,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including padding
    pub stride: usize,
    /// Seconds to wait before showing this frame. Zero or negative means late.
    pub delay: f64,
}

/// Errors reported by a decoder while a stream is open
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Decoder error from {source_name}: {message}")]
    Stream { source_name: String, message: String },

    #[error("File has no video stream")]
    NoVideo,

    #[error("Malformed frame: {0}")]
    Frame(String),

    #[error("Decoder stopped unexpectedly")]
    Stopped,
}

/// Result of asking a decoder for its next frame
#[derive(Debug)]
pub enum FrameFetch {
    Frame(DecodedFrame),
    /// Nothing decoded yet, ask again next tick
    Pending,
    EndOfStream,
    Error(DecodeError),
}

/// An open media stream.
///
/// `next_frame` must never block for longer than a tick.
pub trait MediaDecoder {
    fn next_frame(&mut self) -> FrameFetch;

    /// Release the stream. Safe to call more than once.
    fn close(&mut self);
}

/// Opens media files into decoders
pub trait MediaOpener {
    fn open(&mut self, path: &Path) -> Result<Box<dyn MediaDecoder>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted decoders shared by the playback and kiosk tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Plays back a fixed list of fetch results, then reports end-of-stream
    pub struct ScriptedDecoder {
        script: VecDeque<FrameFetch>,
        closed: Rc<RefCell<u32>>,
    }

    impl ScriptedDecoder {
        pub fn new(script: Vec<FrameFetch>) -> Self {
            Self {
                script: script.into(),
                closed: Rc::new(RefCell::new(0)),
            }
        }

        /// Counter of `close` calls, readable after the decoder is boxed
        pub fn close_count(&self) -> Rc<RefCell<u32>> {
            Rc::clone(&self.closed)
        }
    }

    impl MediaDecoder for ScriptedDecoder {
        fn next_frame(&mut self) -> FrameFetch {
            self.script.pop_front().unwrap_or(FrameFetch::EndOfStream)
        }

        fn close(&mut self) {
            *self.closed.borrow_mut() += 1;
        }
    }

    /// A solid-color RGB24 frame
    pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3], delay: f64) -> DecodedFrame {
        DecodedFrame {
            data: rgb.repeat((width * height) as usize),
            format: PixelFormat::Rgb24,
            width,
            height,
            stride: width as usize * 3,
            delay,
        }
    }

    /// Hands out one scripted decoder per `open`, recording the opened paths
    #[derive(Default)]
    pub struct ScriptedOpener {
        pub scripts: VecDeque<Vec<FrameFetch>>,
        pub opened: Vec<std::path::PathBuf>,
        pub fail: bool,
    }

    impl MediaOpener for ScriptedOpener {
        fn open(&mut self, path: &Path) -> Result<Box<dyn MediaDecoder>> {
            if self.fail {
                anyhow::bail!("Cannot open {}", path.display());
            }
            self.opened.push(path.to_path_buf());
            let script = self.scripts.pop_front().unwrap_or_default();
            Ok(Box::new(ScriptedDecoder::new(script)))
        }
    }
}
