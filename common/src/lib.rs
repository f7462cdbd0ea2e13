//! Common types and utilities for Videokê.
//!
//! This crate holds the platform-independent vocabulary shared by the player:
//! input events, colors, raw pixel formats, scale-to-fit geometry, file
//! extension matching and the domain error type.
//!
//! # Examples
//!
//! ```
//! use common::{scale_size, center_offset};
//!
//! // Fit a 4:3 frame into a 16:9 screen
//! let fitted = scale_size((640, 480), (1600, 900));
//! assert_eq!(fitted, (1200, 900));
//!
//! // And center it
//! assert_eq!(center_offset((1600, 900), fitted), (200, 0));
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Recognized video file extensions (lowercase, without dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// Recognized background image extensions (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["bmp", "jpg", "jpeg", "png"];

/// Domain errors crossing module boundaries.
#[derive(Error, Debug)]
pub enum VideokeError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Video error: {0}")]
    Video(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for VideokeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Discrete input events, polled once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Window close request
    Quit,
    /// A key was released
    KeyUp(Key),
    /// A mouse button was released
    MouseUp(MouseButton),
}

/// Keys the kiosk reacts to. Everything else is carried as a raw keysym.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Enter,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u32),
}

/// An opaque RGB color.
///
/// Deserializes from a hex string (`"FF00FF"` or `"#FF00FF"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color string (e.g., "#FF5733" or "FF5733")
    pub fn parse_hex(color: &str) -> Option<Self> {
        let color = color.trim().trim_start_matches('#');

        if color.len() != 6 || !color.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&color[0..2], 16).ok()?;
        let g = u8::from_str_radix(&color[2..4], 16).ok()?;
        let b = u8::from_str_radix(&color[4..6], 16).ok()?;

        Some(Self { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// RGBA bytes with full opacity
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = VideokeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
            .ok_or_else(|| VideokeError::Config(format!("Invalid color: {}", value)))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Raw pixel layouts a decoder may hand over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Packed 8-bit R, G, B
    #[default]
    Rgb24,
    /// Packed 8-bit R, G, B, A
    Rgba32,
    /// Packed 8-bit B, G, R, A
    Bgra32,
    /// Packed 8-bit B, G, R, padding
    Bgrx32,
    /// Single 8-bit luma channel
    Gray8,
}

impl PixelFormat {
    /// Parse a format name as reported by decoders.
    ///
    /// Unknown names fall back to [`PixelFormat::Rgb24`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "rgb24" | "rgb" => Self::Rgb24,
            "rgba" | "rgba32" => Self::Rgba32,
            "bgra" | "bgra32" => Self::Bgra32,
            "bgrx" | "bgr0" | "bgrx32" => Self::Bgrx32,
            "gray8" | "gray" | "y8" => Self::Gray8,
            _ => Self::default(),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgba32 | Self::Bgra32 | Self::Bgrx32 => 4,
            Self::Gray8 => 1,
        }
    }
}

/// Largest size fitting inside `bound` with the aspect ratio of `original`.
///
/// Returns `original` untouched when it already equals `bound`. Sizes may grow
/// as well as shrink.
pub fn scale_size(original: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    if original == bound {
        return original;
    }

    let (w, h) = original;
    let (bw, bh) = bound;
    if w == 0 || h == 0 || bw == 0 || bh == 0 {
        return (0, 0);
    }

    let ratio = f64::max(w as f64 / bw as f64, h as f64 / bh as f64);
    let fitted_w = ((w as f64 / ratio) as u32).clamp(1, bw);
    let fitted_h = ((h as f64 / ratio) as u32).clamp(1, bh);

    (fitted_w, fitted_h)
}

/// Top-left position that centers `size` on `dest` (floor division on both axes).
pub fn center_offset(dest: (u32, u32), size: (u32, u32)) -> (i64, i64) {
    (
        (dest.0 / 2) as i64 - (size.0 / 2) as i64,
        (dest.1 / 2) as i64 - (size.1 / 2) as i64,
    )
}

/// Normalized file extension: lowercase, without the leading dot.
pub fn extension(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check if a file has one of the given extensions (case-insensitive)
pub fn has_extension(path: impl AsRef<Path>, extensions: &[&str]) -> bool {
    extension(path).is_some_and(|ext| extensions.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_size_keeps_smaller_source() {
        assert_eq!(scale_size((400, 300), (800, 300)), (400, 300));
    }

    #[test]
    fn test_scale_size_bounded_and_proportional() {
        let (w, h) = scale_size((1920, 1080), (800, 600));
        assert_eq!((w, h), (800, 450));

        let (w, h) = scale_size((300, 400), (1600, 900));
        assert!(w <= 1600 && h <= 900);
        assert!((899..=900).contains(&h));
        assert!((674..=675).contains(&w));
    }

    #[test]
    fn test_scale_size_identity_and_degenerate() {
        assert_eq!(scale_size((640, 480), (640, 480)), (640, 480));
        assert_eq!(scale_size((0, 480), (640, 480)), (0, 0));
        assert_eq!(scale_size((640, 480), (0, 0)), (0, 0));
        // Extreme aspect never collapses an axis to zero
        assert_eq!(scale_size((10_000, 1), (100, 100)), (100, 1));
    }

    #[test]
    fn test_center_offset_floors() {
        assert_eq!(center_offset((800, 600), (400, 300)), (200, 150));
        assert_eq!(center_offset((801, 601), (400, 301)), (200, 150));
        assert_eq!(center_offset((100, 100), (200, 50)), (-50, 25));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Color::parse_hex("#FF5733"), Some(Color::rgb(255, 87, 51)));
        assert_eq!(Color::parse_hex("ff00ff"), Some(Color::MAGENTA));
        assert_eq!(Color::parse_hex("000000"), Some(Color::BLACK));
        assert_eq!(Color::parse_hex("FFF"), None);
        assert_eq!(Color::parse_hex("invalid"), None);
        assert_eq!(Color::WHITE.to_hex(), "FFFFFF");
    }

    #[test]
    fn test_pixel_format_fallback() {
        assert_eq!(PixelFormat::from_name("RGB"), PixelFormat::Rgb24);
        assert_eq!(PixelFormat::from_name("BGRx"), PixelFormat::Bgrx32);
        assert_eq!(PixelFormat::from_name("GRAY8"), PixelFormat::Gray8);
        assert_eq!(PixelFormat::from_name("yuv420p"), PixelFormat::Rgb24);
        assert_eq!(PixelFormat::Rgb24.bytes_per_pixel(), 3);
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("song.mp4", VIDEO_EXTENSIONS));
        assert!(has_extension("SONG.MP4", VIDEO_EXTENSIONS));
        assert!(!has_extension("song.mp4.txt", VIDEO_EXTENSIONS));
        assert!(!has_extension(".mp4", VIDEO_EXTENSIONS));
        assert!(has_extension("bg.JPeG", IMAGE_EXTENSIONS));
        assert!(!has_extension("bg", IMAGE_EXTENSIONS));
        assert_eq!(extension("A.JPG").as_deref(), Some("jpg"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VideokeError = io_err.into();
        assert!(matches!(err, VideokeError::Io(_)));
        assert_eq!(
            VideokeError::NotFound("No music found!".to_string()).to_string(),
            "Not found: No music found!"
        );
    }
}
