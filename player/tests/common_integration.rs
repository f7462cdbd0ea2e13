/// Integration tests for the shared types
/// These tests verify that config values deserialize into the common types
/// and that the fitting geometry composes the way the player uses it
use common::{
    Color, IMAGE_EXTENSIONS, PixelFormat, VIDEO_EXTENSIONS, VideokeError, center_offset,
    has_extension, scale_size,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ColorSettings {
    background_color: Color,
}

#[test]
fn test_color_from_toml() {
    let settings: ColorSettings = toml::from_str(r##"background_color = "#FF00FF""##).unwrap();
    assert_eq!(settings.background_color, Color::MAGENTA);

    let settings: ColorSettings = toml::from_str(r#"background_color = "102030""#).unwrap();
    assert_eq!(settings.background_color, Color::rgb(0x10, 0x20, 0x30));
    assert_eq!(settings.background_color.to_hex(), "102030");
}

#[test]
fn test_invalid_color_rejected() {
    let result: Result<ColorSettings, _> = toml::from_str(r#"background_color = "purple""#);
    assert!(result.is_err());

    let result: Result<ColorSettings, _> = toml::from_str(r#"background_color = "FFF""#);
    assert!(result.is_err());
}

#[test]
fn test_fit_and_center_widescreen_video() {
    // 16:9 video on a 4:3 screen gets letterboxed
    let screen = (1024, 768);
    let fitted = scale_size((1920, 1080), screen);
    assert_eq!(fitted, (1024, 576));
    assert_eq!(center_offset(screen, fitted), (0, 96));
}

#[test]
fn test_fit_and_center_small_image_grows() {
    let screen = (800, 600);
    let fitted = scale_size((200, 100), screen);
    assert_eq!(fitted, (800, 400));
    assert_eq!(center_offset(screen, fitted), (0, 100));
}

#[test]
fn test_fit_matching_size_is_untouched() {
    let screen = (640, 480);
    assert_eq!(scale_size(screen, screen), screen);
    assert_eq!(center_offset(screen, screen), (0, 0));
}

#[test]
fn test_center_offset_negative_for_oversized() {
    assert_eq!(center_offset((100, 100), (200, 50)), (-50, 25));
}

#[test]
fn test_media_extensions() {
    assert!(has_extension("/music/Song One.MP4", VIDEO_EXTENSIONS));
    assert!(!has_extension("/music/song.mkv", VIDEO_EXTENSIONS));
    assert!(!has_extension("/music/mp4", VIDEO_EXTENSIONS));

    for name in ["a.bmp", "b.JPG", "c.jpeg", "d.Png"] {
        assert!(has_extension(name, IMAGE_EXTENSIONS), "{}", name);
    }
    assert!(!has_extension("e.gif", IMAGE_EXTENSIONS));
}

#[test]
fn test_pixel_format_names() {
    assert_eq!(PixelFormat::from_name("BGRx"), PixelFormat::Bgrx32);
    assert_eq!(PixelFormat::from_name("RGBA"), PixelFormat::Rgba32);
    assert_eq!(PixelFormat::from_name("I420"), PixelFormat::Rgb24);
    assert_eq!(PixelFormat::Bgrx32.bytes_per_pixel(), 4);
}

#[test]
fn test_error_messages() {
    let err = VideokeError::NotFound("No music found!".to_string());
    assert_eq!(err.to_string(), "Not found: No music found!");

    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    assert!(matches!(VideokeError::from(io), VideokeError::Io(msg) if msg == "denied"));
}
