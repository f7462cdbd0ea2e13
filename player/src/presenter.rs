//! Turns decoded pixel buffers and image files into scaled, centered blits.

use anyhow::{Context, Result};
use common::{PixelFormat, VideokeError, center_offset, scale_size};
use image::RgbaImage;
use std::path::Path;

use crate::decoder::DecodedFrame;
use crate::surface::DisplaySurface;

/// Load an image file as RGBA
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|e| VideokeError::Image(format!("{}: {}", path.display(), e)))?;
    Ok(image.to_rgba8())
}

/// Convert a raw pixel buffer into an RGBA image.
///
/// `stride` is the length of one row in bytes, including any padding.
pub fn frame_to_image(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: usize,
) -> Result<RgbaImage> {
    let bpp = format.bytes_per_pixel();
    let row_len = width as usize * bpp;

    if width == 0 || height == 0 {
        anyhow::bail!("Empty frame: {}x{}", width, height);
    }
    if stride < row_len {
        anyhow::bail!("Stride {} too small for {} pixels of {:?}", stride, width, format);
    }
    let needed = stride * (height as usize - 1) + row_len;
    if data.len() < needed {
        anyhow::bail!(
            "Frame buffer too short: {} bytes, expected at least {}",
            data.len(),
            needed
        );
    }

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for row in data.chunks(stride).take(height as usize) {
        for px in row[..row_len].chunks_exact(bpp) {
            let pixel = match format {
                PixelFormat::Rgb24 => [px[0], px[1], px[2], 255],
                PixelFormat::Rgba32 => [px[0], px[1], px[2], px[3]],
                PixelFormat::Bgra32 => [px[2], px[1], px[0], px[3]],
                PixelFormat::Bgrx32 => [px[2], px[1], px[0], 255],
                PixelFormat::Gray8 => [px[0], px[0], px[0], 255],
            };
            rgba.extend_from_slice(&pixel);
        }
    }

    RgbaImage::from_raw(width, height, rgba).context("Failed to create frame image")
}

/// Scale `image` to the largest size fitting `bound`, preserving aspect ratio
pub fn resize_to_fit(image: RgbaImage, bound: (u32, u32)) -> Result<RgbaImage> {
    use fast_image_resize as fr;

    let (src_width, src_height) = image.dimensions();
    let (target_width, target_height) = scale_size((src_width, src_height), bound);

    if (target_width, target_height) == (src_width, src_height) {
        return Ok(image);
    }
    if target_width == 0 || target_height == 0 {
        anyhow::bail!("Cannot fit {}x{} into {:?}", src_width, src_height, bound);
    }

    let src = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.into_raw(),
        fr::PixelType::U8x4,
    )
    .context("Failed to create source image")?;

    let mut dst = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src,
            &mut dst,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3)),
        )
        .context("Failed to resize image")?;

    RgbaImage::from_raw(target_width, target_height, dst.into_vec())
        .context("Failed to create output image buffer")
}

/// Scale `image` to fit the surface and blit it centered
pub fn blit_fitted(surface: &mut dyn DisplaySurface, image: RgbaImage) -> Result<()> {
    let dest = surface.size();
    let fitted = resize_to_fit(image, dest)?;
    let (x, y) = center_offset(dest, fitted.dimensions());
    surface.blit(&fitted, x, y);
    Ok(())
}

/// Draw a decoded video frame on the surface
pub fn present_frame(surface: &mut dyn DisplaySurface, frame: &DecodedFrame) -> Result<()> {
    let image = frame_to_image(
        &frame.data,
        frame.format,
        frame.width,
        frame.height,
        frame.stride,
    )?;
    blit_fitted(surface, image)
}
