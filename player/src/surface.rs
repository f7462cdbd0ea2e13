use anyhow::Result;
use common::{Color, InputEvent};
use image::{Rgba, RgbaImage};

/// Something the kiosk can draw on and show.
pub trait DisplaySurface {
    /// Size in pixels (width, height)
    fn size(&self) -> (u32, u32);

    fn fill(&mut self, color: Color);

    /// Draw `image` with its top-left corner at (x, y). Out-of-bounds parts are clipped.
    fn blit(&mut self, image: &RgbaImage, x: i64, y: i64);

    /// Make everything drawn so far visible
    fn present(&mut self) -> Result<()>;
}

/// Source of input events, polled once per tick. Must never block.
pub trait InputSource {
    fn poll_events(&mut self) -> Result<Vec<InputEvent>>;
}

/// In-memory RGBA framebuffer.
///
/// The Wayland window draws into one of these and copies it to a shared memory
/// buffer on present.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    presented: u64,
}

impl Canvas {
    pub fn new(width: u32, height: u32, color: Color) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(color.to_rgba())),
            presented: 0,
        }
    }

    /// Replace the contents with a `width`x`height` buffer filled with `color`
    pub fn resize(&mut self, width: u32, height: u32, color: Color) {
        if self.pixels.dimensions() != (width, height) {
            self.pixels = RgbaImage::from_pixel(width, height, Rgba(color.to_rgba()));
        }
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Number of times this canvas was presented
    #[cfg(test)]
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Copy as ARGB8888 in native byte order (BGRA in memory on little-endian)
    pub fn write_argb8888(&self, out: &mut [u8]) {
        for (dst, src) in out.chunks_exact_mut(4).zip(self.pixels.pixels()) {
            let [r, g, b, a] = src.0;
            dst.copy_from_slice(&u32::from_be_bytes([a, r, g, b]).to_ne_bytes());
        }
    }
}

impl DisplaySurface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn fill(&mut self, color: Color) {
        let rgba = Rgba(color.to_rgba());
        for pixel in self.pixels.pixels_mut() {
            *pixel = rgba;
        }
    }

    fn blit(&mut self, image: &RgbaImage, x: i64, y: i64) {
        image::imageops::overlay(&mut self.pixels, image, x, y);
    }

    fn present(&mut self) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_blit_clips() {
        let mut canvas = Canvas::new(4, 4, Color::BLACK);
        canvas.fill(Color::WHITE);
        assert_eq!(canvas.pixel(3, 3), [255, 255, 255, 255]);

        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        canvas.blit(&red, 2, -2);
        assert_eq!(canvas.pixel(2, 0), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(3, 1), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(1, 0), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(2, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn test_present_counts() {
        let mut canvas = Canvas::new(1, 1, Color::BLACK);
        canvas.present().unwrap();
        canvas.present().unwrap();
        assert_eq!(canvas.presented(), 2);
    }

    #[test]
    fn test_write_argb8888() {
        let mut canvas = Canvas::new(2, 1, Color::rgb(255, 0, 0));
        canvas.blit(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 255, 255])), 1, 0);

        let mut out = vec![0u8; 8];
        canvas.write_argb8888(&mut out);

        let first = u32::from_ne_bytes([out[0], out[1], out[2], out[3]]);
        let second = u32::from_ne_bytes([out[4], out[5], out[6], out[7]]);
        assert_eq!(first, 0xFFFF_0000);
        assert_eq!(second, 0xFF00_00FF);
    }
}
