//! Fixed-size RGBA drawing surface.

use scenereel_common::error::{ReelError, ReelResult};

/// An 8-bit straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with the alpha channel replaced by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// The drawable target the compositor renders into.
///
/// Pixels are tightly packed RGBA8, row-major, always fully opaque after a
/// background fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// Create a surface filled with opaque black.
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::render(format!(
                "surface size must be non-zero, got {width}x{height}"
            )));
        }
        let mut surface = Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        };
        surface.fill(Color::BLACK);
        Ok(surface)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        let px = color.to_array();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Read a pixel; `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Source-over blend one pixel. Coordinates outside the surface are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = self.index(x as u32, y as u32);
        let alpha = color[3] as u32;
        if alpha == 0 {
            return;
        }
        if alpha == 255 {
            self.data[i..i + 4].copy_from_slice(&color);
            return;
        }
        let inv = 255 - alpha;
        for c in 0..3 {
            let src = color[c] as u32;
            let dst = self.data[i + c] as u32;
            self.data[i + c] = ((src * alpha + dst * inv + 127) / 255) as u8;
        }
        let dst_a = self.data[i + 3] as u32;
        self.data[i + 3] = (alpha + (dst_a * inv + 127) / 255).min(255) as u8;
    }

    /// Blend a rectangle; the rectangle is clipped to the surface.
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width as i64);
        let y1 = (y + height as i64).min(self.height as i64);
        let px = color.to_array();
        for py in y0..y1 {
            for px_x in x0..x1 {
                self.blend_pixel(px_x, py, px);
            }
        }
    }

    /// Blend an RGBA image with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, image: &image::RgbaImage, x: i64, y: i64) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + image.width() as i64).min(self.width as i64);
        let y1 = (y + image.height() as i64).min(self.height as i64);
        for dy in y0..y1 {
            for dx in x0..x1 {
                let src = image.get_pixel((dx - x) as u32, (dy - y) as u32);
                self.blend_pixel(dx, dy, src.0);
            }
        }
    }

    /// Copy the surface into an `image` buffer (e.g. for PNG export).
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let i = self.index(x, y);
            image::Rgba([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_is_opaque_black() {
        let surface = Surface::new(4, 2).unwrap();
        assert_eq!(surface.as_bytes().len(), 32);
        assert_eq!(surface.pixel(3, 1), Some([0, 0, 0, 255]));
        assert_eq!(surface.pixel(4, 0), None);
        assert!(Surface::new(0, 10).is_err());
    }

    #[test]
    fn test_blend_half_transparent_black_over_white() {
        let mut surface = Surface::new(1, 1).unwrap();
        surface.fill(Color::WHITE);
        surface.blend_pixel(0, 0, Color::BLACK.with_opacity(0.4).to_array());
        let [r, g, b, a] = surface.pixel(0, 0).unwrap();
        // 255 * (1 - 102/255) = 153
        assert_eq!((r, g, b, a), (153, 153, 153, 255));
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut surface = Surface::new(4, 4).unwrap();
        surface.fill_rect(-2, 2, 4, 10, Color::WHITE);
        assert_eq!(surface.pixel(0, 3), Some([255, 255, 255, 255]));
        assert_eq!(surface.pixel(1, 2), Some([255, 255, 255, 255]));
        assert_eq!(surface.pixel(2, 2), Some([0, 0, 0, 255]));
        assert_eq!(surface.pixel(0, 1), Some([0, 0, 0, 255]));
    }
}
