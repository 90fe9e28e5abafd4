//! Frame compositor: draws one scene onto the capture surface.
//!
//! A scene frame is built in three layers:
//!
//! 1. Solid background fill.
//! 2. The scene bitmap, scaled uniformly to cover the whole surface and
//!    center-cropped.
//! 3. A translucent caption band near the bottom with the caption greedily
//!    word-wrapped over it, one centered line per row.
//!
//! Caption lines that run past the band are still drawn; the band is a fixed
//! height and long captions simply overflow it.

use scenereel_common::error::ReelResult;

use crate::preload::DecodedScene;
use crate::surface::{Color, Surface};
use crate::text::TextRenderer;

/// Message shown on the idle frame.
pub const IDLE_MESSAGE: &str = "Add scenes and click Generate";

/// Layout and colors used by the compositor.
#[derive(Debug, Clone)]
pub struct CompositorStyle {
    /// Scene background.
    pub background: Color,

    /// Horizontal inset of the caption band from each surface edge.
    pub band_padding: u32,

    /// Distance from the band's top edge to the bottom of the surface.
    pub band_offset_from_bottom: u32,

    /// Band height.
    pub band_height: u32,

    /// Band fill (translucent).
    pub band_color: Color,

    /// Caption text color.
    pub caption_color: Color,

    /// Caption font size in pixels.
    pub caption_size: f32,

    /// Distance between caption baselines.
    pub line_height: f32,

    /// Distance from the first caption baseline to the bottom of the surface.
    pub first_baseline_from_bottom: u32,

    /// Idle placeholder background.
    pub placeholder_background: Color,

    /// Idle placeholder font size.
    pub placeholder_size: f32,
}

impl Default for CompositorStyle {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            band_padding: 40,
            band_offset_from_bottom: 180,
            band_height: 140,
            band_color: Color::BLACK.with_opacity(0.4),
            caption_color: Color::WHITE,
            caption_size: 36.0,
            line_height: 42.0,
            first_baseline_from_bottom: 100,
            placeholder_background: Color::rgb(0x11, 0x11, 0x11),
            placeholder_size: 28.0,
        }
    }
}

impl CompositorStyle {
    /// Widest a caption line may measure on a surface of `surface_width`.
    pub fn caption_max_width(&self, surface_width: u32) -> f32 {
        surface_width.saturating_sub(self.band_padding * 4) as f32
    }
}

/// Placement of a bitmap scaled to cover the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverPlacement {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
}

/// Uniform scale that makes an `image_w x image_h` bitmap cover the surface,
/// and the offset that centers it (negative offsets crop).
pub fn cover_placement(surface_w: u32, surface_h: u32, image_w: u32, image_h: u32) -> CoverPlacement {
    let scale = f64::max(
        surface_w as f64 / image_w.max(1) as f64,
        surface_h as f64 / image_h.max(1) as f64,
    );
    // Round up (ignoring float noise) so the scaled image always covers.
    let width = ((image_w as f64 * scale - 1e-6).ceil() as u32).max(surface_w);
    let height = ((image_h as f64 * scale - 1e-6).ceil() as u32).max(surface_h);
    CoverPlacement {
        scale,
        width,
        height,
        x: (surface_w as i64 - width as i64) / 2,
        y: (surface_h as i64 - height as i64) / 2,
    }
}

/// Greedy word wrap.
///
/// Words are appended to the current line while `measure(line + " " + word)`
/// stays within `max_width`. A word that does not fit starts the next line;
/// a word wider than `max_width` on its own still gets a line to itself.
/// The last line is always emitted.
pub fn wrap_words<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Owns the capture surface and draws scenes onto it.
#[derive(Debug)]
pub struct FrameCompositor {
    surface: Surface,
    style: CompositorStyle,
    text: TextRenderer,
}

impl FrameCompositor {
    pub fn new(width: u32, height: u32, style: CompositorStyle, text: TextRenderer) -> ReelResult<Self> {
        Ok(Self {
            surface: Surface::new(width, height)?,
            style,
            text,
        })
    }

    /// The current frame.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn style(&self) -> &CompositorStyle {
        &self.style
    }

    /// Draw one scene, replacing the previous frame entirely.
    pub fn draw(&mut self, scene: &DecodedScene) {
        let (w, h) = (self.surface.width(), self.surface.height());
        self.surface.fill(self.style.background);

        if let Some(bitmap) = scene.bitmap().filter(|b| b.width() > 0 && b.height() > 0) {
            let placement = cover_placement(w, h, bitmap.width(), bitmap.height());
            // Only the part of the bitmap that lands on the surface is resampled.
            let crop_w = ((w as f64 / placement.scale).round() as u32).clamp(1, bitmap.width());
            let crop_h = ((h as f64 / placement.scale).round() as u32).clamp(1, bitmap.height());
            let visible = image::imageops::crop_imm(
                bitmap,
                (bitmap.width() - crop_w) / 2,
                (bitmap.height() - crop_h) / 2,
                crop_w,
                crop_h,
            )
            .to_image();
            let scaled =
                image::imageops::resize(&visible, w, h, image::imageops::FilterType::Triangle);
            self.surface.draw_image(&scaled, 0, 0);
        }

        if let Some(caption) = scene.caption() {
            self.draw_caption(caption);
        }

        tracing::trace!(
            scene = scene.index(),
            has_bitmap = scene.bitmap().is_some(),
            "Scene composited"
        );
    }

    /// Caption lines as they would be laid out on this surface.
    pub fn caption_lines(&self, caption: &str) -> Vec<String> {
        let size = self.style.caption_size;
        wrap_words(
            caption,
            self.style.caption_max_width(self.surface.width()),
            |line| self.text.measure(line, size),
        )
    }

    /// Idle frame shown before any scene is drawn.
    pub fn draw_placeholder(&mut self, message: &str) {
        let (w, h) = (self.surface.width() as f32, self.surface.height() as f32);
        self.surface.fill(self.style.placeholder_background);
        self.text.draw_centered(
            &mut self.surface,
            message,
            self.style.placeholder_size,
            w / 2.0,
            h / 2.0,
            self.style.caption_color,
        );
    }

    fn draw_caption(&mut self, caption: &str) {
        let (w, h) = (self.surface.width(), self.surface.height());
        let style = &self.style;

        self.surface.fill_rect(
            style.band_padding as i64,
            h as i64 - style.band_offset_from_bottom as i64,
            w.saturating_sub(style.band_padding * 2),
            style.band_height,
            style.band_color,
        );

        let lines = self.caption_lines(caption);
        let center_x = w as f32 / 2.0;
        let first_baseline = h as f32 - style.first_baseline_from_bottom as f32;
        for (i, line) in lines.iter().enumerate() {
            self.text.draw_centered(
                &mut self.surface,
                line,
                self.style.caption_size,
                center_x,
                first_baseline + i as f32 * self.style.line_height,
                self.style.caption_color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten pixels per character.
    fn chars10(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    #[test]
    fn test_wrap_splits_pair_wider_than_max() {
        // "hello world" is 110px; each word alone fits in 60px.
        let lines = wrap_words("hello world", 60.0, chars10);
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[test]
    fn test_wrap_keeps_words_together_when_they_fit() {
        let lines = wrap_words("a b c d", 30.0, chars10);
        assert_eq!(lines, vec!["a b", "c d"]);
    }

    #[test]
    fn test_wrap_oversized_word_sits_alone() {
        let lines = wrap_words("hi incomprehensibilities ok", 50.0, chars10);
        assert_eq!(lines, vec!["hi", "incomprehensibilities", "ok"]);

        let lines = wrap_words("incomprehensibilities", 50.0, chars10);
        assert_eq!(lines, vec!["incomprehensibilities"]);
    }

    #[test]
    fn test_wrap_collapses_repeated_whitespace() {
        let lines = wrap_words("  one   two  ", 1000.0, chars10);
        assert_eq!(lines, vec!["one two"]);
    }

    #[test]
    fn test_cover_placement_landscape_image_on_landscape_surface() {
        // 1920x1080 onto 1280x720 -> exact 2/3 scale, no crop.
        let p = cover_placement(1280, 720, 1920, 1080);
        assert!((p.scale - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!((p.width, p.height), (1280, 720));
        assert_eq!((p.x, p.y), (0, 0));
    }

    #[test]
    fn test_cover_placement_square_image_is_center_cropped() {
        // 100x100 onto 1280x720 -> scale 12.8, 1280x1280, cropped vertically.
        let p = cover_placement(1280, 720, 100, 100);
        assert!((p.scale - 12.8).abs() < 1e-9);
        assert_eq!((p.width, p.height), (1280, 1280));
        assert_eq!((p.x, p.y), (0, -280));
    }

    #[test]
    fn test_caption_max_width_uses_four_paddings() {
        let style = CompositorStyle::default();
        assert_eq!(style.caption_max_width(1280), 1120.0);
        assert_eq!(style.caption_max_width(100), 0.0);
    }
}
