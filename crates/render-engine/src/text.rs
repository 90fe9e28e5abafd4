//! Caption text measurement and rasterization.
//! Uses fontdue for CPU glyph rasterization.
//!
//! When no font file can be found the renderer falls back to fixed block
//! metrics: every character advances half an em and non-space characters
//! draw as solid boxes. Layout stays deterministic either way.

use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use scenereel_common::error::{ReelError, ReelResult};

use crate::surface::{Color, Surface};

/// Font files probed, in order, when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const FALLBACK_ADVANCE_EM: f32 = 0.5;
const FALLBACK_BOX_WIDTH_EM: f32 = 0.4;
const FALLBACK_BOX_HEIGHT_EM: f32 = 0.7;

enum Glyphs {
    Font(Box<Font>),
    Blocks,
}

/// Measures and draws single lines of text.
pub struct TextRenderer {
    glyphs: Glyphs,
    source: Option<PathBuf>,
}

impl TextRenderer {
    /// Renderer backed by a parsed font.
    pub fn from_font_bytes(bytes: &[u8]) -> ReelResult<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| ReelError::render(format!("failed to parse font: {e}")))?;
        Ok(Self {
            glyphs: Glyphs::Font(Box::new(font)),
            source: None,
        })
    }

    /// Renderer backed by a font file on disk.
    pub fn from_font_file(path: &Path) -> ReelResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ReelError::render(format!("failed to read font file {}: {e}", path.display()))
        })?;
        let mut renderer = Self::from_font_bytes(&bytes)?;
        renderer.source = Some(path.to_path_buf());
        Ok(renderer)
    }

    /// Block-metric renderer that needs no font file.
    pub fn fallback() -> Self {
        Self {
            glyphs: Glyphs::Blocks,
            source: None,
        }
    }

    /// Use the configured font if given, else the first system font found,
    /// else block metrics.
    pub fn discover(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match Self::from_font_file(path) {
                Ok(renderer) => return renderer,
                Err(e) => tracing::warn!(error = %e, "Configured caption font unusable"),
            }
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::from_font_file(path) {
                Ok(renderer) => {
                    tracing::debug!(font = %path.display(), "Using system caption font");
                    return renderer;
                }
                Err(e) => tracing::debug!(font = %path.display(), error = %e, "Skipping font"),
            }
        }

        tracing::warn!("No caption font found; captions will render as block glyphs");
        Self::fallback()
    }

    /// Font file in use, if the renderer was loaded from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.glyphs, Glyphs::Blocks)
    }

    /// Advance width of `text` at `size` pixels, including kerning.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        match &self.glyphs {
            Glyphs::Font(font) => {
                let mut width = 0.0;
                let mut prev: Option<char> = None;
                for ch in text.chars() {
                    if let Some(p) = prev {
                        width += font.horizontal_kern(p, ch, size).unwrap_or(0.0);
                    }
                    width += font.metrics(ch, size).advance_width;
                    prev = Some(ch);
                }
                width
            }
            Glyphs::Blocks => text.chars().count() as f32 * size * FALLBACK_ADVANCE_EM,
        }
    }

    /// Draw `text` horizontally centered on `center_x` with its baseline at
    /// `baseline_y`. Pixels outside the surface are dropped.
    pub fn draw_centered(
        &self,
        surface: &mut Surface,
        text: &str,
        size: f32,
        center_x: f32,
        baseline_y: f32,
        color: Color,
    ) {
        let start_x = center_x - self.measure(text, size) / 2.0;
        self.draw_line(surface, text, size, start_x, baseline_y, color);
    }

    /// Draw `text` starting at `x` with its baseline at `baseline_y`.
    pub fn draw_line(
        &self,
        surface: &mut Surface,
        text: &str,
        size: f32,
        x: f32,
        baseline_y: f32,
        color: Color,
    ) {
        match &self.glyphs {
            Glyphs::Font(font) => {
                let mut pen_x = x;
                let mut prev: Option<char> = None;
                for ch in text.chars() {
                    if let Some(p) = prev {
                        pen_x += font.horizontal_kern(p, ch, size).unwrap_or(0.0);
                    }
                    let (metrics, coverage) = font.rasterize(ch, size);
                    let glyph_x = pen_x.round() as i64 + metrics.xmin as i64;
                    let glyph_y =
                        baseline_y.round() as i64 - (metrics.height as i64 + metrics.ymin as i64);

                    for gy in 0..metrics.height {
                        for gx in 0..metrics.width {
                            let cov = coverage[gy * metrics.width + gx] as u32;
                            if cov == 0 {
                                continue;
                            }
                            let alpha = (cov * color.a as u32 + 127) / 255;
                            surface.blend_pixel(
                                glyph_x + gx as i64,
                                glyph_y + gy as i64,
                                [color.r, color.g, color.b, alpha as u8],
                            );
                        }
                    }

                    pen_x += metrics.advance_width;
                    prev = Some(ch);
                }
            }
            Glyphs::Blocks => {
                let advance = size * FALLBACK_ADVANCE_EM;
                let box_w = (size * FALLBACK_BOX_WIDTH_EM).round().max(1.0) as u32;
                let box_h = (size * FALLBACK_BOX_HEIGHT_EM).round().max(1.0) as u32;
                for (i, ch) in text.chars().enumerate() {
                    if ch.is_whitespace() {
                        continue;
                    }
                    let left = (x + i as f32 * advance).round() as i64;
                    let top = baseline_y.round() as i64 - box_h as i64;
                    surface.fill_rect(left, top, box_w, box_h, color);
                }
            }
        }
    }
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("fallback", &self.is_fallback())
            .field("source", &self.source)
            .finish()
    }
}
