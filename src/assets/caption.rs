//! Caption strips: where each line sits and how it is rasterised.
//!
//! A caption is drawn onto a transparent 1024x320 strip which the renderer
//! maps onto the band under a photo. Lines are centred horizontally with a
//! middle baseline.

use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::error::AssetError;

/// Caption text colour.
pub const CAPTION_INK: [u8; 3] = [0x1a, 0x2a, 0x4a];

/// Alpha of the bars drawn when no font could be loaded.
const PLACEHOLDER_ALPHA: u8 = 200;

/// How a caption is laid out on its 1024x320 strip.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub lines: Vec<String>,
    /// Vertical centre of each line, in strip pixels
    pub line_centres: Vec<f32>,
}

impl CaptionLayout {
    pub const CANVAS: (u32, u32) = (1024, 320);

    pub fn for_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let font_size = match len {
            0..=4 => 140.0,
            5..=6 => 110.0,
            7..=12 => 90.0,
            _ => 70.0,
        };
        let lines = if len > 7 {
            let mid = len.div_ceil(2);
            vec![
                chars[..mid].iter().collect(),
                chars[mid..].iter().collect(),
            ]
        } else if len == 0 {
            Vec::new()
        } else {
            vec![text.to_owned()]
        };

        let line_height = font_size * 1.15;
        let first = Self::CANVAS.1 as f32 / 2.0
            - (lines.len().saturating_sub(1)) as f32 * line_height / 2.0;
        let line_centres = (0..lines.len())
            .map(|i| first + i as f32 * line_height)
            .collect();

        Self {
            font_size,
            line_height,
            lines,
            line_centres,
        }
    }
}

/// Turns caption text into strip images.
///
/// Without a font each line becomes an ink bar as wide as the line would
/// roughly be, so captions of different length still look different.
#[derive(Clone, Default)]
pub struct CaptionRasterizer {
    font: Option<FontArc>,
}

impl fmt::Debug for CaptionRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionRasterizer")
            .field("has_font", &self.has_font())
            .finish()
    }
}

impl CaptionRasterizer {
    pub fn new(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    pub fn from_file(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|source| AssetError::Font {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(font))
    }

    /// Uses the first of `candidates` that loads.
    pub fn find(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            match Self::from_file(path) {
                Ok(rasterizer) => {
                    log::info!("Caption font: {}", path.display());
                    return rasterizer;
                }
                Err(err) => log::debug!("Skipping caption font: {err}"),
            }
        }
        log::warn!("No caption font could be loaded; captions are drawn as bars");
        Self::default()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn render(&self, text: &str) -> RgbaImage {
        let (width, height) = CaptionLayout::CANVAS;
        let mut canvas = RgbaImage::new(width, height);
        let layout = CaptionLayout::for_text(text);
        for (line, centre) in layout.lines.iter().zip(&layout.line_centres) {
            match &self.font {
                Some(font) => draw_line(&mut canvas, font, line, layout.font_size, *centre),
                None => draw_bar(&mut canvas, line, layout.font_size, *centre),
            }
        }
        canvas
    }
}

fn draw_line(canvas: &mut RgbaImage, font: &FontArc, line: &str, font_size: f32, centre: f32) {
    let scaled = font.as_scaled(PxScale::from(font_size));

    let mut glyphs = Vec::with_capacity(line.len());
    let mut caret = 0.0f32;
    let mut previous: Option<GlyphId> = None;
    for c in line.chars() {
        let id = scaled.glyph_id(c);
        if let Some(previous) = previous {
            caret += scaled.kern(previous, id);
        }
        glyphs.push(id.with_scale_and_position(scaled.scale(), point(caret, 0.0)));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    let left = (canvas.width() as f32 - caret) / 2.0;
    // descent is negative, so this puts the middle of the em box on `centre`
    let baseline = centre + (scaled.ascent() + scaled.descent()) / 2.0;
    for mut glyph in glyphs {
        glyph.position.x += left;
        glyph.position.y = baseline;
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|x, y, coverage| {
            let px = bounds.min.x as i64 + x as i64;
            let py = bounds.min.y as i64 + y as i64;
            put_ink(canvas, px, py, (coverage.clamp(0.0, 1.0) * 255.0) as u8);
        });
    }
}

fn draw_bar(canvas: &mut RgbaImage, line: &str, font_size: f32, centre: f32) {
    let max_width = canvas.width() as f32 * 0.9;
    let width = (line.chars().count() as f32 * font_size * 0.6).min(max_width);
    let half_height = font_size * 0.2;
    let left = (canvas.width() as f32 - width) / 2.0;
    for y in (centre - half_height) as i64..(centre + half_height) as i64 {
        for x in left as i64..(left + width) as i64 {
            put_ink(canvas, x, y, PLACEHOLDER_ALPHA);
        }
    }
}

/// Overlapping glyph edges keep the strongest coverage.
fn put_ink(canvas: &mut RgbaImage, x: i64, y: i64, alpha: u8) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    let [r, g, b] = CAPTION_INK;
    *pixel = Rgba([r, g, b, pixel.0[3].max(alpha)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inked(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p.0[3] > 0).count()
    }

    fn system_font() -> Option<CaptionRasterizer> {
        let candidates: Vec<PathBuf> = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        let rasterizer = CaptionRasterizer::find(&candidates);
        rasterizer.has_font().then_some(rasterizer)
    }

    #[test]
    fn test_caption_font_sizes() {
        assert_eq!(CaptionLayout::for_text("祝平安").font_size, 140.0);
        assert_eq!(CaptionLayout::for_text("abcdef").font_size, 110.0);
        assert_eq!(CaptionLayout::for_text("Memory 2025").font_size, 90.0);
        assert_eq!(CaptionLayout::for_text("a much longer caption").font_size, 70.0);
    }

    #[test]
    fn test_long_caption_splits_in_two() {
        let layout = CaptionLayout::for_text("Memory 2025");
        assert_eq!(layout.lines, vec!["Memory", " 2025"]);
        assert_eq!(layout.line_centres.len(), 2);
        let gap = layout.line_centres[1] - layout.line_centres[0];
        assert!((gap - 90.0 * 1.15).abs() < 1e-4);

        let short = CaptionLayout::for_text("圣诞快乐");
        assert_eq!(short.lines, vec!["圣诞快乐"]);
        assert_eq!(short.line_centres, vec![160.0]);
    }

    #[test]
    fn test_strip_is_canvas_sized_and_clear_when_empty() {
        let image = CaptionRasterizer::default().render("");
        assert_eq!(image.dimensions(), CaptionLayout::CANVAS);
        assert_eq!(inked(&image), 0);
    }

    #[test]
    fn test_bars_depend_on_text() {
        let rasterizer = CaptionRasterizer::default();
        let short = rasterizer.render("A");
        let long = rasterizer.render("a very long caption");
        assert_ne!(short, long);
        assert!(inked(&long) > inked(&short));
        assert_eq!(short.get_pixel(512, 160).0, [0x1a, 0x2a, 0x4a, PLACEHOLDER_ALPHA]);
    }

    #[test]
    fn test_invalid_font_file_is_rejected() {
        let path = std::env::temp_dir().join("memory_tree_not_a_font.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(
            CaptionRasterizer::from_file(&path),
            Err(AssetError::Font { .. })
        ));
        assert!(!CaptionRasterizer::find(&[path.clone()]).has_font());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_glyphs_stay_inside_their_line_band() {
        // Hosts without any of the fonts above only run the bar tests.
        let Some(rasterizer) = system_font() else {
            return;
        };
        let layout = CaptionLayout::for_text("Memory 2025");
        let image = rasterizer.render("Memory 2025");
        assert!(inked(&image) > 0);
        assert_ne!(image, rasterizer.render("Merry"));

        let top = layout.line_centres[0] - layout.line_height;
        let bottom = layout.line_centres[1] + layout.line_height;
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[3] > 0 {
                assert!((y as f32) > top && (y as f32) < bottom, "ink at {x},{y}");
            }
        }
    }
}
