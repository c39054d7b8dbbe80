use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

use crate::color::{allocate_color, hex_to_rgb};
use crate::error::WatermarkError;
use crate::position::Position;

pub const DEFAULT_FONT_SIZE: f32 = 20.0;
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// Font sizes are points; glyphs are rasterised at this resolution.
const RENDER_DPI: f32 = 96.0;

/// Styling for one text overlay. Only `font` is mandatory.
#[derive(Clone, Debug, PartialEq)]
pub struct TextConfig {
    pub font: PathBuf,
    /// Size in points.
    pub size: f32,
    /// `#RGB` / `#RRGGBB`; malformed values render black.
    pub color: String,
    /// GD-style alpha, 0 (opaque) to 127 (transparent).
    pub opacity: u8,
    pub position: Position,
}

impl TextConfig {
    pub fn new(font: impl Into<PathBuf>) -> Self {
        Self {
            font: font.into(),
            size: DEFAULT_FONT_SIZE,
            color: DEFAULT_TEXT_COLOR.to_string(),
            opacity: 0,
            position: Position::default(),
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn position(mut self, position: impl Into<Position>) -> Self {
        self.position = position.into();
        self
    }

    /// Fill colour after hex parsing and alpha conversion.
    pub fn fill(&self) -> Rgba<u8> {
        allocate_color(hex_to_rgb(&self.color), self.opacity)
    }
}

/// Read and parse a TrueType / OpenType font file.
pub fn load_font(path: &Path) -> Result<FontArc, WatermarkError> {
    let bytes = std::fs::read(path).map_err(|e| WatermarkError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    FontArc::try_from_vec(bytes).map_err(|e| WatermarkError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Convert a point size to the pixel scale used by ab_glyph.
pub fn points_to_px(size: f32) -> f32 {
    size * RENDER_DPI / 72.0
}

/// Lay out a single line left-to-right from a baseline origin of (0, 0).
/// Returns the positioned glyphs and the total advance width.
fn layout_line(font: &FontArc, text: &str, px: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(px);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Ink extent of a text run, measured from its baseline origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl TextBox {
    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x).abs()
    }

    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y).abs()
    }
}

/// Bounding box of `text` at `size` points, zero rotation.
///
/// Horizontally the box spans the pen start to the full advance (or ink,
/// whichever is wider); vertically it spans the inked glyph bounds.
/// Empty or whitespace-only text measures zero height.
pub fn measure_text(font: &FontArc, size: f32, text: &str) -> TextBox {
    let px = points_to_px(size);
    let (glyphs, advance) = layout_line(font, text, px);

    let mut bbox = TextBox { min_x: 0.0, min_y: 0.0, max_x: advance, max_y: 0.0 };
    let mut inked = false;

    for (glyph_id, gx) in glyphs {
        let glyph = glyph_id.with_scale_and_position(px, point(gx, 0.0));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let b = outlined.px_bounds();
            bbox.min_x = bbox.min_x.min(b.min.x);
            bbox.max_x = bbox.max_x.max(b.max.x);
            if inked {
                bbox.min_y = bbox.min_y.min(b.min.y);
                bbox.max_y = bbox.max_y.max(b.max.y);
            } else {
                bbox.min_y = b.min.y;
                bbox.max_y = b.max.y;
                inked = true;
            }
        }
    }

    bbox
}

/// Rasterise `text` with its baseline starting at `(origin_x, origin_y)` and
/// blend it onto `canvas`. Pixels falling outside the canvas are clipped.
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &FontArc,
    size: f32,
    origin_x: f32,
    origin_y: f32,
    color: Rgba<u8>,
    text: &str,
) {
    if color[3] == 0 {
        return;
    }

    let px = points_to_px(size);
    let (glyphs, _) = layout_line(font, text, px);
    let (canvas_w, canvas_h) = canvas.dimensions();

    for (glyph_id, gx) in glyphs {
        let glyph = glyph_id.with_scale_and_position(px, point(origin_x + gx, origin_y));
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|x, y, coverage| {
            let cx = bounds.min.x as i32 + x as i32;
            let cy = bounds.min.y as i32 + y as i32;
            if cx < 0 || cy < 0 || cx as u32 >= canvas_w || cy as u32 >= canvas_h {
                return;
            }
            let a = (color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
            if a == 0 {
                return;
            }
            let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
            *dst = blend_over(*dst, Rgba([color[0], color[1], color[2], a]));
        });
    }
}

/// Source-over blend of `top` onto `base` (straight alpha).
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    if top[3] == 0 {
        return base;
    }
    if top[3] == 255 {
        return top;
    }

    let top_a = top[3] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |b: u8, t: u8| {
        let v = (t as f32 * top_a + b as f32 * base_a * (1.0 - top_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(base[0], top[0]),
        channel(base[1], top[1]),
        channel(base[2], top[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::position::NamedPosition;

    /// First common system font found, if any. Font-dependent tests
    /// return early on machines without one.
    pub(crate) fn system_font_path() -> Option<PathBuf> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/Library/Fonts/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    #[test]
    fn config_defaults() {
        let cfg = TextConfig::new("font.ttf");
        assert_eq!(cfg.size, 20.0);
        assert_eq!(cfg.color, "#000000");
        assert_eq!(cfg.opacity, 0);
        assert_eq!(cfg.position, Position::Named(NamedPosition::TopLeft));
        assert_eq!(cfg.fill(), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn config_setters_chain() {
        let cfg = TextConfig::new("f.ttf")
            .size(32.0)
            .color("#f00")
            .opacity(127)
            .position((4, 5));
        assert_eq!(cfg.size, 32.0);
        assert_eq!(cfg.fill(), Rgba([255, 0, 0, 0]));
        assert_eq!(cfg.position, Position::At(4, 5));
    }

    #[test]
    fn missing_font_is_a_font_error() {
        let err = load_font(Path::new("/definitely/not/here.ttf")).unwrap_err();
        assert!(matches!(err, WatermarkError::Font { .. }));
    }

    #[test]
    fn garbage_font_is_a_font_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(load_font(&path), Err(WatermarkError::Font { .. })));
    }

    #[test]
    fn blend_fast_paths() {
        let base = Rgba([10, 20, 30, 255]);
        assert_eq!(blend_over(base, Rgba([1, 2, 3, 0])), base);
        assert_eq!(blend_over(base, Rgba([1, 2, 3, 255])), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn blend_half_alpha_over_opaque() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]));
    }

    #[test]
    fn measured_box_grows_with_text_and_size() {
        let Some(path) = system_font_path() else { return };
        let font = load_font(&path).unwrap();
        let short = measure_text(&font, 20.0, "Hi");
        let long = measure_text(&font, 20.0, "Hi there");
        let big = measure_text(&font, 40.0, "Hi");
        assert!(short.width() > 0.0 && short.height() > 0.0);
        assert!(long.width() > short.width());
        assert!(big.height() > short.height());
        // Capitals sit above the baseline.
        assert!(short.min_y < 0.0);
    }

    #[test]
    fn empty_text_has_no_height() {
        let Some(path) = system_font_path() else { return };
        let font = load_font(&path).unwrap();
        let b = measure_text(&font, 20.0, "");
        assert_eq!(b.width(), 0.0);
        assert_eq!(b.height(), 0.0);
    }

    #[test]
    fn draw_marks_pixels_above_baseline_only_inside_canvas() {
        let Some(path) = system_font_path() else { return };
        let font = load_font(&path).unwrap();
        let mut canvas = RgbaImage::from_pixel(200, 80, Rgba([255, 255, 255, 255]));
        draw_text(&mut canvas, &font, 20.0, 10.0, 50.0, Rgba([0, 0, 0, 255]), "HH");

        let dark: Vec<(u32, u32)> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!dark.is_empty());
        assert!(dark.iter().all(|&(_, y)| y <= 50));
        assert!(dark.iter().all(|&(x, _)| x >= 10));
    }

    #[test]
    fn draw_clips_off_canvas_text() {
        let Some(path) = system_font_path() else { return };
        let font = load_font(&path).unwrap();
        let mut canvas = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        draw_text(&mut canvas, &font, 40.0, -5.0, 30.0, Rgba([0, 0, 0, 255]), "W");
        draw_text(&mut canvas, &font, 40.0, 500.0, 500.0, Rgba([0, 0, 0, 255]), "W");
    }

    #[test]
    fn transparent_color_draws_nothing() {
        let Some(path) = system_font_path() else { return };
        let font = load_font(&path).unwrap();
        let mut canvas = RgbaImage::from_pixel(100, 60, Rgba([255, 255, 255, 255]));
        draw_text(&mut canvas, &font, 20.0, 5.0, 40.0, Rgba([0, 0, 0, 0]), "Hello");
        assert!(canvas.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }
}
