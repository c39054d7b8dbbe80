// ============================================================================
// WATERMARK SESSION — base image, working canvas, applied marks
// ============================================================================
//
// Typical use:
//   let mut wm = Watermark::load("photo.jpg")?;
//   wm.add_mark("logo.png", 0.2, NamedPosition::BottomRight)?
//     .add_text("© 2024", &TextConfig::new("DejaVuSans.ttf").position("center"))?;
//   wm.export("photo_marked", "png", 9);
//   wm.release();
//
// Every mutator draws straight onto the canvas as it exists at call time,
// so later marks and text are layered over earlier ones.

use image::{imageops, Pixel, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

use crate::error::WatermarkError;
use crate::io::{decode_image, encode_and_write, ExportFormat};
use crate::position::{scaled_mark_size, NamedPosition, Position};
use crate::text::{blend_over, draw_text, load_font, measure_text, TextConfig};
use crate::{log_err, log_info};

/// Default mark width as a fraction of the base image width.
pub const DEFAULT_MARK_SCALE: f32 = 0.15;

/// Resampling filter for marks.
const RESAMPLE_FILTER: imageops::FilterType = imageops::FilterType::Triangle;

/// One applied watermark image.
#[derive(Debug)]
pub struct Mark {
    pub image: RgbaImage,
    pub scaled_width: f32,
    pub scaled_height: f32,
    pub position: Position,
}

/// Everything acquired by `load`, released together.
#[derive(Debug)]
struct Session {
    base: RgbaImage,
    canvas: RgbaImage,
    marks: Vec<Mark>,
}

impl Session {
    fn open(path: &Path) -> Result<Session, WatermarkError> {
        let base = decode_image(path)?;
        let (w, h) = base.dimensions();

        // True-colour canvas starts opaque black; the base is composited on
        // top at 1:1, so transparent base pixels come out black.
        let black = Rgba([0, 0, 0, 255]);
        let canvas = RgbaImage::from_fn(w, h, |x, y| blend_over(black, *base.get_pixel(x, y)));

        Ok(Session { base, canvas, marks: Vec::new() })
    }
}

/// Resample `mark` to `dst_w`×`dst_h` and blend it with its top-left corner
/// at `(x, y)`. Only destination pixels that land on the canvas are sampled,
/// so memory stays bounded by the mark and the canvas, never the target size.
///
/// Downscaling is done up front with the resize filter (the intermediate is
/// never larger than the mark); any remaining upscale is bilinear, evaluated
/// per visible pixel.
fn composite_resampled(canvas: &mut RgbaImage, mark: &RgbaImage, x: i64, y: i64, dst_w: u64, dst_h: u64) {
    let (canvas_w, canvas_h) = canvas.dimensions();

    // Visible part of the destination rectangle, in canvas coordinates.
    let vis_x0 = (x as f64).max(0.0);
    let vis_y0 = (y as f64).max(0.0);
    let vis_x1 = (x as f64 + dst_w as f64).min(canvas_w as f64);
    let vis_y1 = (y as f64 + dst_h as f64).min(canvas_h as f64);
    if vis_x0 >= vis_x1 || vis_y0 >= vis_y1 {
        return;
    }
    let (vis_x0, vis_y0, vis_x1, vis_y1) = (vis_x0 as u32, vis_y0 as u32, vis_x1 as u32, vis_y1 as u32);

    let (mark_w, mark_h) = mark.dimensions();
    let src_w = dst_w.min(mark_w as u64) as u32;
    let src_h = dst_h.min(mark_h as u64) as u32;
    let prefiltered;
    let src: &RgbaImage = if (src_w, src_h) == (mark_w, mark_h) {
        mark
    } else {
        prefiltered = imageops::resize(mark, src_w, src_h, RESAMPLE_FILTER);
        &prefiltered
    };

    let cols: Vec<(u32, u32, f64)> = (vis_x0..vis_x1)
        .map(|cx| sample_axis(cx as f64 - x as f64, dst_w, src_w))
        .collect();
    let rows: Vec<(u32, u32, f64)> = (vis_y0..vis_y1)
        .map(|cy| sample_axis(cy as f64 - y as f64, dst_h, src_h))
        .collect();

    for (cy, &(y0, y1, ty)) in (vis_y0..vis_y1).zip(rows.iter()) {
        for (cx, &(x0, x1, tx)) in (vis_x0..vis_x1).zip(cols.iter()) {
            let top = lerp_pixel(
                lerp_pixel(*src.get_pixel(x0, y0), *src.get_pixel(x1, y0), tx),
                lerp_pixel(*src.get_pixel(x0, y1), *src.get_pixel(x1, y1), tx),
                ty,
            );
            canvas.get_pixel_mut(cx, cy).blend(&top);
        }
    }
}

/// Map destination offset `d` (pixel index within a `dst_len` span) onto a
/// `src_len` span: the two neighbouring source indices and the weight of the
/// second. Pixel centres line up, so equal lengths sample exactly.
fn sample_axis(d: f64, dst_len: u64, src_len: u32) -> (u32, u32, f64) {
    let max = (src_len - 1) as f64;
    let s = ((d + 0.5) * src_len as f64 / dst_len as f64 - 0.5).clamp(0.0, max);
    let i0 = s.floor();
    let i1 = (i0 + 1.0).min(max);
    (i0 as u32, i1 as u32, s - i0)
}

fn lerp_pixel(a: Rgba<u8>, b: Rgba<u8>, t: f64) -> Rgba<u8> {
    if t == 0.0 {
        return a;
    }
    let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * t).round().clamp(0.0, 255.0) as u8;
    Rgba([mix(0), mix(1), mix(2), mix(3)])
}

/// A watermarking session over one base image.
///
/// Created empty with [`Watermark::new`] or loaded with [`Watermark::load`].
/// Operations on an empty (or released) session fail with
/// [`WatermarkError::InvalidState`]; [`Watermark::export`] returns `false`.
#[derive(Debug, Default)]
pub struct Watermark {
    session: Option<Session>,
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `path` and start a session on it.
    pub fn load(path: impl AsRef<Path>) -> Result<Watermark, WatermarkError> {
        let mut wm = Watermark::new();
        wm.open(path)?;
        Ok(wm)
    }

    /// Load `path` into this session, replacing any previously loaded image
    /// along with its canvas and marks.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, WatermarkError> {
        let path = path.as_ref();
        let session = Session::open(path)?;
        log_info!(
            "Loaded {} ({}x{})",
            path.display(),
            session.base.width(),
            session.base.height()
        );
        self.session = Some(session);
        Ok(self)
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Base image width, or 0 with nothing loaded.
    pub fn width(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.base.width())
    }

    /// Base image height, or 0 with nothing loaded.
    pub fn height(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.base.height())
    }

    /// The working canvas with every mark and text applied so far.
    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.session.as_ref().map(|s| &s.canvas)
    }

    /// Applied marks in call order.
    pub fn marks(&self) -> &[Mark] {
        self.session.as_ref().map(|s| s.marks.as_slice()).unwrap_or(&[])
    }

    fn session_mut(&mut self, op: &'static str) -> Result<&mut Session, WatermarkError> {
        self.session.as_mut().ok_or(WatermarkError::InvalidState(op))
    }

    /// Overlay the image at `path`, scaled to `scale` × the base width with
    /// its own aspect ratio kept, at `position`.
    pub fn add_mark(
        &mut self,
        path: impl AsRef<Path>,
        scale: f32,
        position: impl Into<Position>,
    ) -> Result<&mut Self, WatermarkError> {
        let path = path.as_ref();
        let position = position.into();
        let session = self.session_mut("add_mark")?;

        let mark = decode_image(path)?;
        let (mark_w, mark_h) = mark.dimensions();
        let (canvas_w, canvas_h) = session.canvas.dimensions();

        let (target_w, target_h) = scaled_mark_size(canvas_w, mark_w, mark_h, scale);
        let (x, y) = position.resolve_mark(canvas_w as f32, canvas_h as f32, target_w, target_h);

        // Fractional sizes and offsets truncate to whole pixels; a mark that
        // truncates to zero in either direction draws nothing.
        let px_w = target_w as u64;
        let px_h = target_h as u64;
        if px_w > 0 && px_h > 0 {
            composite_resampled(&mut session.canvas, &mark, x as i64, y as i64, px_w, px_h);
        }

        log_info!(
            "Mark {} at ({}, {}) size {}x{}",
            path.display(),
            x as i64,
            y as i64,
            px_w,
            px_h
        );

        session.marks.push(Mark {
            image: mark,
            scaled_width: target_w,
            scaled_height: target_h,
            position,
        });
        Ok(self)
    }

    /// [`Watermark::add_mark`] with the default scale at `top_left`.
    pub fn add_mark_default(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, WatermarkError> {
        self.add_mark(path, DEFAULT_MARK_SCALE, NamedPosition::TopLeft)
    }

    /// Draw `text` onto the canvas styled by `config`.
    ///
    /// Named positions go through the text table using the measured box;
    /// explicit coordinates are the baseline origin.
    pub fn add_text(&mut self, text: &str, config: &TextConfig) -> Result<&mut Self, WatermarkError> {
        let session = self.session_mut("add_text")?;

        let font = load_font(&config.font)?;
        let color = config.fill();
        let bbox = measure_text(&font, config.size, text);
        let (canvas_w, canvas_h) = session.canvas.dimensions();
        let (x, y) = config
            .position
            .resolve_text(canvas_w as f32, canvas_h as f32, bbox.width(), bbox.height());

        // Whole-pixel origin, like the mark placement.
        let (x, y) = (x.trunc(), y.trunc());
        draw_text(&mut session.canvas, &font, config.size, x, y, color, text);

        log_info!("Text {:?} at ({}, {}) size {}", text, x, y, config.size);
        Ok(self)
    }

    /// Baseline origin a named text position resolves to on this canvas.
    pub fn text_position(
        &self,
        position: NamedPosition,
        text_width: f32,
        text_height: f32,
    ) -> Result<(f32, f32), WatermarkError> {
        let session = self.session.as_ref().ok_or(WatermarkError::InvalidState("text_position"))?;
        let (w, h) = session.canvas.dimensions();
        Ok(crate::position::text_position(position, w as f32, h as f32, text_width, text_height))
    }

    /// Write the canvas to `<filename>.jpg` (`jpg` / `jpeg`) or
    /// `<filename>.png` (`png`). Returns the written path.
    pub fn try_export(&self, filename: &str, format: &str, quality: u8) -> Result<PathBuf, WatermarkError> {
        let session = self.session.as_ref().ok_or(WatermarkError::InvalidState("export"))?;
        let format = ExportFormat::parse(format)
            .ok_or_else(|| WatermarkError::UnsupportedFormat(format.to_string()))?;
        let path = format.output_path(filename);
        encode_and_write(&session.canvas, &path, format, quality)?;
        log_info!("Exported {}", path.display());
        Ok(path)
    }

    /// [`Watermark::try_export`] reduced to success / failure. Unknown formats
    /// write nothing and return `false`.
    pub fn export(&self, filename: &str, format: &str, quality: u8) -> bool {
        match self.try_export(filename, format, quality) {
            Ok(_) => true,
            Err(e) => {
                log_err!("Export of '{}' failed: {}", filename, e);
                false
            }
        }
    }

    /// Free the base image, canvas and all mark images. Safe to call twice.
    pub fn release(&mut self) -> &mut Self {
        if let Some(session) = self.session.take() {
            log_info!("Released session ({} marks)", session.marks.len());
        }
        self
    }
}
