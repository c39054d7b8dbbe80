use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageEncoder, ImageError, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::WatermarkError;

pub const DEFAULT_EXPORT_NAME: &str = "watermarked";
pub const DEFAULT_QUALITY: u8 = 100;

/// Raster formats the canvas can be exported to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    /// `jpg` / `jpeg` / `png`, matched exactly. Anything else is unsupported.
    pub fn parse(format: &str) -> Option<ExportFormat> {
        match format {
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "png"          => Some(ExportFormat::Png),
            _              => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png  => "png",
        }
    }

    /// `<filename>.<ext>`; directory components in `filename` are kept as-is.
    pub fn output_path(&self, filename: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", filename, self.extension()))
    }
}

/// Decode any raster format the `image` crate understands into RGBA.
pub fn decode_image(path: &Path) -> Result<RgbaImage, WatermarkError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| WatermarkError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Map a 0–9 zlib-style level onto the PNG encoder's presets.
/// Out-of-range values use the encoder default.
pub fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        7..=9 => CompressionType::Best,
        _     => CompressionType::Default,
    }
}

/// Encode and write an image to a file, overwriting any existing file.
///
/// `quality` is a 1–100 JPEG quality or a 0–9 PNG compression level,
/// depending on `format`.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: ExportFormat,
    quality: u8,
) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut writer, png_compression(quality), FilterType::Adaptive);
            encoder.write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn format_keywords() {
        assert_eq!(ExportFormat::parse("jpg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::parse("jpeg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::parse("png"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::parse("gif"), None);
        assert_eq!(ExportFormat::parse("PNG"), None);
    }

    #[test]
    fn jpeg_always_uses_jpg_extension() {
        let fmt = ExportFormat::parse("jpeg").unwrap();
        assert_eq!(fmt.output_path("out/shot"), PathBuf::from("out/shot.jpg"));
        assert_eq!(ExportFormat::Png.output_path("a"), PathBuf::from("a.png"));
    }

    #[test]
    fn png_levels() {
        assert!(matches!(png_compression(0), CompressionType::Fast));
        assert!(matches!(png_compression(5), CompressionType::Default));
        assert!(matches!(png_compression(9), CompressionType::Best));
        assert!(matches!(png_compression(100), CompressionType::Default));
    }

    #[test]
    fn decode_missing_file_is_decode_error() {
        let err = decode_image(Path::new("/no/such/image.png")).unwrap_err();
        assert!(matches!(err, WatermarkError::Decode { .. }));
    }

    #[test]
    fn decode_non_image_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(matches!(decode_image(&path), Err(WatermarkError::Decode { .. })));
    }

    #[test]
    fn png_written_losslessly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px.png");
        let img = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));
        encode_and_write(&img, &path, ExportFormat::Png, 9).unwrap();
        let back = decode_image(&path).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn jpeg_written_and_decodable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("px.jpg");
        let img = RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 255]));
        encode_and_write(&img, &path, ExportFormat::Jpeg, 90).unwrap();
        let back = decode_image(&path).unwrap();
        assert_eq!(back.dimensions(), (16, 16));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let img = RgbaImage::new(1, 1);
        let res = encode_and_write(&img, Path::new("/no/such/dir/out.png"), ExportFormat::Png, 0);
        assert!(res.is_err());
    }
}
