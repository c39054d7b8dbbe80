use image::ImageError;
use std::path::PathBuf;

/// Error type for watermark session operations.
#[derive(Debug)]
pub enum WatermarkError {
    /// Base or watermark image could not be read or decoded.
    Decode { path: PathBuf, source: ImageError },
    /// Font file could not be read or parsed.
    Font { path: PathBuf, reason: String },
    /// Creating the output file or encoding the canvas failed.
    Encode(ImageError),
    /// Export format other than jpg / jpeg / png.
    UnsupportedFormat(String),
    /// Operation called with no loaded image (never loaded, or released).
    InvalidState(&'static str),
}

impl std::fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatermarkError::Decode { path, source } => {
                write!(f, "could not decode '{}': {}", path.display(), source)
            }
            WatermarkError::Font { path, reason } => {
                write!(f, "could not load font '{}': {}", path.display(), reason)
            }
            WatermarkError::Encode(e) => write!(f, "encode error: {}", e),
            WatermarkError::UnsupportedFormat(fmt) => {
                write!(f, "unsupported export format '{}' (expected jpg, jpeg or png)", fmt)
            }
            WatermarkError::InvalidState(op) => {
                write!(f, "{} called before an image was loaded (or after release)", op)
            }
        }
    }
}

impl std::error::Error for WatermarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatermarkError::Decode { source, .. } => Some(source),
            WatermarkError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for WatermarkError {
    fn from(e: ImageError) -> Self {
        WatermarkError::Encode(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_the_operation() {
        let msg = WatermarkError::InvalidState("add_mark").to_string();
        assert!(msg.starts_with("add_mark called before"));
    }

    #[test]
    fn unsupported_format_mentions_value() {
        let msg = WatermarkError::UnsupportedFormat("gif".into()).to_string();
        assert!(msg.contains("'gif'"));
    }
}
