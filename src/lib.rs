//! Stamp watermark images and text overlays onto a base image and export the
//! result as JPEG or PNG.
//!
//! ```no_run
//! use watermark::{NamedPosition, TextConfig, Watermark};
//!
//! # fn main() -> Result<(), watermark::WatermarkError> {
//! let mut wm = Watermark::load("photo.jpg")?;
//! wm.add_mark("logo.png", 0.2, NamedPosition::BottomRight)?
//!     .add_text("ACME", &TextConfig::new("DejaVuSans.ttf").color("#fff").position("center"))?;
//! assert!(wm.export("photo_marked", "png", 9));
//! wm.release();
//! # Ok(())
//! # }
//! ```

pub mod logger;

pub mod cli;
pub mod color;
pub mod compositor;
pub mod error;
pub mod io;
pub mod position;
pub mod text;

pub use compositor::{Mark, Watermark, DEFAULT_MARK_SCALE};
pub use error::WatermarkError;
pub use io::ExportFormat;
pub use position::{NamedPosition, Position};
pub use text::TextConfig;
