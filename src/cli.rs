// ============================================================================
// watermark CLI — stamp marks and text onto one or many images
// ============================================================================
//
// Usage examples:
//   watermark -i photo.jpg --mark logo.png --position bottom_right -o stamped
//   watermark -i photo.jpg --mark logo.png --scale 0.3 -o stamped.png -q 9
//   watermark -i shots/*.jpg --mark logo.png --output-dir out/ -f png
//   watermark -i photo.jpg --text "© ACME" --font DejaVuSans.ttf --color "#fff" \
//             --text-position center
//
// Marks are applied in the order given, then the text (if any), then the
// canvas is exported.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::compositor::{Watermark, DEFAULT_MARK_SCALE};
use crate::error::WatermarkError;
use crate::io::{DEFAULT_EXPORT_NAME, DEFAULT_QUALITY};
use crate::position::Position;
use crate::text::{TextConfig, DEFAULT_FONT_SIZE, DEFAULT_TEXT_COLOR};
use crate::{log_info, log_warn};

/// Apply image watermarks and text overlays to images.
#[derive(Parser, Debug)]
#[command(
    name = "watermark",
    about = "Apply image watermarks and text overlays to images",
    long_about = "Overlay one or more scaled watermark images and an optional text\n\
                  line onto each input image, then export as JPEG or PNG.\n\n\
                  Positions: top_left, top_center, top_right, middle_left, center,\n\
                  middle_right, bottom_left, bottom_center, bottom_right, or X,Y.\n\n\
                  Example:\n  \
                  watermark -i photo.jpg --mark logo.png --position bottom_right -o out"
)]
pub struct CliArgs {
    /// Base image file(s). Glob patterns accepted (e.g. "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Watermark image; repeat to apply several in order.
    #[arg(short, long, value_name = "FILE")]
    pub mark: Vec<PathBuf>,

    /// Mark width as a fraction of the base image width.
    #[arg(long, default_value_t = DEFAULT_MARK_SCALE, value_name = "FRACTION")]
    pub scale: f32,

    /// Mark position: a named position or X,Y.
    #[arg(short, long, default_value = "top_left", value_name = "POS")]
    pub position: Position,

    /// Text to draw after the marks.
    #[arg(short, long, requires = "font")]
    pub text: Option<String>,

    /// Font file used for --text.
    #[arg(long, value_name = "FONT.ttf")]
    pub font: Option<PathBuf>,

    /// Text size in points.
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    pub size: f32,

    /// Text colour, #RGB or #RRGGBB.
    #[arg(long, default_value = DEFAULT_TEXT_COLOR, value_name = "HEX")]
    pub color: String,

    /// Text transparency, 0 (opaque) to 127 (invisible).
    #[arg(long, default_value_t = 0, value_name = "0-127")]
    pub opacity: u8,

    /// Text position: a named position or X,Y (baseline origin).
    #[arg(long, default_value = "top_left", value_name = "POS")]
    pub text_position: Position,

    /// Output name; the extension is added from the format.
    /// Only valid for single-file input.
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing; files keep their input stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: jpg, jpeg or png. Inferred from --output when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100) or PNG compression level (0-9).
    #[arg(short, long, default_value_t = DEFAULT_QUALITY)]
    pub quality: u8,

    /// Print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run all inputs; `SUCCESS` only when every file was exported.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only names a single file.\n\
             Use --output-dir for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let format = resolve_format(args.format.as_deref(), args.output.as_deref());
    let text_config = args.font.as_ref().map(|font| {
        TextConfig::new(font.clone())
            .size(args.size)
            .color(args.color.clone())
            .opacity(args.opacity)
            .position(args.text_position)
    });

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input.display());
        }
        let started = Instant::now();

        let name = output_name(input, args.output.as_deref(), args.output_dir.as_deref(), multi);
        match run_one(input, &name, &args, text_config.as_ref(), &format) {
            Ok(path) => {
                log_info!("{} -> {}", input.display(), path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        path.display(),
                        started.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn run_one(
    input: &Path,
    name: &str,
    args: &CliArgs,
    text: Option<&TextConfig>,
    format: &str,
) -> Result<PathBuf, WatermarkError> {
    let mut wm = Watermark::load(input)?;
    for mark in &args.mark {
        wm.add_mark(mark, args.scale, args.position)?;
    }
    if let (Some(line), Some(config)) = (args.text.as_deref(), text) {
        wm.add_text(line, config)?;
    }
    let result = wm.try_export(name, format, args.quality);
    wm.release();
    result
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                    log_warn!("Pattern '{}' matched no files", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
                log_warn!("Invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// `--format` wins; otherwise a jpg/jpeg/png extension on `--output`;
/// otherwise jpg. Unknown `--format` values pass through and fail at export.
fn resolve_format(format_arg: Option<&str>, output: Option<&Path>) -> String {
    if let Some(f) = format_arg {
        return f.to_lowercase();
    }
    let ext = output
        .and_then(|o| o.extension())
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" => ext,
        _ => "jpg".to_string(),
    }
}

/// Output name without extension.
///
/// 1. `--output` (a known image extension is stripped, it is re-added on export)
/// 2. `--output-dir` joined with the input stem
/// 3. batch without a directory: `<stem>_watermarked` next to the input
/// 4. single input: `watermarked`
fn output_name(input: &Path, output: Option<&Path>, output_dir: Option<&Path>, multi: bool) -> String {
    if let Some(out) = output {
        let known = matches!(
            out.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
            Some("jpg" | "jpeg" | "png")
        );
        let out = if known { out.with_extension("") } else { out.to_path_buf() };
        return out.to_string_lossy().into_owned();
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXPORT_NAME.to_string());

    if let Some(dir) = output_dir {
        return dir.join(stem).to_string_lossy().into_owned();
    }

    if multi {
        let parent = input.parent().unwrap_or(Path::new("."));
        return parent
            .join(format!("{}_{}", stem, DEFAULT_EXPORT_NAME))
            .to_string_lossy()
            .into_owned();
    }

    DEFAULT_EXPORT_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::NamedPosition;

    #[test]
    fn parses_full_command_line() {
        let args = CliArgs::try_parse_from([
            "watermark", "-i", "a.jpg", "b.jpg", "--mark", "logo.png", "--mark", "sig.png",
            "--scale", "0.3", "--position", "bottom_right", "--text", "hi", "--font", "f.ttf",
            "--text-position", "12,34", "--output-dir", "out", "-f", "png", "-q", "9",
        ])
        .unwrap();
        assert_eq!(args.input, vec!["a.jpg", "b.jpg"]);
        assert_eq!(args.mark.len(), 2);
        assert_eq!(args.scale, 0.3);
        assert_eq!(args.position, Position::Named(NamedPosition::BottomRight));
        assert_eq!(args.text_position, Position::At(12, 34));
        assert_eq!(args.quality, 9);
    }

    #[test]
    fn defaults_follow_library_defaults() {
        let args = CliArgs::try_parse_from(["watermark", "-i", "a.jpg"]).unwrap();
        assert_eq!(args.scale, DEFAULT_MARK_SCALE);
        assert_eq!(args.position, Position::default());
        assert_eq!(args.quality, 100);
        assert_eq!(args.size, 20.0);
        assert_eq!(args.color, "#000000");
        assert_eq!(args.opacity, 0);
    }

    #[test]
    fn text_requires_font() {
        assert!(CliArgs::try_parse_from(["watermark", "-i", "a.jpg", "--text", "hi"]).is_err());
    }

    #[test]
    fn bad_position_is_rejected() {
        assert!(CliArgs::try_parse_from(["watermark", "-i", "a.jpg", "--position", "left"]).is_err());
    }

    #[test]
    fn format_resolution() {
        assert_eq!(resolve_format(Some("PNG"), None), "png");
        assert_eq!(resolve_format(Some("gif"), None), "gif");
        assert_eq!(resolve_format(None, Some(Path::new("x.jpeg"))), "jpeg");
        assert_eq!(resolve_format(None, Some(Path::new("x.png"))), "png");
        assert_eq!(resolve_format(None, Some(Path::new("x.tiff"))), "jpg");
        assert_eq!(resolve_format(None, None), "jpg");
    }

    #[test]
    fn output_names() {
        let input = Path::new("shots/a.jpg");
        assert_eq!(output_name(input, Some(Path::new("out/stamped.png")), None, false), "out/stamped");
        assert_eq!(output_name(input, Some(Path::new("stamped")), None, false), "stamped");
        assert_eq!(
            output_name(input, None, Some(Path::new("dir")), true),
            Path::new("dir").join("a").to_string_lossy()
        );
        assert_eq!(
            output_name(input, None, None, true),
            Path::new("shots").join("a_watermarked").to_string_lossy()
        );
        assert_eq!(output_name(input, None, None, false), "watermarked");
    }

    #[test]
    fn literal_inputs_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        std::fs::write(&a, b"x").unwrap();
        let a = a.to_string_lossy().into_owned();
        let found = resolve_inputs(&[a.clone(), a.clone()]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn glob_inputs_expand() {
        let dir = tempfile::tempdir().unwrap();
        for n in ["1.png", "2.png", "3.txt"] {
            std::fs::write(dir.path().join(n), b"x").unwrap();
        }
        let pattern = dir.path().join("*.png").to_string_lossy().into_owned();
        assert_eq!(resolve_inputs(&[pattern]).len(), 2);
    }
}
