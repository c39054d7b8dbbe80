// ============================================================================
// COLOR HELPERS — hex parsing and GD-style alpha
// ============================================================================

use image::Rgba;

/// Largest alpha value on the 7-bit GD scale (fully transparent).
pub const MAX_GD_ALPHA: u8 = 127;

/// Convert `#RRGGBB`, `#RGB` (or the same without `#`) to an RGB triple.
///
/// Any other length yields black. Non-hex characters are skipped rather than
/// rejected, so a malformed string still produces a colour and never an error.
pub fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    let digits: Vec<char> = hex.chars().collect();

    match digits.len() {
        6 => (
            hex_byte(&digits[0..2]),
            hex_byte(&digits[2..4]),
            hex_byte(&digits[4..6]),
        ),
        3 => (
            hex_byte(&[digits[0], digits[0]]),
            hex_byte(&[digits[1], digits[1]]),
            hex_byte(&[digits[2], digits[2]]),
        ),
        _ => (0, 0, 0),
    }
}

/// Two-digit hex value; invalid digits are ignored.
fn hex_byte(digits: &[char]) -> u8 {
    digits
        .iter()
        .filter_map(|c| c.to_digit(16))
        .fold(0u8, |acc, d| acc.wrapping_mul(16).wrapping_add(d as u8))
}

/// Build a text colour from RGB plus a GD alpha (0 = opaque, 127 = transparent).
/// Values above 127 are treated as fully transparent.
pub fn allocate_color(rgb: (u8, u8, u8), gd_alpha: u8) -> Rgba<u8> {
    let transparency = gd_alpha.min(MAX_GD_ALPHA) as u32;
    let a = ((MAX_GD_ALPHA as u32 - transparency) * 255 + MAX_GD_ALPHA as u32 / 2) / MAX_GD_ALPHA as u32;
    Rgba([rgb.0, rgb.1, rgb.2, a as u8])
}
