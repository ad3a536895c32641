//! Text faces used by the poster composer.
//!
//! A configured TrueType file is preferred. When it is missing or cannot be
//! parsed, a built-in 5x7 bitmap face is used so composition still succeeds.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::warn;

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
/// Glyph cell including one column/row of spacing.
const CELL_COLS: u32 = GLYPH_COLS + 1;
const CELL_ROWS: u32 = GLYPH_ROWS + 1;

/// A font the composer can measure and draw with.
#[derive(Clone)]
pub enum TextFace {
    TrueType(FontArc),
    /// Built-in 5x7 bitmap font, upper-case only.
    Builtin,
}

impl std::fmt::Debug for TextFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrueType(_) => f.write_str("TextFace::TrueType"),
            Self::Builtin => f.write_str("TextFace::Builtin"),
        }
    }
}

impl TextFace {
    /// Load a TrueType/OpenType font, falling back to the built-in face.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Font unavailable, using built-in face");
                return Self::Builtin;
            }
        };

        match FontArc::try_from_vec(bytes) {
            Ok(font) => Self::TrueType(font),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Font unreadable, using built-in face");
                Self::Builtin
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// Rendered `(width, height)` of `text` at pixel size `size`.
    pub fn measure(&self, text: &str, size: u32) -> (u32, u32) {
        match self {
            Self::TrueType(font) => text_size(PxScale::from(size as f32), font, text),
            Self::Builtin => {
                let scale = builtin_scale(size);
                let chars = text.chars().count() as u32;
                if chars == 0 {
                    return (0, 0);
                }
                // No trailing spacing column after the last glyph.
                let width = (chars * CELL_COLS - 1) * scale;
                (width, GLYPH_ROWS * scale)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: u32, color: Rgb<u8>) {
        match self {
            Self::TrueType(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size as f32), font, text);
            }
            Self::Builtin => draw_builtin(canvas, text, x, y, builtin_scale(size), color),
        }
    }
}

/// Pixels per bitmap dot so a glyph cell is roughly `size` pixels tall.
fn builtin_scale(size: u32) -> u32 {
    (size / CELL_ROWS).max(1)
}

fn draw_builtin(canvas: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let step = (CELL_COLS * scale) as i32;

    for (i, ch) in text.chars().enumerate() {
        let origin_x = x + i as i32 * step;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_COLS {
                if bits & (1 << (GLYPH_COLS - 1 - col)) == 0 {
                    continue;
                }
                let dot_x = origin_x + (col * scale) as i32;
                let dot_y = y + (row as u32 * scale) as i32;
                for dy in 0..scale as i32 {
                    for dx in 0..scale as i32 {
                        let (px, py) = (dot_x + dx, dot_y + dy);
                        if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Row bitmaps, most significant of the low five bits is the leftmost column.
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '\u{2022}' => [0x00, 0x00, 0x0E, 0x0E, 0x0E, 0x00, 0x00],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}
