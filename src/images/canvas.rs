//! Canvas preparation: source loading, resizing, the generated fallback
//! background and the bottom gradient.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;

/// Height of the generated fallback canvas.
pub const FALLBACK_HEIGHT: u32 = 1600;

const BACKGROUND: Rgb<u8> = Rgb([20, 20, 30]);
const PATTERN: Rgb<u8> = Rgb([35, 35, 50]);
const BADGE_FILL: Rgb<u8> = Rgb([40, 40, 60]);
const BADGE_RING: Rgb<u8> = Rgb([80, 80, 120]);
const STRIP: Rgb<u8> = Rgb([60, 60, 90]);
const PATTERN_SPACING: u32 = 80;

/// Fraction of the height above which the gradient is fully transparent.
const GRADIENT_START: f32 = 0.55;
/// Alpha reached at the bottom row.
const GRADIENT_MAX_ALPHA: f32 = 230.0 / 255.0;
const GRADIENT_EXPONENT: f32 = 1.5;

/// Open an image file and scale it to `width`, preserving aspect ratio.
pub fn load_resized(path: &Path, width: u32) -> Result<RgbImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    Ok(img.resize(width, u32::MAX, FilterType::Lanczos3).to_rgb8())
}

/// Dark diagonal-pattern canvas with a film-strip badge in the middle.
pub fn fallback_canvas(width: u32) -> RgbImage {
    let height = FALLBACK_HEIGHT;
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if (x + y) % PATTERN_SPACING == 0 {
            *pixel = PATTERN;
        }
    }

    let (cx, cy) = ((width / 2) as i32, (height / 2) as i32);
    draw_filled_circle_mut(&mut canvas, (cx, cy), 120, BADGE_FILL);
    for r in 118..=120 {
        draw_hollow_circle_mut(&mut canvas, (cx, cy), r, BADGE_RING);
    }
    for dy in [-40, 0, 40] {
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(cx - 60, cy + dy - 15).of_size(120, 30),
            STRIP,
        );
    }

    canvas
}

/// Darken the lower part of the canvas, alpha growing with a power curve.
pub fn apply_gradient(canvas: &mut RgbImage) {
    let height = canvas.height();
    if height == 0 {
        return;
    }
    let start = (height as f32 * GRADIENT_START) as u32;
    let span = (height - start).max(1) as f32;

    for (_, y, pixel) in canvas.enumerate_pixels_mut() {
        if y < start {
            continue;
        }
        let t = (y - start) as f32 / span;
        let keep = 1.0 - GRADIENT_MAX_ALPHA * t.powf(GRADIENT_EXPONENT);
        for channel in pixel.0.iter_mut() {
            *channel = (*channel as f32 * keep).round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_canvas_dimensions_and_background() {
        let canvas = fallback_canvas(1080);
        assert_eq!(canvas.dimensions(), (1080, FALLBACK_HEIGHT));
        assert_eq!(canvas.get_pixel(1, 1), &BACKGROUND);
        assert_eq!(canvas.get_pixel(540, 800), &STRIP);
    }

    #[test]
    fn test_fallback_canvas_is_deterministic() {
        assert_eq!(fallback_canvas(300), fallback_canvas(300));
    }

    #[test]
    fn test_gradient_top_untouched_bottom_darkened() {
        let mut canvas = RgbImage::from_pixel(10, 100, Rgb([200, 200, 200]));
        apply_gradient(&mut canvas);

        assert_eq!(canvas.get_pixel(5, 0), &Rgb([200, 200, 200]));
        assert_eq!(canvas.get_pixel(5, 54), &Rgb([200, 200, 200]));

        let mid = canvas.get_pixel(5, 77)[0];
        let bottom = canvas.get_pixel(5, 99)[0];
        assert!(mid < 200);
        assert!(bottom < mid);
        assert!(bottom < 40);
    }

    #[test]
    fn test_load_resized_preserves_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src.png");
        RgbImage::from_pixel(200, 300, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let resized = load_resized(&path, 100).unwrap();
        assert_eq!(resized.dimensions(), (100, 150));
    }

    #[test]
    fn test_load_resized_missing_file() {
        assert!(load_resized(Path::new("/nonexistent/poster.jpg"), 100).is_err());
    }
}
