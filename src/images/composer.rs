//! Branded poster composition.
//!
//! The source image is scaled to a fixed width, darkened towards the bottom,
//! and overlaid with the title (auto-fitted, drop shadow) and a tag line such
//! as `S02 E06 • 720p • WEB-DL • 2024 • ★ 8.1`. Output is a deterministic
//! function of the inputs and the configured fonts.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use reelforge_common::ProviderMetadata;
use reelforge_parser::ParsedFilename;
use tracing::{debug, info, warn};

use super::canvas::{apply_gradient, fallback_canvas, load_resized};
use super::font::TextFace;
use crate::config::{AssetsConfig, ComposerConfig};

const TITLE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const SUBTITLE_COLOR: Rgb<u8> = Rgb([200, 200, 200]);
const SHADOW_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const ELLIPSIS: &str = "...";
/// Distance between the bottom edge and the tag line.
const BOTTOM_PADDING: u32 = 60;
const LINE_GAP: u32 = 20;
const SIZE_STEP: u32 = 2;
const SEPARATOR: &str = " \u{2022} ";

/// Renders final posters from a source image and parsed filename.
#[derive(Debug, Clone)]
pub struct PosterComposer {
    config: ComposerConfig,
    output_dir: PathBuf,
    fallback_image: PathBuf,
    bold: TextFace,
    regular: TextFace,
}

/// Title font size and the (possibly truncated) text drawn at that size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedTitle {
    pub text: String,
    pub size: u32,
}

impl PosterComposer {
    /// Build a composer, loading fonts from the configured asset paths.
    pub fn new(config: ComposerConfig, assets: &AssetsConfig, output_dir: PathBuf) -> Self {
        Self::with_faces(
            config,
            output_dir,
            assets.fallback_image.clone(),
            TextFace::load(&assets.bold_font),
            TextFace::load(&assets.regular_font),
        )
    }

    pub fn with_faces(
        config: ComposerConfig,
        output_dir: PathBuf,
        fallback_image: PathBuf,
        bold: TextFace,
        regular: TextFace,
    ) -> Self {
        Self {
            config,
            output_dir,
            fallback_image,
            bold,
            regular,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn fallback_image(&self) -> &Path {
        &self.fallback_image
    }

    /// Compose the poster for `parsed` on top of `source` and write it.
    ///
    /// `None`, a missing file or an undecodable file all degrade to the
    /// configured fallback background, then to a generated canvas. Provider
    /// metadata, when known, fills in the year and adds the rating.
    ///
    /// The JPEG is written to a temporary sibling and renamed into place, so
    /// concurrent compositions of the same poster never expose a partial file.
    pub fn compose(
        &self,
        source: Option<&Path>,
        parsed: &ParsedFilename,
        metadata: Option<&ProviderMetadata>,
    ) -> Result<PathBuf> {
        let mut canvas = self.prepare_canvas(source);
        apply_gradient(&mut canvas);
        self.draw_text(&mut canvas, parsed, metadata);

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;

        let path = self.output_dir.join(output_filename(parsed, metadata));
        let mut buf = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality)
            .encode_image(&canvas)
            .context("Failed to encode poster as JPEG")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.output_dir)
            .context("Failed to create temporary poster file")?;
        tmp.write_all(buf.get_ref())
            .context("Failed to write temporary poster file")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to write poster: {}", path.display()))?;

        info!(title = %parsed.title, path = %path.display(), "Poster composed");
        Ok(path)
    }

    fn prepare_canvas(&self, source: Option<&Path>) -> RgbImage {
        let width = self.config.width;
        for candidate in source.into_iter().chain([self.fallback_image.as_path()]) {
            match load_resized(candidate, width) {
                Ok(canvas) => return canvas,
                Err(e) => debug!(path = %candidate.display(), error = %e, "Source unusable"),
            }
        }
        warn!("No usable source or fallback image, generating canvas");
        fallback_canvas(width)
    }

    fn draw_text(
        &self,
        canvas: &mut RgbImage,
        parsed: &ParsedFilename,
        metadata: Option<&ProviderMetadata>,
    ) {
        let (width, height) = canvas.dimensions();
        let shadow = self.config.shadow_offset;
        let mut bottom = height.saturating_sub(BOTTOM_PADDING);

        let subtitle = subtitle_line(parsed, metadata);
        if !subtitle.is_empty() {
            let size = self.config.subtitle_size;
            let (w, h) = self.regular.measure(&subtitle, size);
            let top = bottom.saturating_sub(h);
            let x = centered_x(width, w);
            self.regular
                .draw(canvas, &subtitle, x + shadow, top as i32 + shadow, size, SHADOW_COLOR);
            self.regular.draw(canvas, &subtitle, x, top as i32, size, SUBTITLE_COLOR);
            bottom = top.saturating_sub(LINE_GAP);
        }

        let fitted = self.fit_title(&parsed.title, width);
        let (w, h) = self.bold.measure(&fitted.text, fitted.size);
        let top = bottom.saturating_sub(h) as i32;
        let x = centered_x(width, w);
        self.bold
            .draw(canvas, &fitted.text, x + shadow, top + shadow, fitted.size, SHADOW_COLOR);
        self.bold.draw(canvas, &fitted.text, x, top, fitted.size, TITLE_COLOR);
    }

    /// Largest size from max down to min (step 2) at which `title` fits the
    /// margins; below that, the title is truncated with an ellipsis at min.
    pub fn fit_title(&self, title: &str, canvas_width: u32) -> FittedTitle {
        let max_width = canvas_width.saturating_sub(self.config.margin * 2);
        let min = self.config.title_min_size;
        let fits = |text: &str, size: u32| self.bold.measure(text, size).0 <= max_width;

        let mut size = self.config.title_max_size.max(min);
        loop {
            if fits(title, size) {
                return FittedTitle {
                    text: title.to_string(),
                    size,
                };
            }
            if size == min {
                break;
            }
            size = size.saturating_sub(SIZE_STEP).max(min);
        }

        let chars: Vec<char> = title.chars().collect();
        for keep in (0..chars.len()).rev() {
            let candidate = format!(
                "{}{ELLIPSIS}",
                chars[..keep].iter().collect::<String>().trim_end()
            );
            if fits(&candidate, min) {
                return FittedTitle {
                    text: candidate,
                    size: min,
                };
            }
        }

        FittedTitle {
            text: ELLIPSIS.to_string(),
            size: min,
        }
    }
}

fn centered_x(canvas_width: u32, text_width: u32) -> i32 {
    (canvas_width as i32 - text_width as i32) / 2
}

/// The year from the filename, else the provider's release year.
fn display_year(parsed: &ParsedFilename, metadata: Option<&ProviderMetadata>) -> Option<u16> {
    parsed.year.or_else(|| metadata.and_then(|m| m.release_year))
}

/// `S02 E06 • 720p • WEB-DL • 2024 • ★ 8.1`, omitting whatever is unknown.
pub fn subtitle_line(parsed: &ParsedFilename, metadata: Option<&ProviderMetadata>) -> String {
    let mut parts = Vec::new();

    if parsed.is_series() {
        if let Some(season) = parsed.season {
            match parsed.episode {
                Some(episode) => parts.push(format!("S{season:02} E{episode}")),
                None => parts.push(format!("S{season:02}")),
            }
        }
    }
    if let Some(quality) = parsed.quality {
        parts.push(quality.to_string());
    }
    if let Some(source) = parsed.source {
        parts.push(source.to_string());
    }
    if let Some(year) = display_year(parsed, metadata) {
        parts.push(year.to_string());
    }
    if let Some(rating) = metadata.and_then(|m| m.rating).filter(|r| *r > 0.0) {
        parts.push(format!("\u{2605} {rating:.1}"));
    }

    parts.join(SEPARATOR)
}

/// `poster_<Title_With_Underscores>[_SxxEyy][_year][_quality][_source].jpg`
///
/// Everything drawn on the tag line except the rating is part of the name,
/// so renders that differ in what they show never share a file.
pub fn output_filename(parsed: &ParsedFilename, metadata: Option<&ProviderMetadata>) -> String {
    let mut name = String::from("poster_");
    name.extend(parsed.title.chars().map(|c| match c {
        ' ' => '_',
        '/' | '\\' => '-',
        other => other,
    }));

    if let Some(tag) = parsed.episode_tag().filter(|_| parsed.is_series()) {
        name.push('_');
        name.push_str(&tag);
    }
    if let Some(year) = display_year(parsed, metadata) {
        name.push_str(&format!("_{year}"));
    }
    if let Some(quality) = parsed.quality {
        name.push_str(&format!("_{quality}"));
    }
    if let Some(source) = parsed.source {
        name.push_str(&format!("_{source}"));
    }

    name.push_str(".jpg");
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_parser::parse;

    fn composer(dir: &Path) -> PosterComposer {
        PosterComposer::with_faces(
            ComposerConfig::default(),
            dir.to_path_buf(),
            dir.join("missing-fallback.jpg"),
            TextFace::Builtin,
            TextFace::Builtin,
        )
    }

    fn metadata(year: Option<u16>, rating: Option<f64>) -> ProviderMetadata {
        ProviderMetadata {
            provider: "tmdb".into(),
            id: 1,
            title: "Leo".into(),
            release_year: year,
            overview: None,
            rating,
            popularity: None,
            poster_url: None,
        }
    }

    #[test]
    fn test_subtitle_line_series() {
        let parsed = parse("Beast.Games.S02E06.720p.WEB-DL.mkv");
        assert_eq!(
            subtitle_line(&parsed, None),
            "S02 E06 \u{2022} 720p \u{2022} WEB-DL"
        );
    }

    #[test]
    fn test_subtitle_line_movie() {
        let parsed = parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv");
        assert_eq!(subtitle_line(&parsed, None), "1080p \u{2022} BluRay \u{2022} 2023");
    }

    #[test]
    fn test_subtitle_line_uses_provider_year_and_rating() {
        let parsed = parse("Leo.Tamil.720p.HDRip.mkv");
        let meta = metadata(Some(2023), Some(7.24));
        assert_eq!(
            subtitle_line(&parsed, Some(&meta)),
            "720p \u{2022} HDRip \u{2022} 2023 \u{2022} \u{2605} 7.2"
        );

        // The filename year wins over the provider's.
        let parsed = parse("Leo.1990.720p.mkv");
        assert_eq!(
            subtitle_line(&parsed, Some(&meta)),
            "720p \u{2022} 1990 \u{2022} \u{2605} 7.2"
        );

        let unrated = metadata(None, Some(0.0));
        assert_eq!(subtitle_line(&parse("Leo.mkv"), Some(&unrated)), "");
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename(&parse("Beast.Games.S02E06.720p.WEB-DL.mkv"), None),
            "poster_Beast_Games_S02E06_720p_WEB-DL.jpg"
        );
        assert_eq!(
            output_filename(&parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv"), None),
            "poster_Jawan_2023_1080p_BluRay.jpg"
        );
        assert_eq!(
            output_filename(&parse("Leo.2023.720p.mkv"), None),
            "poster_Leo_2023_720p.jpg"
        );
        assert_eq!(
            output_filename(&parse("Leo.mkv"), Some(&metadata(Some(2023), Some(7.0)))),
            "poster_Leo_2023.jpg"
        );
    }

    #[test]
    fn test_output_filename_separates_renders() {
        let names = [
            "Beast.Games.S02E06.720p.WEB-DL.mkv",
            "Beast.Games.S02E06.1080p.WEB-DL.mkv",
            "Leo.2023.720p.mkv",
            "Leo.1990.720p.mkv",
        ]
        .map(|f| output_filename(&parse(f), None));

        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_fit_title_short_title_uses_max() {
        let dir = tempfile::tempdir().unwrap();
        let fitted = composer(dir.path()).fit_title("Leo", 1080);
        assert_eq!(fitted, FittedTitle { text: "Leo".into(), size: 80 });
    }

    #[test]
    fn test_fit_title_shrinks_before_truncating() {
        let dir = tempfile::tempdir().unwrap();
        // Builtin width is (6n - 1) * (size / 8); 1000px usable.
        // 17 chars: at 80 -> 1010 (too wide), at 78 -> 909.
        let fitted = composer(dir.path()).fit_title("ABCDEFGHIJKLMNOPQ", 1080);
        assert_eq!(fitted.size, 78);
        assert_eq!(fitted.text, "ABCDEFGHIJKLMNOPQ");
    }

    #[test]
    fn test_fit_title_truncates_at_min() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(dir.path());
        let long = "The Extraordinarily Long Title Of A Film That Never Ends";

        let fitted = composer.fit_title(long, 1080);
        assert_eq!(fitted.size, 40);
        assert!(fitted.text.ends_with("..."));
        assert!(TextFace::Builtin.measure(&fitted.text, 40).0 <= 1000);
        assert!(long.starts_with(fitted.text.trim_end_matches("...")));
    }

    #[test]
    fn test_compose_without_any_source() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = parse("Beast.Games.S02E06.720p.WEB-DL.mkv");

        let path = composer(dir.path()).compose(None, &parsed, None).unwrap();
        assert_eq!(path, dir.path().join("poster_Beast_Games_S02E06_720p_WEB-DL.jpg"));

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 1080);
        assert_eq!(img.height(), super::super::canvas::FALLBACK_HEIGHT);
    }

    #[test]
    fn test_compose_resizes_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("raw.png");
        RgbImage::from_pixel(540, 800, Rgb([90, 120, 150]))
            .save(&source)
            .unwrap();

        let parsed = parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv");
        let path = composer(dir.path()).compose(Some(&source), &parsed, None).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (1080, 1600));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(dir.path());
        let parsed = parse("Leo.2023.Tamil.720p.HDRip.mkv");

        let first = std::fs::read(composer.compose(None, &parsed, None).unwrap()).unwrap();
        let second = std::fs::read(composer.compose(None, &parsed, None).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compose_keeps_each_quality() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer(dir.path());

        let hd = composer
            .compose(None, &parse("Beast.Games.S02E06.720p.WEB-DL.mkv"), None)
            .unwrap();
        let hd_bytes = std::fs::read(&hd).unwrap();
        let fhd = composer
            .compose(None, &parse("Beast.Games.S02E06.1080p.WEB-DL.mkv"), None)
            .unwrap();

        assert_ne!(hd, fhd);
        assert_eq!(std::fs::read(&hd).unwrap(), hd_bytes);
        assert!(fhd.is_file());

        // Only the two posters remain; no temporary files are left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
