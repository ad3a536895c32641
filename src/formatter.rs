//! Caption text and download buttons for a post.
//!
//! Everything here is pure: the same parsed filename, metadata and file
//! variants always produce the same caption and button layout.

use std::collections::BTreeMap;

use reelforge_common::ProviderMetadata;
use reelforge_parser::{ParsedFilename, Quality};
use serde::{Deserialize, Serialize};

const OVERVIEW_LIMIT: usize = 300;
const EMPTY_FIELD: &str = "\u{2014}";
const FOOTER: &str = "\u{1F525} **Telegram File** \u{1F525}";
const GET_ALL_LABEL: &str = "\u{1F4E6} Get All Files";

/// One file that can be offered for the same title or episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVariant {
    pub message_id: i64,
    pub quality: Option<Quality>,
    /// Human-readable size such as `1.4GB`.
    pub size_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

pub type ButtonRow = Vec<Button>;

/// Caption plus ordered button rows, ready for the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedPost {
    pub caption: String,
    pub buttons: Vec<ButtonRow>,
}

/// Build the caption and buttons for `parsed`.
pub fn format(
    parsed: &ParsedFilename,
    metadata: Option<&ProviderMetadata>,
    variants: &[FileVariant],
) -> FormattedPost {
    FormattedPost {
        caption: caption(parsed, metadata),
        buttons: buttons(parsed, variants),
    }
}

pub fn caption(parsed: &ParsedFilename, metadata: Option<&ProviderMetadata>) -> String {
    let mut lines = vec![format!("\u{1F3AC} **Title:** {}", parsed.title)];

    let year = parsed
        .year
        .or_else(|| metadata.and_then(|m| m.release_year));
    if let Some(year) = year {
        lines.push(format!("\u{1F4C5} **Year:** {year}"));
    }

    if parsed.is_series() {
        if let Some(season) = parsed.season {
            lines.push(format!("\u{1F5C2} **Season:** {season:02}"));
        }
        if let Some(episode) = parsed.episode {
            lines.push(format!("\u{1F4FA} **Episode:** {episode}"));
        }
    }

    let quality = [
        parsed.quality.map(|q| q.to_string()),
        parsed.source.map(|s| s.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");
    lines.push(format!(
        "\u{1F4C0} **Quality:** {}",
        if quality.is_empty() { "Unknown" } else { quality.as_str() }
    ));

    let languages = parsed
        .audio_languages
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("\u{1F310} **Language:** {}", or_dash(&languages)));

    let audio = parsed.audio_codec.map(|a| a.to_string()).unwrap_or_default();
    lines.push(format!("\u{1F3B5} **Audio:** {}", or_dash(&audio)));

    if let Some(codec) = parsed.video_codec {
        lines.push(format!("\u{1F4BE} **Codec:** {codec}"));
    }

    if let Some(rating) = metadata.and_then(|m| m.rating) {
        lines.push(format!("\u{2B50} {rating:.1}/10"));
    }

    let mut caption = lines.join("\n");

    if let Some(overview) = metadata
        .and_then(|m| m.overview.as_deref())
        .map(str::trim)
        .filter(|o| !o.is_empty())
    {
        caption.push_str("\n\n");
        caption.push_str(&truncate(overview, OVERVIEW_LIMIT));
    }

    caption.push_str("\n\n");
    caption.push_str(FOOTER);
    caption
}

/// One row per quality (best first, unknown last), deduplicated by
/// `(quality, size_label)`, plus a "Get All" row when qualities differ.
pub fn buttons(parsed: &ParsedFilename, variants: &[FileVariant]) -> Vec<ButtonRow> {
    // Keyed so that unknown quality sorts after every known one.
    let mut rows: BTreeMap<(bool, Option<Quality>), Vec<&FileVariant>> = BTreeMap::new();
    for variant in variants {
        let key = (variant.quality.is_none(), variant.quality);
        let row = rows.entry(key).or_default();
        if !row.iter().any(|v| v.size_label == variant.size_label) {
            row.push(variant);
        }
    }

    let prefix = episode_prefix(parsed);
    let mut layout: Vec<ButtonRow> = rows
        .values()
        .map(|row| row.iter().map(|v| button(prefix.as_deref(), v)).collect())
        .collect();

    if rows.len() > 1 {
        let ids = rows
            .values()
            .flatten()
            .map(|v| v.message_id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        layout.push(vec![Button {
            text: GET_ALL_LABEL.to_string(),
            callback_data: format!("all_{ids}"),
        }]);
    }

    layout
}

fn button(prefix: Option<&str>, variant: &FileVariant) -> Button {
    let quality = variant.quality.map_or("File", |q| q.as_str());
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(prefix) = prefix {
        parts.push(prefix);
    }
    parts.push(quality);
    if !variant.size_label.is_empty() {
        parts.push(&variant.size_label);
    }

    Button {
        text: format!("\u{1F525} {}", parts.join(" \u{2022} ")),
        callback_data: format!("dl_{}", variant.message_id),
    }
}

fn episode_prefix(parsed: &ParsedFilename) -> Option<String> {
    if !parsed.is_series() {
        return None;
    }
    parsed.episode.map(|ep| format!("EP{ep}"))
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        EMPTY_FIELD
    } else {
        value
    }
}

/// Truncate to at most `limit` characters, ending with `...` when cut.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// `700MB`, `1.4GB`, or `512KB` for anything under a megabyte.
pub fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1}GB", b / GB)
    } else if b >= MB {
        format!("{:.0}MB", b / MB)
    } else {
        format!("{:.0}KB", b / KB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_parser::parse;

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            provider: "tmdb".into(),
            id: 872906,
            title: "Jawan".into(),
            release_year: Some(2023),
            overview: Some("A high-octane action thriller.".into()),
            rating: Some(7.14),
            popularity: Some(40.0),
            poster_url: None,
        }
    }

    fn variant(id: i64, quality: Option<Quality>, size: &str) -> FileVariant {
        FileVariant {
            message_id: id,
            quality,
            size_label: size.into(),
        }
    }

    #[test]
    fn test_movie_caption() {
        let parsed = parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv");
        let caption = caption(&parsed, Some(&metadata()));

        assert!(caption.starts_with("\u{1F3AC} **Title:** Jawan\n"));
        assert!(caption.contains("**Year:** 2023"));
        assert!(caption.contains("**Quality:** 1080p BluRay"));
        assert!(caption.contains("**Language:** Hindi"));
        assert!(caption.contains("**Audio:** \u{2014}"));
        assert!(caption.contains("**Codec:** x264"));
        assert!(caption.contains("\u{2B50} 7.1/10"));
        assert!(caption.contains("A high-octane action thriller."));
        assert!(!caption.contains("Season"));
        assert!(caption.ends_with(FOOTER));
    }

    #[test]
    fn test_series_caption_without_metadata() {
        let parsed = parse("Beast.Games.S02E06.720p.WEB-DL.mkv");
        let caption = caption(&parsed, None);

        assert!(caption.contains("**Season:** 02"));
        assert!(caption.contains("**Episode:** 06"));
        assert!(caption.contains("**Language:** \u{2014}"));
        assert!(!caption.contains("**Year:**"));
        assert!(!caption.contains('\u{2B50}'));
    }

    #[test]
    fn test_year_falls_back_to_provider() {
        let parsed = parse("Beast.Games.S02E06.720p.WEB-DL.mkv");
        let caption = caption(&parsed, Some(&metadata()));
        assert!(caption.contains("**Year:** 2023"));
    }

    #[test]
    fn test_overview_truncated() {
        let parsed = parse("Leo.2023.mkv");
        let mut meta = metadata();
        meta.overview = Some("word ".repeat(100));

        let caption = caption(&parsed, Some(&meta));
        let overview = caption.split("\n\n").nth(1).unwrap();
        assert!(overview.ends_with("..."));
        assert!(overview.chars().count() <= OVERVIEW_LIMIT);
    }

    #[test]
    fn test_buttons_grouped_sorted_and_deduplicated() {
        let parsed = parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv");
        let rows = buttons(
            &parsed,
            &[
                variant(1, Some(Quality::Hd720), "900MB"),
                variant(2, None, "300MB"),
                variant(3, Some(Quality::Uhd2160), "12.1GB"),
                variant(4, Some(Quality::Hd720), "900MB"),
                variant(5, Some(Quality::Hd720), "1.1GB"),
            ],
        );

        let texts: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(|b| b.text.as_str()).collect())
            .collect();
        assert_eq!(
            texts,
            vec![
                vec!["\u{1F525} 2160p \u{2022} 12.1GB"],
                vec!["\u{1F525} 720p \u{2022} 900MB", "\u{1F525} 720p \u{2022} 1.1GB"],
                vec!["\u{1F525} File \u{2022} 300MB"],
                vec![GET_ALL_LABEL],
            ]
        );
        assert_eq!(rows[1][1].callback_data, "dl_5");
        assert_eq!(rows[3][0].callback_data, "all_3,1,5,2");
    }

    #[test]
    fn test_single_quality_has_no_get_all() {
        let parsed = parse("Beast.Games.S02E06.720p.WEB-DL.mkv");
        let rows = buttons(
            &parsed,
            &[variant(7, Some(Quality::Hd720), "700MB"), variant(8, Some(Quality::Hd720), "1.4GB")],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].text, "\u{1F525} EP06 \u{2022} 720p \u{2022} 700MB");
        assert_eq!(rows[0][0].callback_data, "dl_7");
    }

    #[test]
    fn test_no_variants_no_buttons() {
        let parsed = parse("Leo.2023.mkv");
        assert!(buttons(&parsed, &[]).is_empty());
    }

    #[test]
    fn test_format_is_deterministic() {
        let parsed = parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv");
        let variants = [variant(1, Some(Quality::Fhd1080), "2.3GB")];
        assert_eq!(
            format(&parsed, Some(&metadata()), &variants),
            format(&parsed, Some(&metadata()), &variants)
        );
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(700 * 1024 * 1024), "700MB");
        assert_eq!(human_size(1_503_238_554), "1.4GB");
        assert_eq!(human_size(512 * 1024), "512KB");
    }
}
