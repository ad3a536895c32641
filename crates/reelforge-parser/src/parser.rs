//! Rule-table driven filename parser.
//!
//! Parsing proceeds in phases:
//! 1. Normalize the raw filename (extension, site prefix, separators).
//! 2. Run the rule table in priority order, each rule claiming spans of the
//!    normalized string that no earlier rule owns.
//! 3. Detect the release group from the trailing tokens.
//! 4. Take the title from the text preceding the earliest claim.

use std::collections::BTreeSet;

use chrono::Datelike;
use reelforge_common::MediaType;

use crate::rules::{Selection, Tag, COMPILED, RULES};
use crate::tokenizer::{normalize, tokenize, Token};
use crate::types::{
    AudioCodec, Claim, Episode, Field, ParseReport, ParsedFilename, Quality, SourceType, Span,
    VideoCodec,
};

/// Release groups longer than this are treated as part of the name.
const MAX_GROUP_LEN: usize = 15;

const MIN_YEAR: u16 = 1900;

/// Filename parser with a fixed upper bound for plausible years.
#[derive(Debug, Clone)]
pub struct FilenameParser {
    max_year: u16,
}

impl Default for FilenameParser {
    fn default() -> Self {
        let next_year = chrono::Utc::now().year() + 1;
        Self::with_max_year(u16::try_from(next_year).unwrap_or(u16::MAX))
    }
}

impl FilenameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser that accepts years up to and including `max_year`.
    pub fn with_max_year(max_year: u16) -> Self {
        Self { max_year }
    }

    pub fn parse(&self, raw: &str) -> ParsedFilename {
        self.parse_with_report(raw).parsed
    }

    /// Parse and keep the normalized text and the claimed spans.
    pub fn parse_with_report(&self, raw: &str) -> ParseReport {
        let normalized = normalize(raw);
        let text = normalized.text.as_str();

        let mut claims: Vec<Claim> = Vec::new();
        let mut fields = Extracted::default();

        // Phase 2: rule table
        for (rule, re) in RULES.iter().zip(COMPILED.iter()) {
            if rule.selection == Selection::First && fields.is_filled(rule.field) {
                continue;
            }

            let candidates: Vec<(Span, Tag)> = re
                .captures_iter(text)
                .filter_map(|caps| {
                    let span = Span::from(caps.get(0)?.range());
                    if claims.iter().any(|c| c.span.overlaps(&span)) {
                        return None;
                    }
                    (rule.extract)(&caps).map(|tag| (span, tag))
                })
                .collect();

            let selected = match rule.selection {
                Selection::First => candidates.into_iter().take(1).collect(),
                Selection::All => candidates,
                Selection::Year => self.select_year(candidates, &claims),
                Selection::AfterTags => select_after_tags(text, candidates, &claims),
            };

            for (span, tag) in selected {
                claims.push(Claim {
                    field: rule.field,
                    span,
                    text: text[span.start..span.end].to_string(),
                });
                fields.apply(tag);
            }
        }

        // Phase 3: release group
        let release_group = match trailing_group(text, &claims) {
            Some((group, span)) => {
                claims.push(Claim {
                    field: Field::ReleaseGroup,
                    span,
                    text: text[span.start..span.end].to_string(),
                });
                Some(group)
            }
            None => normalized.leading_group.clone(),
        };

        claims.sort_by_key(|c| c.span);

        // Phase 4: title
        let boundary = claims.first().map_or(text.len(), |c| c.span.start);
        let mut title = clean_title(&text[..boundary]);
        if title.is_empty() {
            // Markers leading into the first tag (`Dual 2022 1080p`) may be the title.
            let boundary = claims
                .iter()
                .find(|c| c.field != Field::Marker)
                .map_or(text.len(), |c| c.span.start);
            title = clean_title(&text[..boundary]);
        }
        if title.is_empty() {
            title = clean_title(text);
        }

        let media_type = if text.is_empty() {
            MediaType::Unknown
        } else if fields.season.is_some() {
            MediaType::Series
        } else {
            MediaType::Movie
        };

        if title.is_empty() {
            title = "Unknown".to_string();
        }

        let parsed = ParsedFilename {
            raw: raw.to_string(),
            title,
            year: fields.year,
            media_type,
            season: fields.season,
            episode: fields.episode,
            quality: fields.quality,
            source: fields.source,
            audio_languages: fields.languages,
            video_codec: fields.video_codec,
            audio_codec: fields.audio_codec,
            release_group,
            extension: normalized.extension,
        };

        ParseReport {
            parsed,
            normalized: normalized.text,
            claims,
        }
    }

    /// Pick one year among unclaimed four-digit candidates.
    ///
    /// A candidate at the very start of the string is a title (`1917`) when
    /// another candidate follows it. Of the rest, the last one before the
    /// first already-claimed tag wins (`Blade Runner 2049 2017 1080p`), else
    /// the first.
    fn select_year(&self, candidates: Vec<(Span, Tag)>, claims: &[Claim]) -> Vec<(Span, Tag)> {
        let mut in_range: Vec<(Span, Tag)> = candidates
            .into_iter()
            .filter(|(_, tag)| matches!(tag, Tag::Year(y) if (MIN_YEAR..=self.max_year).contains(y)))
            .collect();

        if in_range.len() > 1 && in_range[0].0.start == 0 {
            in_range.remove(0);
        }

        let first_tag = claims.iter().map(|c| c.span.start).min().unwrap_or(usize::MAX);
        let chosen = in_range
            .iter()
            .rposition(|(span, _)| span.start < first_tag)
            .unwrap_or(0);

        in_range.into_iter().nth(chosen).into_iter().collect()
    }
}

/// Keep marker matches that cannot belong to the title: those starting at or
/// after the first claimed tag, and the unbroken run of markers directly in
/// front of it (`Some Movie UNCUT HDRip`). Without a claimed tag nothing is
/// kept, so `The Extended Family` stays whole.
fn select_after_tags(
    text: &str,
    candidates: Vec<(Span, Tag)>,
    claims: &[Claim],
) -> Vec<(Span, Tag)> {
    let Some(first_tag) = claims.iter().map(|c| c.span.start).min() else {
        return Vec::new();
    };

    let (mut kept, before): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|(span, _)| span.start >= first_tag);

    let mut cursor = first_tag;
    for (span, tag) in before.into_iter().rev() {
        if !is_separator(&text[span.end..cursor]) {
            break;
        }
        cursor = span.start;
        kept.push((span, tag));
    }

    kept.sort_by_key(|(span, _)| *span);
    kept
}

fn is_separator(gap: &str) -> bool {
    gap.chars()
        .all(|c| c.is_whitespace() || matches!(c, '-' | '(' | ')' | '[' | ']' | ','))
}

/// Field values accumulated while the rule table runs.
#[derive(Default)]
struct Extracted {
    season: Option<u32>,
    episode: Option<Episode>,
    quality: Option<Quality>,
    source: Option<SourceType>,
    video_codec: Option<VideoCodec>,
    audio_codec: Option<AudioCodec>,
    year: Option<u16>,
    languages: BTreeSet<String>,
}

impl Extracted {
    fn is_filled(&self, field: Field) -> bool {
        match field {
            Field::SeasonEpisode => self.season.is_some(),
            Field::Quality => self.quality.is_some(),
            Field::Source => self.source.is_some(),
            Field::VideoCodec => self.video_codec.is_some(),
            Field::AudioCodec => self.audio_codec.is_some(),
            Field::Year => self.year.is_some(),
            Field::Language | Field::Marker | Field::ReleaseGroup => false,
        }
    }

    fn apply(&mut self, tag: Tag) {
        match tag {
            Tag::SeasonEpisode { season, episode } => {
                self.season = Some(season);
                self.episode = episode;
            }
            Tag::Quality(q) => self.quality = Some(q),
            Tag::Source(s) => self.source = Some(s),
            Tag::VideoCodec(c) => self.video_codec = Some(c),
            Tag::AudioCodec(c) => self.audio_codec = Some(c),
            Tag::Year(y) => self.year = Some(y),
            Tag::Language(lang) => {
                self.languages.insert(lang);
            }
            Tag::Marker => {}
        }
    }
}

/// A trailing `[Group]`, or a final `-GROUP` token that follows every other
/// tag.
fn trailing_group(text: &str, claims: &[Claim]) -> Option<(String, Span)> {
    let tokens = tokenize(text);
    let last = tokens.last()?;

    if let Token::Bracketed(group) = last.token {
        let inner = group[1..group.len() - 1].trim();
        let claimed = claims.iter().any(|c| c.span.overlaps(&last.span));
        if !inner.is_empty() && !claimed {
            return Some((inner.to_string(), last.span));
        }
        return None;
    }

    let tags_end = claims.iter().map(|c| c.span.end).max()?;
    let hyphen = tokens.get(tokens.len().checked_sub(2)?)?;
    if hyphen.token != Token::Hyphen || hyphen.span.start < tags_end {
        return None;
    }

    let word = last.token.text()?;
    if word.len() <= MAX_GROUP_LEN && word.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some((word.to_string(), last.span))
    } else {
        None
    }
}

/// Trim dangling separators, collapse spaces and upper-case the first letter
/// of each word.
fn clean_title(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '(' | '[' | ','))
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
