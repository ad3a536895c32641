//! The ordered tag rule table.
//!
//! Rules run in table order (highest priority first) over the normalized
//! filename. A rule may only claim bytes that no earlier rule has claimed, so
//! the order of [`RULES`] is the precedence order of the parser.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::{AudioCodec, Episode, Field, Quality, SourceType, VideoCodec};

/// How a rule picks among its unclaimed matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Earliest match only, and only if the field is still empty.
    First,
    /// Every match.
    All,
    /// Year candidates, see [`crate::parser`] for the selection policy.
    Year,
    /// Matches after the first claimed tag, plus the run of matches that
    /// leads directly into it. Earlier matches are left to the title.
    AfterTags,
}

/// Value produced by a rule match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    SeasonEpisode {
        season: u32,
        episode: Option<Episode>,
    },
    Quality(Quality),
    Source(SourceType),
    VideoCodec(VideoCodec),
    AudioCodec(AudioCodec),
    Year(u16),
    Language(String),
    Marker,
}

/// Source of a rule's case-insensitive regex. Capture group 0 is the claimed
/// span, group 1 the matched word.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    Regex(&'static str),
    /// Any of the listed words, matched whole.
    Words(&'static [&'static str]),
}

impl Pattern {
    pub fn source(&self) -> String {
        match self {
            Self::Regex(pattern) => (*pattern).to_string(),
            Self::Words(words) => {
                let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
                format!(r"\b({})\b", alternatives.join("|"))
            }
        }
    }
}

/// One row of the rule table.
pub struct TagRule {
    pub field: Field,
    pub priority: u8,
    pub pattern: Pattern,
    pub selection: Selection,
    pub extract: fn(&Captures<'_>) -> Option<Tag>,
}

/// Languages recognized as whole words.
pub const LANGUAGES: &[&str] = &[
    "Hindi", "Tamil", "Telugu", "Malayalam", "Kannada", "Bengali", "Marathi", "Punjabi",
    "Gujarati", "Urdu", "English", "Japanese", "Korean", "Chinese", "Spanish", "French",
    "German", "Italian", "Russian",
];

/// The rule table, highest priority first.
pub static RULES: &[TagRule] = &[
    // Season / episode, first match across all four forms wins.
    TagRule {
        field: Field::SeasonEpisode,
        priority: 100,
        pattern: Pattern::Regex(r"\bS(\d{1,2}) ?E(\d{1,3})(?:-?E(\d{1,3}))?\b"),
        selection: Selection::First,
        extract: season_episode,
    },
    TagRule {
        field: Field::SeasonEpisode,
        priority: 99,
        pattern: Pattern::Regex(r"\b(\d{1,2})x(\d{1,3})\b"),
        selection: Selection::First,
        extract: season_episode,
    },
    TagRule {
        field: Field::SeasonEpisode,
        priority: 98,
        pattern: Pattern::Regex(r"\bSeason ?(\d{1,2})\b.*?\bEpisode ?(\d{1,3})\b"),
        selection: Selection::First,
        extract: season_episode,
    },
    TagRule {
        field: Field::SeasonEpisode,
        priority: 97,
        pattern: Pattern::Regex(r"\b(?:S|Season ?)(\d{1,2})\b"),
        selection: Selection::First,
        extract: season_only,
    },
    TagRule {
        field: Field::Quality,
        priority: 90,
        pattern: Pattern::Regex(r"\b(2160p|4K|1080p|720p|480p|576p|360p|240p|SD)\b"),
        selection: Selection::First,
        extract: quality,
    },
    TagRule {
        field: Field::Source,
        priority: 80,
        pattern: Pattern::Regex(r"\b(WEB-?DL|WEB-?Rip|Blu-?Ray|BRRip|BDRip|HDRip|CAMRip|HDCAM|HDTV|TVRip|DVDRip|DVDScr|HDTS|CAM|WEB)\b"),
        selection: Selection::First,
        extract: source,
    },
    TagRule {
        field: Field::VideoCodec,
        priority: 70,
        pattern: Pattern::Regex(r"\b(x265|x264|H ?265|H ?264|HEVC|AVC|AV1)\b"),
        selection: Selection::First,
        extract: video_codec,
    },
    TagRule {
        field: Field::AudioCodec,
        priority: 60,
        pattern: Pattern::Regex(r"\b(DDP ?5 1|DD ?5 1|TrueHD|Atmos|AAC(?: ?2 0)?|AC3|DTS|FLAC|MP3|Opus)\b"),
        selection: Selection::First,
        extract: audio_codec,
    },
    TagRule {
        field: Field::Year,
        priority: 50,
        pattern: Pattern::Regex(r"\b(\d{4})\b"),
        selection: Selection::Year,
        extract: year,
    },
    TagRule {
        field: Field::Language,
        priority: 40,
        pattern: Pattern::Words(LANGUAGES),
        selection: Selection::All,
        extract: language,
    },
    TagRule {
        field: Field::Marker,
        priority: 30,
        pattern: Pattern::Regex(r"\b(REPACK|PROPER|INTERNAL|UNCUT|UNRATED|Extended|Theatrical|Directors Cut|Criterion|Remastered|Remux|UHD|HDR10|HDR|SDR|DV|DoVi|10bit|IMAX|3D|SBS|HOU|DUBBED|SUBBED|ESubs?|MSubs?|HardSubs?|HQ|Dual Audio|Dual|Multi|ORG|AMZN|NF|DSNP|SonyLIV|ZEE5|Hotstar|Download)\b"),
        selection: Selection::AfterTags,
        extract: marker,
    },
];

/// Compiled patterns, index-aligned with [`RULES`].
pub(crate) static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| Regex::new(&format!("(?i){}", rule.pattern.source())).expect("valid regex"))
        .collect()
});

fn number<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn season_episode(caps: &Captures<'_>) -> Option<Tag> {
    let season = number(caps, 1)?;
    let first: u32 = number(caps, 2)?;
    let episode = match number::<u32>(caps, 3) {
        Some(last) if last > first => Episode::Range(first, last),
        _ => Episode::Single(first),
    };
    Some(Tag::SeasonEpisode {
        season,
        episode: Some(episode),
    })
}

fn season_only(caps: &Captures<'_>) -> Option<Tag> {
    Some(Tag::SeasonEpisode {
        season: number(caps, 1)?,
        episode: None,
    })
}

fn quality(caps: &Captures<'_>) -> Option<Tag> {
    let q = match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "2160p" | "4k" => Quality::Uhd2160,
        "1080p" => Quality::Fhd1080,
        "720p" => Quality::Hd720,
        "480p" => Quality::Sd480,
        _ => Quality::Sd,
    };
    Some(Tag::Quality(q))
}

fn source(caps: &Captures<'_>) -> Option<Tag> {
    let key = caps.get(1)?.as_str().to_ascii_lowercase().replace('-', "");
    let s = match key.as_str() {
        "webdl" => SourceType::WebDl,
        "webrip" => SourceType::WebRip,
        "bluray" => SourceType::BluRay,
        "brrip" => SourceType::BrRip,
        "bdrip" => SourceType::BdRip,
        "hdrip" => SourceType::HdRip,
        "camrip" => SourceType::CamRip,
        "hdcam" => SourceType::HdCam,
        "hdtv" => SourceType::Hdtv,
        "tvrip" => SourceType::TvRip,
        "dvdrip" => SourceType::DvdRip,
        "dvdscr" => SourceType::DvdScr,
        "hdts" => SourceType::HdTs,
        "cam" => SourceType::Cam,
        "web" => SourceType::Web,
        _ => return None,
    };
    Some(Tag::Source(s))
}

fn video_codec(caps: &Captures<'_>) -> Option<Tag> {
    let key = caps.get(1)?.as_str().to_ascii_lowercase().replace(' ', "");
    let c = match key.as_str() {
        "x265" | "h265" | "hevc" => VideoCodec::X265,
        "x264" | "h264" | "avc" => VideoCodec::X264,
        "av1" => VideoCodec::Av1,
        _ => return None,
    };
    Some(Tag::VideoCodec(c))
}

fn audio_codec(caps: &Captures<'_>) -> Option<Tag> {
    let key = caps.get(1)?.as_str().to_ascii_lowercase().replace(' ', "");
    let c = match key.as_str() {
        "ddp51" => AudioCodec::Ddp51,
        "dd51" => AudioCodec::Dd51,
        "truehd" => AudioCodec::TrueHD,
        "atmos" => AudioCodec::Atmos,
        "aac" | "aac20" => AudioCodec::Aac,
        "ac3" => AudioCodec::Ac3,
        "dts" => AudioCodec::Dts,
        "flac" => AudioCodec::Flac,
        "mp3" => AudioCodec::Mp3,
        "opus" => AudioCodec::Opus,
        _ => return None,
    };
    Some(Tag::AudioCodec(c))
}

fn year(caps: &Captures<'_>) -> Option<Tag> {
    number(caps, 1).map(Tag::Year)
}

fn language(caps: &Captures<'_>) -> Option<Tag> {
    let word = caps.get(1)?.as_str();
    LANGUAGES
        .iter()
        .find(|lang| lang.eq_ignore_ascii_case(word))
        .map(|lang| Tag::Language((*lang).to_string()))
}

fn marker(_caps: &Captures<'_>) -> Option<Tag> {
    Some(Tag::Marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_tag(field: Field, input: &str) -> Option<Tag> {
        RULES
            .iter()
            .zip(COMPILED.iter())
            .filter(|(rule, _)| rule.field == field)
            .find_map(|(rule, re)| re.captures(input).and_then(|c| (rule.extract)(&c)))
    }

    #[test]
    fn test_table_is_ordered_by_priority() {
        let priorities: Vec<u8> = RULES.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED.len(), RULES.len());
    }

    #[test]
    fn test_season_episode_forms() {
        assert_eq!(
            first_tag(Field::SeasonEpisode, "Show S02E06 720p"),
            Some(Tag::SeasonEpisode {
                season: 2,
                episode: Some(Episode::Single(6))
            })
        );
        assert_eq!(
            first_tag(Field::SeasonEpisode, "Show s01e01-e03"),
            Some(Tag::SeasonEpisode {
                season: 1,
                episode: Some(Episode::Range(1, 3))
            })
        );
        assert_eq!(
            first_tag(Field::SeasonEpisode, "Show 3x07 HDTV"),
            Some(Tag::SeasonEpisode {
                season: 3,
                episode: Some(Episode::Single(7))
            })
        );
        assert_eq!(
            first_tag(Field::SeasonEpisode, "Show Season 4 Episode 12"),
            Some(Tag::SeasonEpisode {
                season: 4,
                episode: Some(Episode::Single(12))
            })
        );
        assert_eq!(
            first_tag(Field::SeasonEpisode, "Show Complete S05 1080p"),
            Some(Tag::SeasonEpisode {
                season: 5,
                episode: None
            })
        );
    }

    #[test]
    fn test_quality_synonyms() {
        assert_eq!(first_tag(Field::Quality, "x 4K y"), Some(Tag::Quality(Quality::Uhd2160)));
        assert_eq!(first_tag(Field::Quality, "x 576p"), Some(Tag::Quality(Quality::Sd)));
        assert_eq!(first_tag(Field::Quality, "x 1080P"), Some(Tag::Quality(Quality::Fhd1080)));
        assert_eq!(first_tag(Field::Quality, "x 1080i"), None);
    }

    #[test]
    fn test_source_prefers_longest() {
        assert_eq!(first_tag(Field::Source, "A WEB-DL"), Some(Tag::Source(SourceType::WebDl)));
        assert_eq!(first_tag(Field::Source, "A WEBRip"), Some(Tag::Source(SourceType::WebRip)));
        assert_eq!(first_tag(Field::Source, "A HDCAM"), Some(Tag::Source(SourceType::HdCam)));
        assert_eq!(first_tag(Field::Source, "A CAMRip"), Some(Tag::Source(SourceType::CamRip)));
        assert_eq!(first_tag(Field::Source, "A Blu-Ray"), Some(Tag::Source(SourceType::BluRay)));
        assert_eq!(first_tag(Field::Source, "A WEB"), Some(Tag::Source(SourceType::Web)));
    }

    #[test]
    fn test_codec_synonyms_fold() {
        for input in ["x265", "HEVC", "H 265", "h265"] {
            assert_eq!(
                first_tag(Field::VideoCodec, input),
                Some(Tag::VideoCodec(VideoCodec::X265)),
                "{input}"
            );
        }
        for input in ["x264", "AVC", "H 264"] {
            assert_eq!(
                first_tag(Field::VideoCodec, input),
                Some(Tag::VideoCodec(VideoCodec::X264)),
                "{input}"
            );
        }
    }

    #[test]
    fn test_audio_codec_after_dot_normalization() {
        assert_eq!(first_tag(Field::AudioCodec, "WEB-DL DDP5 1 Atmos"), Some(Tag::AudioCodec(AudioCodec::Ddp51)));
        assert_eq!(first_tag(Field::AudioCodec, "BluRay DD5 1"), Some(Tag::AudioCodec(AudioCodec::Dd51)));
        assert_eq!(first_tag(Field::AudioCodec, "AAC2 0"), Some(Tag::AudioCodec(AudioCodec::Aac)));
    }

    #[test]
    fn test_language_pattern_covers_every_language() {
        let re = &COMPILED[RULES.iter().position(|r| r.field == Field::Language).unwrap()];
        for lang in LANGUAGES {
            let input = format!("Movie {} 1080p", lang.to_uppercase());
            assert_eq!(
                first_tag(Field::Language, &input),
                Some(Tag::Language((*lang).to_string())),
                "{lang}"
            );
        }
        assert_eq!(re.captures_iter("Tamil Telugu").count(), 2);
    }

    #[test]
    fn test_words_pattern_escapes_and_anchors() {
        let source = Pattern::Words(&["DD5.1", "Atmos"]).source();
        assert_eq!(source, r"\b(DD5\.1|Atmos)\b");
    }

    #[test]
    fn test_language_is_title_cased() {
        assert_eq!(
            first_tag(Field::Language, "movie HINDI 1080p"),
            Some(Tag::Language("Hindi".into()))
        );
        assert_eq!(first_tag(Field::Language, "Hindilicious"), None);
    }
}
