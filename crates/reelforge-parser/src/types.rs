//! Output types for the filename parser.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use reelforge_common::MediaType;
use serde::{Deserialize, Serialize};

/// Structured metadata extracted from one filename.
///
/// Built once per input and never mutated afterwards. `season` and `episode`
/// are only populated when `media_type` is [`MediaType::Series`], and `title`
/// is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFilename {
    /// The input exactly as received.
    pub raw: String,
    pub title: String,
    pub year: Option<u16>,
    pub media_type: MediaType,
    pub season: Option<u32>,
    pub episode: Option<Episode>,
    pub quality: Option<Quality>,
    pub source: Option<SourceType>,
    /// Spoken languages in title case, sorted.
    pub audio_languages: BTreeSet<String>,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub release_group: Option<String>,
    /// Lowercased container extension that was stripped, if any.
    pub extension: Option<String>,
}

impl ParsedFilename {
    /// `S02E06`, `S01E01-E02` or `S03` for a season pack.
    pub fn episode_tag(&self) -> Option<String> {
        let season = self.season?;
        Some(match self.episode {
            Some(Episode::Single(ep)) => format!("S{season:02}E{ep:02}"),
            Some(Episode::Range(first, last)) => format!("S{season:02}E{first:02}-E{last:02}"),
            None => format!("S{season:02}"),
        })
    }

    pub fn is_series(&self) -> bool {
        self.media_type == MediaType::Series
    }
}

/// A single episode number or an inclusive multi-episode range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Episode {
    Single(u32),
    Range(u32, u32),
}

impl Episode {
    /// First episode number covered.
    pub fn first(&self) -> u32 {
        match self {
            Self::Single(ep) | Self::Range(ep, _) => *ep,
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ep) => write!(f, "{ep:02}"),
            Self::Range(first, last) => write!(f, "{first:02}-{last:02}"),
        }
    }
}

/// Video resolution bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "2160p")]
    Uhd2160,
    #[serde(rename = "1080p")]
    Fhd1080,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "SD")]
    Sd,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uhd2160 => "2160p",
            Self::Fhd1080 => "1080p",
            Self::Hd720 => "720p",
            Self::Sd480 => "480p",
            Self::Sd => "SD",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release source (rip type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "WEB-DL")]
    WebDl,
    #[serde(rename = "WEBRip")]
    WebRip,
    BluRay,
    #[serde(rename = "BRRip")]
    BrRip,
    #[serde(rename = "BDRip")]
    BdRip,
    #[serde(rename = "HDRip")]
    HdRip,
    #[serde(rename = "CAMRip")]
    CamRip,
    #[serde(rename = "CAM")]
    Cam,
    #[serde(rename = "HDCAM")]
    HdCam,
    #[serde(rename = "HDTV")]
    Hdtv,
    #[serde(rename = "TVRip")]
    TvRip,
    #[serde(rename = "DVDRip")]
    DvdRip,
    #[serde(rename = "DVDScr")]
    DvdScr,
    #[serde(rename = "HDTS")]
    HdTs,
    #[serde(rename = "WEB")]
    Web,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebDl => "WEB-DL",
            Self::WebRip => "WEBRip",
            Self::BluRay => "BluRay",
            Self::BrRip => "BRRip",
            Self::BdRip => "BDRip",
            Self::HdRip => "HDRip",
            Self::CamRip => "CAMRip",
            Self::Cam => "CAM",
            Self::HdCam => "HDCAM",
            Self::Hdtv => "HDTV",
            Self::TvRip => "TVRip",
            Self::DvdRip => "DVDRip",
            Self::DvdScr => "DVDScr",
            Self::HdTs => "HDTS",
            Self::Web => "WEB",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical video codec. H.264/AVC fold into `x264`, H.265/HEVC into `x265`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    #[serde(rename = "x264")]
    X264,
    #[serde(rename = "x265")]
    X265,
    #[serde(rename = "AV1")]
    Av1,
}

impl VideoCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X264 => "x264",
            Self::X265 => "x265",
            Self::Av1 => "AV1",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCodec {
    #[serde(rename = "AAC")]
    Aac,
    #[serde(rename = "AC3")]
    Ac3,
    #[serde(rename = "DD5.1")]
    Dd51,
    #[serde(rename = "DDP5.1")]
    Ddp51,
    #[serde(rename = "DTS")]
    Dts,
    TrueHD,
    Atmos,
    #[serde(rename = "FLAC")]
    Flac,
    #[serde(rename = "MP3")]
    Mp3,
    Opus,
}

impl AudioCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aac => "AAC",
            Self::Ac3 => "AC3",
            Self::Dd51 => "DD5.1",
            Self::Ddp51 => "DDP5.1",
            Self::Dts => "DTS",
            Self::TrueHD => "TrueHD",
            Self::Atmos => "Atmos",
            Self::Flac => "FLAC",
            Self::Mp3 => "MP3",
            Self::Opus => "Opus",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte span in the normalized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Which field a rule fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SeasonEpisode,
    Quality,
    Source,
    VideoCodec,
    AudioCodec,
    Year,
    Language,
    /// Edition, release and streaming-service tags that end the title but
    /// carry no stored value.
    Marker,
    ReleaseGroup,
}

/// One span of the normalized input owned by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub field: Field,
    pub span: Span,
    pub text: String,
}

/// Parse result together with the intermediate state that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    pub parsed: ParsedFilename,
    /// The string the rule table was scanned over.
    pub normalized: String,
    /// Claimed spans ordered by start offset.
    pub claims: Vec<Claim>,
}

impl ParseReport {
    pub fn claims_for(&self, field: Field) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(move |c| c.field == field)
    }
}
