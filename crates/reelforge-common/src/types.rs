//! Core type definitions shared by the parser, the store and the pipeline.
//!
//! Enums serialize in lowercase so stored rows and CLI JSON output stay
//! stable across releases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// Kind of media a filename describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A single feature film.
    Movie,
    /// An episode (or season pack) of a TV series.
    Series,
    /// Nothing could be extracted from the input.
    Unknown,
}

impl MediaType {
    /// Lowercase name used in storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            "unknown" => Ok(Self::Unknown),
            other => Err(Error::invalid_input(format!("Unknown media type: {other}"))),
        }
    }
}

/// Identity of one poster in the cache: normalized title, year and type.
///
/// Two filenames of the same release in different qualities map to the same
/// key, so the poster is fetched once per logical title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub title: String,
    pub year: Option<u16>,
    pub media_type: MediaType,
}

impl CacheKey {
    pub fn new(title: &str, year: Option<u16>, media_type: MediaType) -> Self {
        Self {
            title: normalize_title(title),
            year,
            media_type,
        }
    }

    /// Flat string form used as the primary key column.
    pub fn storage_key(&self) -> String {
        match self.year {
            Some(year) => format!("{}|{}|{}", self.title, year, self.media_type),
            None => format!("{}|-|{}", self.title, self.media_type),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Lowercase a title and collapse everything that is not a letter or digit
/// into single spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Where a poster image lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ImageReference {
    /// A file on the local filesystem.
    File(PathBuf),
    /// An identifier only the messaging transport understands, such as an
    /// uploaded photo id.
    Transport(String),
}

impl ImageReference {
    /// Interpret operator input: an existing path becomes a file reference,
    /// anything else is passed through to the transport untouched.
    pub fn from_user_input(input: &str) -> Self {
        let path = Path::new(input);
        if path.is_file() {
            Self::File(path.to_path_buf())
        } else {
            Self::Transport(input.to_string())
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Transport(_) => None,
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Transport(id) => write!(f, "transport:{id}"),
        }
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("file:") {
            Ok(Self::File(PathBuf::from(path)))
        } else if let Some(id) = s.strip_prefix("transport:") {
            Ok(Self::Transport(id.to_string()))
        } else {
            Err(Error::invalid_input(format!("Malformed image reference: {s}")))
        }
    }
}

/// Metadata the provider returned for the chosen candidate.
///
/// Every descriptive field is optional; consumers render what is present
/// and skip the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider name, e.g. `"tmdb"`.
    pub provider: String,
    /// Provider-specific identifier.
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_year: Option<u16>,
    #[serde(default)]
    pub overview: Option<String>,
    /// Audience rating on a 0-10 scale.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl ProviderMetadata {
    /// Decode a stored JSON blob. A malformed or outdated blob yields `None`
    /// instead of an error.
    pub fn from_json(blob: &str) -> Option<Self> {
        serde_json::from_str(blob).ok()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
