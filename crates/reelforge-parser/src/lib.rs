//! reelforge-parser: structured metadata from free-form media filenames.
//!
//! Filenames like `"Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv"` are
//! normalized, tokenized and scanned with an ordered rule table. Every rule
//! claims the spans it matches, and a claimed span is never reconsidered by
//! a lower-priority rule.
//!
//! # Quick start
//!
//! ```
//! use reelforge_parser::parse;
//!
//! let p = parse("Beast.Games.S02E06.720p.WEB-DL.mkv");
//! assert_eq!(p.title, "Beast Games");
//! assert_eq!(p.season, Some(2));
//! assert_eq!(p.quality.map(|q| q.to_string()).as_deref(), Some("720p"));
//! ```

pub mod rules;
pub mod tokenizer;
pub mod types;
mod parser;

pub use parser::FilenameParser;
pub use types::{
    AudioCodec, Claim, Episode, Field, ParseReport, ParsedFilename, Quality, SourceType, Span,
    VideoCodec,
};

/// Parse a filename with the default year window. Never fails.
///
/// # Examples
///
/// ```
/// let p = reelforge_parser::parse("Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv");
/// assert_eq!(p.title, "Jawan");
/// assert_eq!(p.year, Some(2023));
/// assert_eq!(p.release_group.as_deref(), Some("GROUP"));
/// ```
pub fn parse(raw: &str) -> ParsedFilename {
    FilenameParser::default().parse(raw)
}

/// Parse a filename and return the claimed spans alongside the result.
pub fn parse_with_report(raw: &str) -> ParseReport {
    FilenameParser::default().parse_with_report(raw)
}
