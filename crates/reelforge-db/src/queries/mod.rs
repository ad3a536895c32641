//! Database query modules.
//!
//! - poster_cache: poster cache lookup and upsert
//! - overrides: manual override upsert and listing
//! - posted_files: posted-file audit log

pub mod overrides;
pub mod posted_files;
pub mod poster_cache;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

/// Timestamps are stored as RFC 3339 text with fixed microsecond precision so
/// that lexical order matches chronological order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
