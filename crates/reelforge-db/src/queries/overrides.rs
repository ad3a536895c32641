//! Manual override queries.
//!
//! Hints are normalized before storage. Saving an existing hint replaces its
//! image and bumps `saved_at`.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use reelforge_common::{Error, ImageReference, Result};

use super::{format_timestamp, parse_timestamp};
use crate::models::ManualOverrideEntry;

/// Lowercase and collapse whitespace.
pub fn normalize_hint(hint: &str) -> String {
    hint.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Save (or replace) the override for `hint`.
pub fn save(
    conn: &Connection,
    hint: &str,
    image: &ImageReference,
    saved_at: DateTime<Utc>,
) -> Result<ManualOverrideEntry> {
    let hint = normalize_hint(hint);
    if hint.is_empty() {
        return Err(Error::invalid_input("Override hint must not be empty"));
    }

    conn.execute(
        "INSERT INTO manual_overrides (hint, image_ref, saved_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(hint) DO UPDATE SET
            image_ref = excluded.image_ref,
            saved_at = excluded.saved_at",
        params![hint, image.to_string(), format_timestamp(&saved_at)],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(ManualOverrideEntry {
        hint,
        image: image.clone(),
        saved_at,
    })
}

/// Get the override stored under exactly `hint` (after normalization).
pub fn get(conn: &Connection, hint: &str) -> Result<Option<ManualOverrideEntry>> {
    match conn.query_row(
        "SELECT hint, image_ref, saved_at FROM manual_overrides WHERE hint = ?1",
        params![normalize_hint(hint)],
        row_to_entry,
    ) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// All overrides, most recently saved first.
pub fn list_recent(conn: &Connection) -> Result<Vec<ManualOverrideEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT hint, image_ref, saved_at FROM manual_overrides
             ORDER BY saved_at DESC, rowid DESC",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], row_to_entry)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<ManualOverrideEntry> {
    let image: String = row.get(1)?;
    let image = image
        .parse::<ImageReference>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(ManualOverrideEntry {
        hint: row.get(0)?,
        image,
        saved_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
    })
}
