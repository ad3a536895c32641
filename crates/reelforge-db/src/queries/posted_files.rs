//! Posted-file audit log queries.
//!
//! Rows are appended once per successful post and never updated.

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, Row};
use reelforge_common::{Error, Result};

use super::{format_timestamp, parse_timestamp};
use crate::models::PostedFileRecord;

/// Append a record for `message_id`.
///
/// Fails with [`Error::InvalidInput`] if the message was already recorded.
pub fn append(conn: &Connection, message_id: i64, title: &str) -> Result<PostedFileRecord> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO posted_files (message_id, title, posted_at) VALUES (?1, ?2, ?3)",
        params![message_id, title, format_timestamp(&now)],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Error::invalid_input(format!("Message {message_id} is already recorded as posted"))
        }
        other => Error::database(other.to_string()),
    })?;

    Ok(PostedFileRecord {
        id: conn.last_insert_rowid(),
        message_id,
        title: title.to_string(),
        posted_at: now,
    })
}

/// Whether `message_id` has been posted before.
pub fn is_posted(conn: &Connection, message_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posted_files WHERE message_id = ?1)",
        params![message_id],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// The record for `message_id`, if any.
pub fn get(conn: &Connection, message_id: i64) -> Result<Option<PostedFileRecord>> {
    match conn.query_row(
        "SELECT id, message_id, title, posted_at FROM posted_files WHERE message_id = ?1",
        params![message_id],
        row_to_record,
    ) {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// The `limit` most recent records, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<PostedFileRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, message_id, title, posted_at FROM posted_files
             ORDER BY id DESC LIMIT ?1",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map(params![limit], row_to_record)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PostedFileRecord> {
    Ok(PostedFileRecord {
        id: row.get(0)?,
        message_id: row.get(1)?,
        title: row.get(2)?,
        posted_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
    })
}
