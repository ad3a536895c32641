//! Poster cache queries.
//!
//! One row per normalized `(title, year, media type)`. Writes are a single
//! `INSERT ... ON CONFLICT DO UPDATE`, so each key is written atomically.

use std::path::PathBuf;

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use reelforge_common::{CacheKey, Error, MediaType, ProviderMetadata, Result};

use super::{format_timestamp, parse_timestamp};
use crate::models::PosterCacheEntry;

/// Look up the cached poster for `key`.
pub fn get(conn: &Connection, key: &CacheKey) -> Result<Option<PosterCacheEntry>> {
    match conn.query_row(
        "SELECT title, year, media_type, poster_path, provider_metadata, updated_at
         FROM poster_cache WHERE cache_key = ?1",
        params![key.storage_key()],
        row_to_entry,
    ) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Insert or replace the cache entry for `entry.key`.
pub fn upsert(conn: &Connection, entry: &PosterCacheEntry) -> Result<()> {
    let metadata = entry
        .metadata
        .as_ref()
        .map(ProviderMetadata::to_json)
        .transpose()?;

    conn.execute(
        "INSERT INTO poster_cache (cache_key, title, year, media_type, poster_path, provider_metadata, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(cache_key) DO UPDATE SET
            poster_path = excluded.poster_path,
            provider_metadata = excluded.provider_metadata,
            updated_at = excluded.updated_at",
        params![
            entry.key.storage_key(),
            entry.key.title,
            entry.key.year,
            entry.key.media_type.as_str(),
            entry.poster_path.to_string_lossy(),
            metadata,
            format_timestamp(&entry.updated_at),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Number of cached posters.
pub fn count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM poster_cache", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<PosterCacheEntry> {
    let media_type: String = row.get(2)?;
    let media_type = media_type
        .parse::<MediaType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let metadata: Option<String> = row.get(4)?;

    Ok(PosterCacheEntry {
        key: CacheKey {
            title: row.get(0)?,
            year: row.get(1)?,
            media_type,
        },
        poster_path: PathBuf::from(row.get::<_, String>(3)?),
        metadata: metadata.as_deref().and_then(ProviderMetadata::from_json),
        updated_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{init_memory_pool, PooledConnection};
    use chrono::Utc;

    fn setup_test_db() -> PooledConnection {
        let pool = init_memory_pool().unwrap();
        pool.get().unwrap()
    }

    fn metadata(title: &str) -> ProviderMetadata {
        ProviderMetadata {
            provider: "tmdb".into(),
            id: 42,
            title: title.into(),
            release_year: Some(2023),
            overview: Some("A man sets out to right wrongs.".into()),
            rating: Some(7.1),
            popularity: Some(55.0),
            poster_url: Some("https://image.tmdb.org/t/p/original/x.jpg".into()),
        }
    }

    fn entry(key: CacheKey, path: &str) -> PosterCacheEntry {
        PosterCacheEntry {
            key,
            poster_path: PathBuf::from(path),
            metadata: Some(metadata("Jawan")),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let conn = setup_test_db();
        let key = CacheKey::new("Jawan", Some(2023), MediaType::Movie);

        upsert(&conn, &entry(key.clone(), "/cache/jawan.jpg")).unwrap();

        let fetched = get(&conn, &key).unwrap().unwrap();
        assert_eq!(fetched.key, key);
        assert_eq!(fetched.poster_path, PathBuf::from("/cache/jawan.jpg"));
        assert_eq!(fetched.metadata.unwrap().title, "Jawan");
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = setup_test_db();
        let key = CacheKey::new("Nothing", None, MediaType::Movie);
        assert!(get(&conn, &key).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let conn = setup_test_db();
        let key = CacheKey::new("Beast Games", None, MediaType::Series);

        upsert(&conn, &entry(key.clone(), "/cache/a.jpg")).unwrap();
        upsert(&conn, &entry(key.clone(), "/cache/b.jpg")).unwrap();

        assert_eq!(count(&conn).unwrap(), 1);
        let fetched = get(&conn, &key).unwrap().unwrap();
        assert_eq!(fetched.poster_path, PathBuf::from("/cache/b.jpg"));
    }

    #[test]
    fn test_year_and_type_are_part_of_key() {
        let conn = setup_test_db();
        let with_year = CacheKey::new("Dune", Some(2021), MediaType::Movie);
        let without_year = CacheKey::new("Dune", None, MediaType::Movie);
        let series = CacheKey::new("Dune", Some(2021), MediaType::Series);

        upsert(&conn, &entry(with_year.clone(), "/a.jpg")).unwrap();
        upsert(&conn, &entry(without_year.clone(), "/b.jpg")).unwrap();
        upsert(&conn, &entry(series.clone(), "/c.jpg")).unwrap();

        assert_eq!(count(&conn).unwrap(), 3);
        assert_eq!(get(&conn, &without_year).unwrap().unwrap().poster_path, PathBuf::from("/b.jpg"));
    }

    #[test]
    fn test_undecodable_metadata_reads_as_absent() {
        let conn = setup_test_db();
        let key = CacheKey::new("Leo", Some(2023), MediaType::Movie);
        upsert(&conn, &entry(key.clone(), "/leo.jpg")).unwrap();

        conn.execute(
            "UPDATE poster_cache SET provider_metadata = '{\"legacy\": 1}' WHERE cache_key = ?1",
            params![key.storage_key()],
        )
        .unwrap();

        let fetched = get(&conn, &key).unwrap().unwrap();
        assert!(fetched.metadata.is_none());
        assert_eq!(fetched.poster_path, PathBuf::from("/leo.jpg"));
    }
}
