//! Persistent storage for the poster cache, manual overrides and post log.
//!
//! [`CacheStore`] is the seam the resolver and pipeline consume;
//! [`SqliteCacheStore`] implements it over `reelforge-db`. SQLite calls are
//! synchronous, so every query runs on the blocking pool.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reelforge_common::{CacheKey, Error, ImageReference, Result};
use reelforge_db::queries::{overrides, posted_files, poster_cache};
use reelforge_db::{
    get_conn, init_memory_pool, init_pool, DbPool, ManualOverrideEntry, PostedFileRecord,
    PosterCacheEntry,
};
use rusqlite::Connection;

/// Lookup, upsert and append access to the three persisted collections.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The cached poster for `key`, if any.
    async fn get_poster(&self, key: &CacheKey) -> Result<Option<PosterCacheEntry>>;

    /// Insert or replace the entry for `entry.key`. Atomic per key.
    async fn upsert_poster(&self, entry: &PosterCacheEntry) -> Result<()>;

    /// Save an override for `hint`, replacing any earlier one for the same hint.
    async fn save_override(&self, hint: &str, image: &ImageReference)
        -> Result<ManualOverrideEntry>;

    /// Every override, most recently saved first.
    async fn list_overrides(&self) -> Result<Vec<ManualOverrideEntry>>;

    /// Append a posted-file record. Rejects a message id that was already recorded.
    async fn append_posted(&self, message_id: i64, title: &str) -> Result<PostedFileRecord>;

    /// The posted-file record for `message_id`, if any.
    async fn get_posted(&self, message_id: i64) -> Result<Option<PostedFileRecord>>;

    /// The latest `limit` posted-file records, newest first.
    async fn recent_posted(&self, limit: u32) -> Result<Vec<PostedFileRecord>>;

    /// Whether `message_id` has been posted.
    async fn is_posted(&self, message_id: i64) -> Result<bool> {
        Ok(self.get_posted(message_id).await?.is_some())
    }
}

/// [`CacheStore`] backed by a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: DbPool,
}

impl SqliteCacheStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating and migrating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(init_pool(&path.to_string_lossy())?))
    }

    /// A migrated, private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(init_memory_pool()?))
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::internal(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get_poster(&self, key: &CacheKey) -> Result<Option<PosterCacheEntry>> {
        let key = key.clone();
        self.with_conn(move |conn| poster_cache::get(conn, &key)).await
    }

    async fn upsert_poster(&self, entry: &PosterCacheEntry) -> Result<()> {
        let entry = entry.clone();
        self.with_conn(move |conn| poster_cache::upsert(conn, &entry))
            .await
    }

    async fn save_override(
        &self,
        hint: &str,
        image: &ImageReference,
    ) -> Result<ManualOverrideEntry> {
        let hint = hint.to_string();
        let image = image.clone();
        self.with_conn(move |conn| overrides::save(conn, &hint, &image, Utc::now()))
            .await
    }

    async fn list_overrides(&self) -> Result<Vec<ManualOverrideEntry>> {
        self.with_conn(overrides::list_recent).await
    }

    async fn append_posted(&self, message_id: i64, title: &str) -> Result<PostedFileRecord> {
        let title = title.to_string();
        self.with_conn(move |conn| posted_files::append(conn, message_id, &title))
            .await
    }

    async fn get_posted(&self, message_id: i64) -> Result<Option<PostedFileRecord>> {
        self.with_conn(move |conn| posted_files::get(conn, message_id))
            .await
    }

    async fn recent_posted(&self, limit: u32) -> Result<Vec<PostedFileRecord>> {
        self.with_conn(move |conn| posted_files::recent(conn, limit))
            .await
    }

    async fn is_posted(&self, message_id: i64) -> Result<bool> {
        self.with_conn(move |conn| posted_files::is_posted(conn, message_id))
            .await
    }
}
