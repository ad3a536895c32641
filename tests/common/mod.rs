//! Shared helpers for integration tests.
//!
//! [`StubProvider`] and [`CountingStore`] count every call so tests can assert
//! how many times the resolver reached the provider or the store.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use reelforge::config::ComposerConfig;
use reelforge::images::{PosterComposer, PosterStorage, TextFace};
use reelforge::metadata::{Candidate, MetadataProvider};
use reelforge::store::{CacheStore, SqliteCacheStore};
use reelforge::{PostPipeline, PosterResolver};
use reelforge_common::{CacheKey, ImageReference, MediaType, Result};
use reelforge_db::{ManualOverrideEntry, PostedFileRecord, PosterCacheEntry};
use reelforge_parser::FilenameParser;

/// A small JPEG suitable as a downloaded poster.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([120, 40, 200]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)
        .expect("encode test jpeg");
    buf.into_inner()
}

pub fn candidate(id: u64, title: &str, year: Option<u16>) -> Candidate {
    Candidate {
        id,
        title: title.to_string(),
        release_year: year,
        popularity: Some(10.0),
        poster_url: Some(format!("https://images.test/{id}.jpg")),
        overview: Some(format!("Overview for {title}")),
        rating: Some(7.5),
    }
}

/// Provider returning fixed candidates, with call counters and an optional
/// delay on every search.
pub struct StubProvider {
    pub candidates: Vec<Candidate>,
    pub available: bool,
    pub fail_search: bool,
    pub delay: Duration,
    pub searches: AtomicUsize,
    pub downloads: AtomicUsize,
}

impl StubProvider {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            available: true,
            fail_search: false,
            delay: Duration::ZERO,
            searches: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_search: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn search(
        &self,
        _title: &str,
        _year: Option<u16>,
        _media_type: MediaType,
    ) -> anyhow::Result<Vec<Candidate>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_search {
            anyhow::bail!("provider unreachable");
        }
        Ok(self.candidates.clone())
    }

    async fn download_image(&self, _url: &str) -> anyhow::Result<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(jpeg_bytes(40, 60)))
    }
}

/// In-memory SQLite store that counts poster-cache traffic.
pub struct CountingStore {
    inner: SqliteCacheStore,
    pub poster_reads: AtomicUsize,
    pub poster_writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteCacheStore::in_memory().expect("in-memory store"),
            poster_reads: AtomicUsize::new(0),
            poster_writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.poster_reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.poster_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn get_poster(&self, key: &CacheKey) -> Result<Option<PosterCacheEntry>> {
        self.poster_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_poster(key).await
    }

    async fn upsert_poster(&self, entry: &PosterCacheEntry) -> Result<()> {
        self.poster_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_poster(entry).await
    }

    async fn save_override(
        &self,
        hint: &str,
        image: &ImageReference,
    ) -> Result<ManualOverrideEntry> {
        self.inner.save_override(hint, image).await
    }

    async fn list_overrides(&self) -> Result<Vec<ManualOverrideEntry>> {
        self.inner.list_overrides().await
    }

    async fn append_posted(&self, message_id: i64, title: &str) -> Result<PostedFileRecord> {
        self.inner.append_posted(message_id, title).await
    }

    async fn get_posted(&self, message_id: i64) -> Result<Option<PostedFileRecord>> {
        self.inner.get_posted(message_id).await
    }

    async fn recent_posted(&self, limit: u32) -> Result<Vec<PostedFileRecord>> {
        self.inner.recent_posted(limit).await
    }
}

/// Resolver over `store` and `provider`, storing raw posters under `dir`.
pub fn resolver(
    dir: &Path,
    store: Arc<dyn CacheStore>,
    provider: Arc<dyn MetadataProvider>,
) -> PosterResolver {
    PosterResolver::new(
        store,
        provider,
        PosterStorage::new(dir.join("raw")),
        dir.join("fallback.jpg"),
    )
}

/// Full pipeline with built-in fonts writing composed posters under `dir/out`.
pub fn pipeline(
    dir: &Path,
    store: Arc<dyn CacheStore>,
    provider: Arc<dyn MetadataProvider>,
) -> PostPipeline {
    let composer = PosterComposer::with_faces(
        ComposerConfig::default(),
        dir.join("out"),
        dir.join("fallback.jpg"),
        TextFace::Builtin,
        TextFace::Builtin,
    );
    PostPipeline::new(
        FilenameParser::default(),
        resolver(dir, Arc::clone(&store), provider),
        composer,
        store,
    )
}
