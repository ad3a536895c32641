//! Poster resolution: manual override, then cache, then provider fetch,
//! then the fallback background.
//!
//! At most one provider fetch runs per cache key. Concurrent callers for a
//! key that is already being fetched await the same shared result. The fetch
//! itself runs in a spawned task, so a caller that gives up never strands
//! the others, and the in-flight marker is only removed after the cache
//! write has completed.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reelforge_common::{normalize_title, CacheKey, ImageReference, ProviderMetadata};
use reelforge_db::{ManualOverrideEntry, PosterCacheEntry};
use reelforge_parser::ParsedFilename;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::images::PosterStorage;
use crate::metadata::{Candidate, MetadataProvider};
use crate::store::CacheStore;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Minimum token-set Jaccard similarity for a hint to match a title.
const HINT_JACCARD_THRESHOLD: f64 = 0.5;

/// Which branch of the decision sequence produced a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Override,
    Cached,
    Fetched,
    Fallback,
}

/// The poster chosen for one parsed filename.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub image: ImageReference,
    pub metadata: Option<ProviderMetadata>,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Skip the cache lookup and overwrite the cached entry on success.
    /// Manual overrides still take precedence.
    pub force_refresh: bool,
}

type SharedFetch = Shared<BoxFuture<'static, Resolution>>;

/// Resolves posters for parsed filenames.
///
/// Cheap to clone; clones share the in-flight map.
#[derive(Clone)]
pub struct PosterResolver {
    inner: Arc<Inner>,
    fetch_timeout: Duration,
}

struct Inner {
    store: Arc<dyn CacheStore>,
    provider: Arc<dyn MetadataProvider>,
    storage: PosterStorage,
    fallback_image: PathBuf,
    in_flight: Mutex<HashMap<String, SharedFetch>>,
}

/// What the leader needs to run one fetch.
#[derive(Debug, Clone)]
struct FetchRequest {
    key: CacheKey,
    /// Display title sent to the provider.
    title: String,
    force_refresh: bool,
    timeout: Duration,
}

impl PosterResolver {
    pub fn new(
        store: Arc<dyn CacheStore>,
        provider: Arc<dyn MetadataProvider>,
        storage: PosterStorage,
        fallback_image: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                provider,
                storage,
                fallback_image,
                in_flight: Mutex::new(HashMap::new()),
            }),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Bound on a provider search plus poster download for fetches this
    /// handle starts. Callers joining an in-flight fetch wait on the leader's
    /// bound.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub async fn resolve(&self, parsed: &ParsedFilename) -> Resolution {
        self.resolve_with(parsed, ResolveOptions::default()).await
    }

    pub async fn resolve_with(&self, parsed: &ParsedFilename, options: ResolveOptions) -> Resolution {
        if let Some(entry) = self.find_override(&parsed.title).await {
            info!(title = %parsed.title, hint = %entry.hint, "Using manual override");
            return Resolution {
                image: entry.image,
                metadata: None,
                source: ResolutionSource::Override,
            };
        }

        let key = CacheKey::new(&parsed.title, parsed.year, parsed.media_type);

        if !options.force_refresh {
            if let Some(resolution) = self.inner.cached(&key).await {
                debug!(key = %key, "Poster cache hit");
                return resolution;
            }
        }

        self.fetch_deduplicated(FetchRequest {
            key,
            title: parsed.title.clone(),
            force_refresh: options.force_refresh,
            timeout: self.fetch_timeout,
        })
        .await
    }

    /// Number of fetches currently in flight.
    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    async fn find_override(&self, title: &str) -> Option<ManualOverrideEntry> {
        let overrides = match self.inner.store.list_overrides().await {
            Ok(overrides) => overrides,
            Err(e) => {
                warn!(error = %e, "Override lookup failed, continuing without overrides");
                return None;
            }
        };

        // Listed most recent first, so the first match wins.
        overrides
            .into_iter()
            .find(|entry| hint_matches(&entry.hint, title))
    }

    async fn fetch_deduplicated(&self, request: FetchRequest) -> Resolution {
        let storage_key = request.key.storage_key();

        let fetch = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.get(&storage_key) {
                Some(existing) => {
                    debug!(key = %request.key, "Joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let marker = storage_key.clone();
                    // The lock is held until the marker is inserted, so the
                    // task's removal below always happens after insertion.
                    let handle = tokio::spawn(async move {
                        let resolution = inner.fetch_and_store(&request).await;
                        inner.in_flight.lock().remove(&marker);
                        resolution
                    });

                    let fallback = self.inner.fallback();
                    let shared = async move {
                        match handle.await {
                            Ok(resolution) => resolution,
                            Err(e) => {
                                warn!(error = %e, "Fetch task failed");
                                fallback
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    in_flight.insert(storage_key, shared.clone());
                    shared
                }
            }
        };

        fetch.await
    }
}

impl Inner {
    fn fallback(&self) -> Resolution {
        Resolution {
            image: ImageReference::File(self.fallback_image.clone()),
            metadata: None,
            source: ResolutionSource::Fallback,
        }
    }

    /// Cache lookup; store errors and entries whose file is gone are misses.
    async fn cached(&self, key: &CacheKey) -> Option<Resolution> {
        let entry = match self.store.get_poster(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        if !entry.poster_path.is_file() {
            debug!(key = %key, path = %entry.poster_path.display(), "Cached poster missing on disk");
            return None;
        }

        Some(Resolution {
            image: ImageReference::File(entry.poster_path),
            metadata: entry.metadata,
            source: ResolutionSource::Cached,
        })
    }

    async fn fetch_and_store(&self, request: &FetchRequest) -> Resolution {
        let key = &request.key;

        if !request.force_refresh {
            if let Some(resolution) = self.cached(key).await {
                debug!(key = %key, "Cache filled while waiting, skipping fetch");
                return resolution;
            }
        }

        if !self.provider.is_available() {
            warn!(provider = self.provider.name(), "Provider not configured, using fallback");
            return self.fallback();
        }

        let outcome = tokio::time::timeout(request.timeout, self.fetch(request)).await;
        let (poster_path, metadata) = match outcome {
            Ok(Ok(Some(found))) => found,
            Ok(Ok(None)) => {
                info!(key = %key, "No usable poster from provider, using fallback");
                return self.fallback();
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Provider fetch failed, using fallback");
                return self.fallback();
            }
            Err(_) => {
                warn!(key = %key, timeout_ms = request.timeout.as_millis() as u64, "Provider fetch timed out, using fallback");
                return self.fallback();
            }
        };

        let entry = PosterCacheEntry {
            key: key.clone(),
            poster_path: poster_path.clone(),
            metadata: Some(metadata.clone()),
            updated_at: chrono::Utc::now(),
        };
        if let Err(e) = self.store.upsert_poster(&entry).await {
            warn!(key = %key, error = %e, "Failed to persist poster cache entry");
        }

        info!(key = %key, path = %poster_path.display(), "Fetched poster");
        Resolution {
            image: ImageReference::File(poster_path),
            metadata: Some(metadata),
            source: ResolutionSource::Fetched,
        }
    }

    /// Search, pick a candidate and make sure its poster is on disk.
    async fn fetch(
        &self,
        request: &FetchRequest,
    ) -> anyhow::Result<Option<(PathBuf, ProviderMetadata)>> {
        let key = &request.key;
        let candidates = self
            .provider
            .search(&request.title, key.year, key.media_type)
            .await?;
        debug!(key = %key, count = candidates.len(), "Provider candidates");

        let Some(best) = select_candidate(candidates, &request.title, key.year) else {
            return Ok(None);
        };
        let Some(url) = best.poster_url.clone() else {
            debug!(key = %key, id = best.id, "Best candidate has no poster");
            return Ok(None);
        };

        let provider = self.provider.name();
        let path = match self.storage.existing(provider, best.id) {
            Some(path) => path,
            None => {
                let bytes = self.provider.download_image(&url).await?;
                let storage = self.storage.clone();
                let id = best.id;
                tokio::task::spawn_blocking(move || storage.store(provider, id, &bytes))
                    .await??
                    .path
            }
        };

        Ok(Some((path, best.into_metadata(provider))))
    }
}

/// Pick the best candidate: exact title match, then matching year (when the
/// year is known), then popularity. Earlier candidates win ties.
pub fn select_candidate(
    candidates: Vec<Candidate>,
    title: &str,
    year: Option<u16>,
) -> Option<Candidate> {
    let wanted = normalize_title(title);
    let rank = |c: &Candidate| {
        let exact = normalize_title(&c.title) == wanted;
        let year_match = year.is_some() && c.release_year == year;
        (exact, year_match, c.popularity.unwrap_or(0.0))
    };

    candidates
        .into_iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            let (ea, ya, pa) = rank(a);
            let (eb, yb, pb) = rank(b);
            ea.cmp(&eb)
                .then(ya.cmp(&yb))
                .then(pa.total_cmp(&pb))
                .then(ib.cmp(ia))
        })
        .map(|(_, c)| c)
}

/// Whether an override `hint` applies to `title`: the words of one appear as
/// a contiguous run in the other (case-insensitive), or the word sets have a
/// Jaccard similarity of at least 0.5.
pub fn hint_matches(hint: &str, title: &str) -> bool {
    let hint = normalize_title(hint);
    let title = normalize_title(title);
    let hint_words: Vec<&str> = hint.split_whitespace().collect();
    let title_words: Vec<&str> = title.split_whitespace().collect();
    if hint_words.is_empty() || title_words.is_empty() {
        return false;
    }
    if contains_words(&title_words, &hint_words) || contains_words(&hint_words, &title_words) {
        return true;
    }
    jaccard(&hint, &title) >= HINT_JACCARD_THRESHOLD
}

/// Whether `needle` occurs as a contiguous run of whole words in `haystack`.
fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

fn jaccard(a: &str, b: &str) -> f64 {
    let a: BTreeSet<&str> = a.split_whitespace().collect();
    let b: BTreeSet<&str> = b.split_whitespace().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}
