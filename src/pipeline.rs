//! One file event in, one post out: parse, resolve, compose, format.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reelforge_common::{ImageReference, ProviderMetadata};
use reelforge_db::{ManualOverrideEntry, PostedFileRecord};
use reelforge_parser::{FilenameParser, ParsedFilename};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::formatter::{self, ButtonRow, FileVariant};
use crate::images::{PosterComposer, PosterStorage};
use crate::metadata::{MetadataProvider, TmdbProvider};
use crate::resolver::{PosterResolver, Resolution, ResolutionSource, ResolveOptions};
use crate::store::{CacheStore, SqliteCacheStore};

/// An inbound file from the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub message_id: i64,
    pub filename: String,
    pub size_bytes: Option<u64>,
    /// Image supplied with the file; used as-is instead of resolving one.
    pub supplied_image: Option<ImageReference>,
}

impl FileEvent {
    pub fn new(message_id: i64, filename: impl Into<String>) -> Self {
        Self {
            message_id,
            filename: filename.into(),
            size_bytes: None,
            supplied_image: None,
        }
    }
}

/// Everything the transport needs to publish one post.
#[derive(Debug, Clone, Serialize)]
pub struct PostOutput {
    pub parsed: ParsedFilename,
    pub image: ImageReference,
    pub caption: String,
    pub buttons: Vec<ButtonRow>,
    /// `None` when the event carried its own image.
    pub resolution: Option<Resolution>,
}

/// Wires the parser, resolver, composer and formatter together.
#[derive(Clone)]
pub struct PostPipeline {
    parser: FilenameParser,
    resolver: PosterResolver,
    composer: Arc<PosterComposer>,
    store: Arc<dyn CacheStore>,
}

impl PostPipeline {
    pub fn new(
        parser: FilenameParser,
        resolver: PosterResolver,
        composer: PosterComposer,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            parser,
            resolver,
            composer: Arc::new(composer),
            store,
        }
    }

    /// Build the production pipeline: SQLite store, TMDB provider, and the
    /// configured composer assets.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn CacheStore> = Arc::new(
            SqliteCacheStore::open(&config.storage.database_path).with_context(|| {
                format!(
                    "Failed to open database: {}",
                    config.storage.database_path.display()
                )
            })?,
        );
        let provider: Arc<dyn MetadataProvider> = Arc::new(TmdbProvider::from_config(&config.tmdb)?);
        if !provider.is_available() {
            warn!("No TMDB API key configured, posters will use the fallback image");
        }

        let resolver = PosterResolver::new(
            Arc::clone(&store),
            provider,
            PosterStorage::new(config.storage.poster_cache_dir.clone()),
            config.assets.fallback_image.clone(),
        )
        .with_fetch_timeout(Duration::from_secs(config.resolver.fetch_timeout_secs));

        let composer = PosterComposer::new(
            config.composer.clone(),
            &config.assets,
            config.storage.output_dir.clone(),
        );

        Ok(Self::new(FilenameParser::default(), resolver, composer, store))
    }

    pub fn resolver(&self) -> &PosterResolver {
        &self.resolver
    }

    /// Process one event, offering only the event's own file.
    pub async fn process(&self, event: &FileEvent) -> PostOutput {
        self.process_with_variants(event, &[]).await
    }

    /// Process one event; `others` are further files for the same title or
    /// episode that should get buttons next to this one.
    pub async fn process_with_variants(
        &self,
        event: &FileEvent,
        others: &[FileVariant],
    ) -> PostOutput {
        self.process_with(event, others, ResolveOptions::default()).await
    }

    pub async fn process_with(
        &self,
        event: &FileEvent,
        others: &[FileVariant],
        options: ResolveOptions,
    ) -> PostOutput {
        let parsed = self.parser.parse(&event.filename);
        info!(
            message_id = event.message_id,
            title = %parsed.title,
            media_type = %parsed.media_type,
            "Processing file"
        );

        let (image, resolution) = match &event.supplied_image {
            Some(image) => {
                debug!(message_id = event.message_id, "Using supplied image");
                (image.clone(), None)
            }
            None => {
                let resolution = self.resolver.resolve_with(&parsed, options).await;
                let image = match resolution.source {
                    ResolutionSource::Override => resolution.image.clone(),
                    _ => {
                        self.compose(
                            resolution.image.as_path().map(PathBuf::from),
                            &parsed,
                            resolution.metadata.clone(),
                        )
                        .await
                    }
                };
                (image, Some(resolution))
            }
        };

        let mut variants = vec![FileVariant {
            message_id: event.message_id,
            quality: parsed.quality,
            size_label: event.size_bytes.map(formatter::human_size).unwrap_or_default(),
        }];
        variants.extend(others.iter().cloned());

        let metadata = resolution.as_ref().and_then(|r| r.metadata.as_ref());
        let post = formatter::format(&parsed, metadata, &variants);

        PostOutput {
            parsed,
            image,
            caption: post.caption,
            buttons: post.buttons,
            resolution,
        }
    }

    /// Compose on the blocking pool; any failure yields the fallback image.
    async fn compose(
        &self,
        source: Option<PathBuf>,
        parsed: &ParsedFilename,
        metadata: Option<ProviderMetadata>,
    ) -> ImageReference {
        let composer = Arc::clone(&self.composer);
        let owned = parsed.clone();
        let result = tokio::task::spawn_blocking(move || {
            composer.compose(source.as_deref(), &owned, metadata.as_ref())
        })
        .await;

        match result {
            Ok(Ok(path)) => ImageReference::File(path),
            Ok(Err(e)) => {
                warn!(title = %parsed.title, error = %e, "Composition failed, using fallback image");
                ImageReference::File(self.composer.fallback_image().to_path_buf())
            }
            Err(e) => {
                warn!(title = %parsed.title, error = %e, "Composition task failed, using fallback image");
                ImageReference::File(self.composer.fallback_image().to_path_buf())
            }
        }
    }

    /// Record a successful post. Store failures are logged, never fatal.
    pub async fn record_posted(&self, message_id: i64, title: &str) -> Option<PostedFileRecord> {
        match self.store.append_posted(message_id, title).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(message_id, error = %e, "Failed to record posted file");
                None
            }
        }
    }

    /// Whether `message_id` was posted before; `false` if the store is unreachable.
    pub async fn is_posted(&self, message_id: i64) -> bool {
        match self.store.is_posted(message_id).await {
            Ok(posted) => posted,
            Err(e) => {
                warn!(message_id, error = %e, "Posted-file lookup failed");
                false
            }
        }
    }

    /// The audit record for `message_id`, if any.
    pub async fn posted_record(&self, message_id: i64) -> anyhow::Result<Option<PostedFileRecord>> {
        Ok(self.store.get_posted(message_id).await?)
    }

    /// The most recent posted-file records, newest first.
    pub async fn recent_posted(&self, limit: u32) -> anyhow::Result<Vec<PostedFileRecord>> {
        Ok(self.store.recent_posted(limit).await?)
    }

    /// Save an operator-supplied poster for titles matching `hint`.
    pub async fn save_override(
        &self,
        hint: &str,
        image: ImageReference,
    ) -> anyhow::Result<ManualOverrideEntry> {
        let entry = self.store.save_override(hint, &image).await?;
        info!(hint = %entry.hint, image = %entry.image, "Saved manual override");
        Ok(entry)
    }
}
