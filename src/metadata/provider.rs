//! Trait definition and types for metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait the poster resolver
//! consumes, along with the candidate type returned by provider searches.

use async_trait::async_trait;
use bytes::Bytes;
use reelforge_common::{MediaType, ProviderMetadata};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A single result returned from a metadata search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Provider-specific identifier for this item (e.g. TMDB numeric ID).
    pub id: u64,
    /// Display title of the item.
    pub title: String,
    /// Release or premiere year, if known.
    pub release_year: Option<u16>,
    /// Provider popularity score; higher is more popular.
    pub popularity: Option<f64>,
    /// Fully-qualified poster URL, if the item has one.
    pub poster_url: Option<String>,
    /// Short synopsis / overview text.
    pub overview: Option<String>,
    /// Community rating on a 0-10 scale, rounded to one decimal.
    pub rating: Option<f64>,
}

impl Candidate {
    /// Convert into the metadata record stored alongside a cached poster.
    pub fn into_metadata(self, provider: &str) -> ProviderMetadata {
        ProviderMetadata {
            provider: provider.to_string(),
            id: self.id,
            title: self.title,
            release_year: self.release_year,
            overview: self.overview,
            rating: self.rating,
            popularity: self.popularity,
            poster_url: self.poster_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait implemented by metadata backends.
///
/// Errors are recoverable misses from the caller's point of view: the
/// resolver logs them and falls back to the default background.
///
/// Providers are shared across tasks behind an `Arc`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has been configured with
    /// credentials and is ready to serve requests.
    fn is_available(&self) -> bool;

    /// Search for `title`, constrained by `year` when known.
    ///
    /// Series use the provider's TV search, everything else its movie
    /// search. Results are returned in the provider's own order.
    async fn search(
        &self,
        title: &str,
        year: Option<u16>,
        media_type: MediaType,
    ) -> anyhow::Result<Vec<Candidate>>;

    /// Download the image at `url`.
    async fn download_image(&self, url: &str) -> anyhow::Result<Bytes>;
}
