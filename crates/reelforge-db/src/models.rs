//! Rust models matching the database schema.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reelforge_common::{CacheKey, ImageReference, ProviderMetadata};
use serde::{Deserialize, Serialize};

/// A cached poster for one normalized `(title, year, media type)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PosterCacheEntry {
    pub key: CacheKey,
    pub poster_path: PathBuf,
    /// `None` when absent or when the stored blob no longer decodes.
    pub metadata: Option<ProviderMetadata>,
    pub updated_at: DateTime<Utc>,
}

/// An operator-supplied poster bound to a title hint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualOverrideEntry {
    /// Lowercased, whitespace-collapsed hint.
    pub hint: String,
    pub image: ImageReference,
    pub saved_at: DateTime<Utc>,
}

/// One row of the posted-file audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostedFileRecord {
    pub id: i64,
    pub message_id: i64,
    pub title: String,
    pub posted_at: DateTime<Utc>,
}
