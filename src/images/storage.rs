//! Filesystem storage for posters downloaded from a metadata provider.
//!
//! Each provider item gets exactly one file, `raw_{provider}_{id}.jpg`, under
//! the cache directory. Downloads are decoded and re-encoded as JPEG so later
//! composition never meets an unreadable file.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;

/// Metadata about a stored poster file.
#[derive(Debug, Clone)]
pub struct StoredPoster {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Filesystem manager for raw provider posters.
#[derive(Debug, Clone)]
pub struct PosterStorage {
    base_dir: PathBuf,
}

impl PosterStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Filesystem path of the poster for one provider item.
    pub fn raw_path(&self, provider: &str, id: u64) -> PathBuf {
        self.base_dir.join(format_filename(provider, id))
    }

    /// Path of an already-downloaded poster, if one is on disk.
    pub fn existing(&self, provider: &str, id: u64) -> Option<PathBuf> {
        let path = self.raw_path(provider, id);
        path.is_file().then_some(path)
    }

    /// Decode `data` and store it as the poster for `(provider, id)`.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers never observe a partially written poster.
    pub fn store(&self, provider: &str, id: u64, data: &[u8]) -> Result<StoredPoster> {
        let img = image::load_from_memory(data).context("Failed to decode poster data")?;

        std::fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create poster directory: {}", self.base_dir.display())
        })?;

        let mut buf = Cursor::new(Vec::new());
        img.to_rgb8()
            .write_to(&mut buf, ImageFormat::Jpeg)
            .context("Failed to encode poster as JPEG")?;

        let path = self.raw_path(provider, id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir)
            .context("Failed to create temporary poster file")?;
        tmp.write_all(buf.get_ref())
            .context("Failed to write temporary poster file")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to write poster file: {}", path.display()))?;

        Ok(StoredPoster {
            path,
            width: img.width(),
            height: img.height(),
        })
    }
}

/// Format the filename for a provider poster.
fn format_filename(provider: &str, id: u64) -> String {
    format!("raw_{provider}_{id}.jpg")
}
