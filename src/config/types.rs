use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub composer: ComposerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    /// TMDB v3 API key. Falls back to the `TMDB_API_KEY` environment variable
    /// when left empty.
    #[serde(default)]
    pub api_key: String,

    /// ISO-639-1 language tag sent with every request
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override for the REST endpoint (used by tests)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Override for the image CDN prefix (used by tests)
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_requests_per_second() -> u32 {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/original".to_string()
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: default_language(),
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout_secs(),
            api_base_url: default_api_base_url(),
            image_base_url: default_image_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database holding the poster cache, overrides and post log
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Where downloaded provider posters are kept
    #[serde(default = "default_poster_cache_dir")]
    pub poster_cache_dir: PathBuf,

    /// Where composed posters are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("reelforge.db")
}

fn default_poster_cache_dir() -> PathBuf {
    PathBuf::from("posters/raw")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("posters")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            poster_cache_dir: default_poster_cache_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetsConfig {
    #[serde(default = "default_bold_font")]
    pub bold_font: PathBuf,

    #[serde(default = "default_regular_font")]
    pub regular_font: PathBuf,

    /// Background used when no poster can be resolved
    #[serde(default = "default_fallback_image")]
    pub fallback_image: PathBuf,
}

fn default_bold_font() -> PathBuf {
    PathBuf::from("assets/fonts/bold.ttf")
}

fn default_regular_font() -> PathBuf {
    PathBuf::from("assets/fonts/regular.ttf")
}

fn default_fallback_image() -> PathBuf {
    PathBuf::from("assets/fallback.jpg")
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            bold_font: default_bold_font(),
            regular_font: default_regular_font(),
            fallback_image: default_fallback_image(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComposerConfig {
    /// Output width in pixels; height follows the source aspect ratio
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_title_max_size")]
    pub title_max_size: u32,

    #[serde(default = "default_title_min_size")]
    pub title_min_size: u32,

    #[serde(default = "default_subtitle_size")]
    pub subtitle_size: u32,

    #[serde(default = "default_shadow_offset")]
    pub shadow_offset: i32,

    /// Horizontal margin the title must fit within, per side
    #[serde(default = "default_margin")]
    pub margin: u32,
}

fn default_width() -> u32 {
    1080
}

fn default_jpeg_quality() -> u8 {
    92
}

fn default_title_max_size() -> u32 {
    80
}

fn default_title_min_size() -> u32 {
    40
}

fn default_subtitle_size() -> u32 {
    44
}

fn default_shadow_offset() -> i32 {
    3
}

fn default_margin() -> u32 {
    40
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            jpeg_quality: default_jpeg_quality(),
            title_max_size: default_title_max_size(),
            title_min_size: default_title_min_size(),
            subtitle_size: default_subtitle_size(),
            shadow_offset: default_shadow_offset(),
            margin: default_margin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Upper bound on a provider search plus poster download
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}
