mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable consulted when `tmdb.api_key` is empty
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./reelforge.toml",
        "~/.config/reelforge/config.toml",
        "/etc/reelforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env(&mut config);
    Ok(config)
}

fn apply_env(config: &mut Config) {
    if config.tmdb.api_key.is_empty() {
        if let Ok(key) = std::env::var(TMDB_API_KEY_ENV) {
            config.tmdb.api_key = key.trim().to_string();
        }
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.tmdb.requests_per_second == 0 {
        anyhow::bail!("tmdb.requests_per_second must be at least 1");
    }

    if config.tmdb.timeout_secs == 0 || config.resolver.fetch_timeout_secs == 0 {
        anyhow::bail!("Timeouts must be at least 1 second");
    }

    let composer = &config.composer;
    if composer.width == 0 {
        anyhow::bail!("composer.width cannot be 0");
    }

    if composer.jpeg_quality == 0 || composer.jpeg_quality > 100 {
        anyhow::bail!("composer.jpeg_quality must be within 1..=100");
    }

    if composer.title_min_size == 0 || composer.title_min_size > composer.title_max_size {
        anyhow::bail!(
            "composer.title_min_size ({}) must be between 1 and title_max_size ({})",
            composer.title_min_size,
            composer.title_max_size
        );
    }

    if composer.margin * 2 >= composer.width {
        anyhow::bail!("composer.margin leaves no room for the title");
    }

    for path in [&config.assets.bold_font, &config.assets.regular_font, &config.assets.fallback_image] {
        if !path.exists() {
            tracing::warn!("Asset does not exist, built-in default will be used: {:?}", path);
        }
    }

    Ok(())
}
