//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting via [`governor`] (4 requests / second by default).
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - Configurable request timeout and base URLs.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use governor::{Quota, RateLimiter};
use reelforge_common::MediaType;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TmdbConfig;
use crate::metadata::provider::{Candidate, MetadataProvider};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("reelforge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchResult>,
}

/// Movie and TV search results share one shape; movies carry `title` and
/// `release_date`, shows carry `name` and `first_air_date`.
#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    popularity: Option<f64>,
    vote_average: Option<f64>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// # Examples
///
/// ```no_run
/// use reelforge::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into()).unwrap();
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    api_key: String,
    language: String,
    api_base: String,
    image_base: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a provider against the public TMDB endpoints with default limits.
    pub fn new(api_key: String, language: String) -> anyhow::Result<Self> {
        Self::from_config(&TmdbConfig {
            api_key,
            language,
            ..TmdbConfig::default()
        })
    }

    /// Create a provider from the `[tmdb]` configuration section.
    pub fn from_config(config: &TmdbConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build reqwest client")?;

        let per_second = NonZeroU32::new(config.requests_per_second)
            .context("tmdb.requests_per_second must be at least 1")?;
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            image_base: config.image_base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, url: &str) -> anyhow::Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {}", redact(url)))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {}", redact(url)))?;

            return Ok(resp);
        }
    }

    /// Build a full API URL with the API key and language query parameters.
    fn url(&self, path: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.api_base,
            urlencoded(&self.api_key),
            urlencoded(&self.language)
        );
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoded(value));
        }
        url
    }

    /// Convert a TMDB image path fragment to a full URL.
    fn image_url(&self, path: &str) -> String {
        format!("{}{path}", self.image_base)
    }

    fn to_candidate(&self, r: TmdbSearchResult) -> Candidate {
        let release = r.release_date.or(r.first_air_date);
        Candidate {
            id: r.id,
            title: r.title.or(r.name).unwrap_or_default(),
            release_year: parse_year(&release),
            popularity: r.popularity,
            poster_url: r
                .poster_path
                .filter(|p| !p.is_empty())
                .map(|p| self.image_url(&p)),
            overview: r.overview.filter(|o| !o.trim().is_empty()),
            rating: r.vote_average.filter(|v| *v > 0.0).map(round_rating),
        }
    }
}

/// Minimal percent-encoding for query parameter values.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";

/// Strip the API key from a URL before it reaches a log line or error.
fn redact(url: &str) -> String {
    match url.find("api_key=") {
        Some(start) => {
            let value_start = start + "api_key=".len();
            let value_end = url[value_start..]
                .find('&')
                .map_or(url.len(), |i| value_start + i);
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: &Option<String>) -> Option<u16> {
    date.as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
}

fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search(
        &self,
        title: &str,
        year: Option<u16>,
        media_type: MediaType,
    ) -> anyhow::Result<Vec<Candidate>> {
        let (path, year_param) = match media_type {
            MediaType::Series => ("/search/tv", "first_air_date_year"),
            MediaType::Movie | MediaType::Unknown => ("/search/movie", "year"),
        };

        let mut params = vec![("query", title), ("page", "1")];
        let year_str = year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push((year_param, y.as_str()));
        }

        let url = self.url(path, &params);
        debug!(url = %redact(&url), media_type = %media_type, "TMDB search");

        let body: TmdbSearchResponse = self
            .get(&url)
            .await?
            .json()
            .await
            .context("failed to parse TMDB search response")?;

        Ok(body
            .results
            .into_iter()
            .map(|r| self.to_candidate(r))
            .collect())
    }

    async fn download_image(&self, url: &str) -> anyhow::Result<Bytes> {
        debug!(url = %url, "TMDB download image");

        self.get(url)
            .await?
            .bytes()
            .await
            .with_context(|| format!("failed to read image body: {url}"))
    }
}
