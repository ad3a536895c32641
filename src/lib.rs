//! Reelforge - posters, captions and download buttons for media file posts
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod dispatcher;
pub mod formatter;
pub mod images;
pub mod metadata;
pub mod pipeline;
pub mod resolver;
pub mod store;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use pipeline::{FileEvent, PostOutput, PostPipeline};
pub use resolver::{PosterResolver, Resolution, ResolutionSource, ResolveOptions};
pub use store::{CacheStore, SqliteCacheStore};
