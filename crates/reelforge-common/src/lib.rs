//! Reelforge-Common: shared types and error handling.
//!
//! This crate provides functionality used across reelforge:
//!
//! - **Core Types**: [`MediaType`], the poster [`CacheKey`], [`ImageReference`]
//!   and typed [`ProviderMetadata`]
//! - **Error Handling**: common error type and result alias
//!
//! # Examples
//!
//! ```
//! use reelforge_common::{CacheKey, MediaType};
//!
//! let key = CacheKey::new("Beast Games", None, MediaType::Series);
//! assert_eq!(key.storage_key(), "beast games|-|series");
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
