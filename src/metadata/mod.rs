//! Metadata providers used to find posters for parsed titles.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition and the search candidate type.
//! - [`providers`] -- Concrete provider implementations (TMDB).

pub mod provider;
pub mod providers;

pub use provider::{Candidate, MetadataProvider};
pub use providers::TmdbProvider;
