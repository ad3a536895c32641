//! Reelforge-DB: schema, migrations, and queries for the poster cache
//!
//! SQLite storage for reelforge using rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Poster cache, manual override and posted-file queries
//!
//! # Example
//!
//! ```
//! use reelforge_common::{CacheKey, MediaType};
//! use reelforge_db::pool::{get_conn, init_memory_pool};
//! use reelforge_db::queries::poster_cache;
//!
//! let pool = init_memory_pool().unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let key = CacheKey::new("Jawan", Some(2023), MediaType::Movie);
//! assert!(poster_cache::get(&conn, &key).unwrap().is_none());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use models::{ManualOverrideEntry, PostedFileRecord, PosterCacheEntry};
pub use pool::{get_conn, init_memory_pool, init_pool, DbPool};
