//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2. Pool initialization also runs
//! pending migrations.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use reelforge_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a pool backed by the SQLite file at `db_path`, creating the
/// file if needed and running pending migrations.
///
/// # Example
///
/// ```no_run
/// use reelforge_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/reelforge/reelforge.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        // WAL lets readers proceed while a cache write is in progress
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
    });

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

/// Initialize an in-memory database pool for testing.
///
/// Every SQLite in-memory connection is a separate database, so the pool
/// holds exactly one connection.
///
/// # Example
///
/// ```
/// use reelforge_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

fn migrate(pool: &DbPool) -> Result<()> {
    let conn = get_conn(pool)?;
    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;
    Ok(())
}

/// Get a connection from the pool.
///
/// ```
/// use reelforge_db::pool::{init_memory_pool, get_conn};
///
/// let pool = init_memory_pool().unwrap();
/// let conn = get_conn(&pool).unwrap();
/// ```
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory_pool() {
        let pool = init_memory_pool().unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn test_migrations_run_on_init() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='poster_cache'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_memory_pool_keeps_data_between_checkouts() {
        let pool = init_memory_pool().unwrap();

        {
            let conn = get_conn(&pool).unwrap();
            conn.execute(
                "INSERT INTO posted_files (message_id, title, posted_at) VALUES (?, ?, ?)",
                rusqlite::params![1, "Jawan", "2024-01-01T00:00:00Z"],
            )
            .unwrap();
        }

        let conn = get_conn(&pool).unwrap();
        let title: String = conn
            .query_row("SELECT title FROM posted_files WHERE message_id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(title, "Jawan");
    }

    #[test]
    fn test_file_pool_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reelforge.db");
        let path = path.to_str().unwrap();

        {
            let pool = init_pool(path).unwrap();
            let conn = get_conn(&pool).unwrap();
            conn.execute(
                "INSERT INTO posted_files (message_id, title, posted_at) VALUES (?, ?, ?)",
                rusqlite::params![9, "Leo", "2024-01-01T00:00:00Z"],
            )
            .unwrap();
        }

        let pool = init_pool(path).unwrap();
        let conn = get_conn(&pool).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM posted_files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
