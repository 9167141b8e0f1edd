//! SQLite storage layer shared by the group registry and the member ledger.
//!
//! Connections come from an `r2d2` pool; the schema is applied through
//! versioned migrations before a pool is handed out.

pub mod migrations;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Pooled SQLite handle used by all stores
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    // journal_mode returns a result row, so it cannot go through execute_batch
    conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

fn build_pool(
    manager: SqliteConnectionManager,
    max_size: u32,
) -> Result<SqlitePool, StorageError> {
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager.with_init(init_connection))?;
    migrations::migrate(&pool)?;
    Ok(pool)
}

/// Open (or create) the on-disk database at `path` and run pending migrations.
pub fn open_pool(path: impl AsRef<Path>) -> Result<SqlitePool, StorageError> {
    build_pool(SqliteConnectionManager::file(path.as_ref()), 8)
}

/// Create a private in-memory database for tests and harnesses.
///
/// Uses a uniquely named shared-cache URI held by a single-connection pool:
/// the pool keeps the database alive for its whole lifetime, the unique name
/// isolates concurrently running tests, and the single connection serializes
/// raw database access without hiding races above the storage layer.
pub fn memory_pool() -> Result<SqlitePool, StorageError> {
    let uri = format!("file:gatewarden-{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
    build_pool(SqliteConnectionManager::file(uri), 1)
}
