//! Database migrations for the moderation schema.
//!
//! Each migration is applied atomically and tracked in the schema_version
//! table; running them repeatedly is a no-op.

use super::{SqlitePool, StorageError};
use crate::types::Timestamp;
use rusqlite::params;
use tracing::info;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial groups and members schema",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            -- Group conversations registered for moderation
            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL UNIQUE,           -- platform-assigned identifier
                title TEXT NOT NULL,
                admission_limit INTEGER NOT NULL DEFAULT 200,
                filter_enabled INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Member ledger: one row per (participant, group) pair.
            -- The pair is the primary key, so duplicate rows cannot exist.
            CREATE TABLE IF NOT EXISTS members (
                participant_id TEXT NOT NULL,           -- platform-assigned identifier
                group_id INTEGER NOT NULL,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                is_premium INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL
                    CHECK(status IN ('joined', 'left', 'banned_by_limit', 'banned_by_filter')),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,            -- last status transition
                PRIMARY KEY (participant_id, group_id),
                FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
            );

            -- Serves the daily admission count (group + status set + window)
            CREATE INDEX IF NOT EXISTS idx_members_daily_count
                ON members(group_id, status, updated_at);
        "#,
        down_sql: Some(
            r#"
            DROP INDEX IF EXISTS idx_members_daily_count;
            DROP TABLE IF EXISTS members;
            DROP TABLE IF EXISTS groups;
            DROP TABLE IF EXISTS schema_version;
        "#,
        ),
    }]
}

/// Get current schema version from database
fn get_current_version(pool: &SqlitePool) -> Result<i32, StorageError> {
    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &SqlitePool) -> Result<(), StorageError> {
    let current_version = get_current_version(pool)?;
    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, Timestamp::now().as_millis() as i64],
        )?;

        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            "applied schema migration"
        );
    }

    Ok(())
}
