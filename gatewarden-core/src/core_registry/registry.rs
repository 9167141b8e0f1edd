//! Registry operations over the groups table

use super::group::ManagedGroup;
use crate::storage::{SqlitePool, StorageError};
use crate::types::{ChatId, GroupRecordId, Timestamp};
use rusqlite::{params, OptionalExtension, Row};
use thiserror::Error;

/// Group registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("group not found")]
    GroupNotFound,

    #[error("a group is already registered for chat {0}")]
    DuplicateGroup(ChatId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<r2d2::Error> for RegistryError {
    fn from(err: r2d2::Error) -> Self {
        RegistryError::Storage(StorageError::Pool(err))
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::Storage(StorageError::Database(err))
    }
}

/// Registry of managed groups
#[derive(Clone)]
pub struct GroupRegistry {
    pool: SqlitePool,
}

impl GroupRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a group for moderation. Rejects a second registration for the
    /// same external chat identifier.
    pub fn create(
        &self,
        chat_id: ChatId,
        title: String,
        admission_limit: u32,
        filter_enabled: bool,
    ) -> Result<ManagedGroup, RegistryError> {
        let conn = self.pool.get()?;
        let now = Timestamp::now();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO groups (chat_id, title, admission_limit, filter_enabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                chat_id.as_str(),
                &title,
                admission_limit as i64,
                filter_enabled as i64,
                now.as_millis() as i64,
                now.as_millis() as i64,
            ],
        )?;

        if inserted == 0 {
            return Err(RegistryError::DuplicateGroup(chat_id));
        }

        Ok(ManagedGroup {
            id: GroupRecordId(conn.last_insert_rowid()),
            chat_id,
            title,
            admission_limit,
            filter_enabled,
            created_at: now,
            updated_at: now,
        })
    }

    /// Find a group by its external chat identifier. Absence is normal for
    /// unmanaged chats, not an error.
    pub fn find_by_chat_id(&self, chat_id: &ChatId) -> Result<Option<ManagedGroup>, RegistryError> {
        let conn = self.pool.get()?;
        let group = conn
            .query_row(
                "SELECT id, chat_id, title, admission_limit, filter_enabled, created_at, updated_at
                 FROM groups WHERE chat_id = ?",
                params![chat_id.as_str()],
                row_to_group,
            )
            .optional()?;
        Ok(group)
    }

    /// Find a group by its internal surrogate id
    pub fn find_by_id(&self, id: GroupRecordId) -> Result<Option<ManagedGroup>, RegistryError> {
        let conn = self.pool.get()?;
        let group = conn
            .query_row(
                "SELECT id, chat_id, title, admission_limit, filter_enabled, created_at, updated_at
                 FROM groups WHERE id = ?",
                params![id.0],
                row_to_group,
            )
            .optional()?;
        Ok(group)
    }

    /// Update the display title
    pub fn set_title(&self, id: GroupRecordId, title: &str) -> Result<(), RegistryError> {
        let conn = self.pool.get()?;
        let now = Timestamp::now().as_millis() as i64;
        let updated = conn.execute(
            "UPDATE groups SET title = ?, updated_at = ? WHERE id = ?",
            params![title, now, id.0],
        )?;
        if updated == 0 {
            return Err(RegistryError::GroupNotFound);
        }
        Ok(())
    }

    /// Update the admission limit. The value is trusted: the administrative
    /// layer clamps to the permitted range before calling.
    pub fn set_admission_limit(&self, id: GroupRecordId, limit: u32) -> Result<(), RegistryError> {
        let conn = self.pool.get()?;
        let now = Timestamp::now().as_millis() as i64;
        let updated = conn.execute(
            "UPDATE groups SET admission_limit = ?, updated_at = ? WHERE id = ?",
            params![limit as i64, now, id.0],
        )?;
        if updated == 0 {
            return Err(RegistryError::GroupNotFound);
        }
        Ok(())
    }

    /// Toggle the restricted-script filter
    pub fn set_filter_enabled(&self, id: GroupRecordId, enabled: bool) -> Result<(), RegistryError> {
        let conn = self.pool.get()?;
        let now = Timestamp::now().as_millis() as i64;
        let updated = conn.execute(
            "UPDATE groups SET filter_enabled = ?, updated_at = ? WHERE id = ?",
            params![enabled as i64, now, id.0],
        )?;
        if updated == 0 {
            return Err(RegistryError::GroupNotFound);
        }
        Ok(())
    }

    /// Remove a group. Its ledger entries go with it (cascade).
    pub fn delete(&self, id: GroupRecordId) -> Result<(), RegistryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM groups WHERE id = ?", params![id.0])?;
        if deleted == 0 {
            return Err(RegistryError::GroupNotFound);
        }
        Ok(())
    }

    /// Page through managed groups, newest first
    pub fn list(&self, offset: u32, limit: u32) -> Result<Vec<ManagedGroup>, RegistryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, title, admission_limit, filter_enabled, created_at, updated_at
             FROM groups ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )?;
        let groups = stmt
            .query_map(params![limit as i64, offset as i64], row_to_group)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    /// Total number of managed groups
    pub fn count(&self) -> Result<u64, RegistryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn row_to_group(row: &Row<'_>) -> rusqlite::Result<ManagedGroup> {
    Ok(ManagedGroup {
        id: GroupRecordId(row.get(0)?),
        chat_id: ChatId::new(row.get::<_, String>(1)?),
        title: row.get(2)?,
        admission_limit: row.get::<_, i64>(3)?.max(0) as u32,
        filter_enabled: row.get::<_, i64>(4)? != 0,
        created_at: Timestamp::from_millis(row.get::<_, i64>(5)?.max(0) as u64),
        updated_at: Timestamp::from_millis(row.get::<_, i64>(6)?.max(0) as u64),
    })
}
