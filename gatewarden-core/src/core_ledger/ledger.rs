//! Ledger operations over the members table

use super::member::{MemberProfile, MemberRecord, MemberStatus};
use crate::storage::{SqlitePool, StorageError};
use crate::types::{GroupRecordId, ParticipantId, Timestamp};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use thiserror::Error;

/// Member ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<r2d2::Error> for LedgerError {
    fn from(err: r2d2::Error) -> Self {
        LedgerError::Storage(StorageError::Pool(err))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Storage(StorageError::Database(err))
    }
}

/// Ledger of per-participant, per-group moderation records
#[derive(Clone)]
pub struct MemberLedger {
    pool: SqlitePool,
}

impl MemberLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up the entry for one (participant, group) pair
    pub fn find(
        &self,
        group_id: GroupRecordId,
        participant_id: &ParticipantId,
    ) -> Result<Option<MemberRecord>, LedgerError> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                "SELECT participant_id, group_id, username, first_name, last_name, is_premium,
                        status, created_at, updated_at
                 FROM members WHERE group_id = ? AND participant_id = ?",
                params![group_id.0, participant_id.as_str()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Write the entry for one (participant, group) pair: created on the
    /// first observed event, mutated in place afterwards. The pair's primary
    /// key makes this a single atomic statement.
    pub fn upsert(
        &self,
        group_id: GroupRecordId,
        participant_id: &ParticipantId,
        profile: &MemberProfile,
        status: MemberStatus,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO members (participant_id, group_id, username, first_name, last_name,
                                  is_premium, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(participant_id, group_id) DO UPDATE SET
                 username = excluded.username,
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 is_premium = excluded.is_premium,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                participant_id.as_str(),
                group_id.0,
                profile.username,
                profile.first_name,
                profile.last_name,
                profile.is_premium as i64,
                status.as_str(),
                now.as_millis() as i64,
                now.as_millis() as i64,
            ],
        )?;
        Ok(())
    }

    /// Count entries of a group whose status is in `statuses` and whose last
    /// transition falls within `[start, end)`.
    ///
    /// This is the Daily Counter: a derived view recomputed on every
    /// admission decision, never cached or incrementally maintained.
    pub fn count_status_in_window(
        &self,
        group_id: GroupRecordId,
        statuses: &[MemberStatus],
        start: Timestamp,
        end: Timestamp,
    ) -> Result<u32, LedgerError> {
        if statuses.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM members
             WHERE group_id = ? AND updated_at >= ? AND updated_at < ?
               AND status IN ({placeholders})"
        );

        let mut values: Vec<Value> = vec![
            Value::from(group_id.0),
            Value::from(start.as_millis() as i64),
            Value::from(end.as_millis() as i64),
        ];
        values.extend(statuses.iter().map(|s| Value::from(s.as_str().to_string())));

        let conn = self.pool.get()?;
        let count: i64 = conn
            .prepare(&sql)?
            .query_row(params_from_iter(values), |row| row.get(0))?;
        Ok(count.max(0) as u32)
    }

    /// All entries of a group, most recently touched first
    pub fn list_group(&self, group_id: GroupRecordId) -> Result<Vec<MemberRecord>, LedgerError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT participant_id, group_id, username, first_name, last_name, is_premium,
                    status, created_at, updated_at
             FROM members WHERE group_id = ? ORDER BY updated_at DESC",
        )?;
        let records = stmt
            .query_map(params![group_id.0], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MemberRecord> {
    let status_str: String = row.get(6)?;
    let status = MemberStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown member status: {status_str}").into(),
        )
    })?;

    Ok(MemberRecord {
        participant_id: ParticipantId::new(row.get::<_, String>(0)?),
        group_id: GroupRecordId(row.get(1)?),
        profile: MemberProfile {
            username: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            is_premium: row.get::<_, i64>(5)? != 0,
        },
        status,
        created_at: Timestamp::from_millis(row.get::<_, i64>(7)?.max(0) as u64),
        updated_at: Timestamp::from_millis(row.get::<_, i64>(8)?.max(0) as u64),
    })
}
