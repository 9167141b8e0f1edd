//! Member records and lifecycle statuses

use crate::types::{GroupRecordId, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a participant within one group.
///
/// Not a strict DAG: re-entry is allowed, and any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    /// Admitted by the engine
    Joined,
    /// Left the group
    Left,
    /// Rejected because the daily admission limit was reached
    BannedByLimit,
    /// Rejected because the display name matched the restricted-script filter
    BannedByFilter,
}

impl MemberStatus {
    /// Statuses that consume the group's daily admission quota: every join
    /// attempt processed today counts, admitted or not.
    pub const COUNTED_TOWARD_LIMIT: [MemberStatus; 3] = [
        MemberStatus::Joined,
        MemberStatus::BannedByLimit,
        MemberStatus::BannedByFilter,
    ];

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Joined => "joined",
            MemberStatus::Left => "left",
            MemberStatus::BannedByLimit => "banned_by_limit",
            MemberStatus::BannedByFilter => "banned_by_filter",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "joined" => Some(MemberStatus::Joined),
            "left" => Some(MemberStatus::Left),
            "banned_by_limit" => Some(MemberStatus::BannedByLimit),
            "banned_by_filter" => Some(MemberStatus::BannedByFilter),
            _ => None,
        }
    }

    pub fn is_banned(&self) -> bool {
        matches!(self, MemberStatus::BannedByLimit | MemberStatus::BannedByFilter)
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Platform-supplied profile fields carried on a ledger entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_premium: bool,
}

impl MemberProfile {
    /// First + last name concatenation, the text the admission filter runs on
    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Ledger entry for one (participant, group) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub participant_id: ParticipantId,
    pub group_id: GroupRecordId,
    pub profile: MemberProfile,
    pub status: MemberStatus,
    /// First observed event for this pair
    pub created_at: Timestamp,
    /// Last status transition
    pub updated_at: Timestamp,
}
