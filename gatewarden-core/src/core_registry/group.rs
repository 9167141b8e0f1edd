//! Managed-group records

use crate::types::{ChatId, GroupRecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// Admission limit applied when an operator does not specify one
pub const DEFAULT_ADMISSION_LIMIT: u32 = 200;

/// Upper bound of the permitted admission-limit range
pub const MAX_ADMISSION_LIMIT: u32 = 1000;

/// Clamp an operator-supplied admission limit into `[0, MAX_ADMISSION_LIMIT]`.
///
/// The administrative layer applies this before a value reaches storage;
/// the registry and the engine trust stored values as already valid.
pub fn clamp_admission_limit(value: u32) -> u32 {
    value.min(MAX_ADMISSION_LIMIT)
}

/// A group conversation registered for moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedGroup {
    /// Internal surrogate id
    pub id: GroupRecordId,

    /// Platform-assigned identifier, unique across all groups
    pub chat_id: ChatId,

    /// Display title
    pub title: String,

    /// Maximum number of participants counted as joined-today before further
    /// joins are auto-rejected
    pub admission_limit: u32,

    /// Per-group switch for the restricted-script display-name check
    pub filter_enabled: bool,

    /// When the group was registered
    pub created_at: Timestamp,

    /// Last administrative change
    pub updated_at: Timestamp,
}
