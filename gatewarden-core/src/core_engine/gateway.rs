//! Outbound enforcement surface

use crate::types::{ChatId, ParticipantId};
use async_trait::async_trait;
use thiserror::Error;

/// Moderation gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("platform rejected the ban request: {0}")]
    Rejected(String),

    #[error("platform unreachable: {0}")]
    Unreachable(String),
}

/// Command channel to the platform-transport collaborator.
///
/// The engine is the only component permitted to call this. Ban dispatch is
/// best-effort: a failure is surfaced to the log but never reverts the
/// ledger status the engine already recorded.
#[async_trait]
pub trait ModerationGateway: Send + Sync {
    /// Ban a participant from a group conversation
    async fn ban_participant(
        &self,
        chat_id: &ChatId,
        participant_id: &ParticipantId,
    ) -> Result<(), GatewayError>;
}
