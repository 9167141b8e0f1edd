//! Inbound membership-change events

use crate::core_ledger::MemberProfile;
use crate::types::{ChatId, ParticipantId};
use serde::{Deserialize, Serialize};

/// What a membership event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Join,
    Leave,
}

/// The participant a membership event concerns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(flatten)]
    pub profile: MemberProfile,
}

impl Participant {
    /// The display name the admission filter runs on
    pub fn full_name(&self) -> String {
        self.profile.full_name()
    }
}

/// A membership change observed in a group conversation, as delivered by the
/// platform-transport collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub chat_id: ChatId,
    pub participant: Participant,
    pub kind: EventKind,
}

impl MembershipEvent {
    pub fn join(chat_id: ChatId, participant: Participant) -> Self {
        Self { chat_id, participant, kind: EventKind::Join }
    }

    pub fn leave(chat_id: ChatId, participant: Participant) -> Self {
        Self { chat_id, participant, kind: EventKind::Leave }
    }
}
