//! Moderation core for managed group conversations.
//!
//! gatewarden admits or rejects newly joined participants according to a
//! per-group daily admission limit and an optional restricted-script
//! display-name filter, and records each participant's lifecycle status in a
//! per-group member ledger.
//!
//! ## Architecture
//!
//! - [`core_registry`]: managed-group records (admission limit, filter flag)
//! - [`core_ledger`]: one status row per (participant, group) pair, plus the
//!   windowed daily counter
//! - [`core_filter`]: the restricted-script display-name heuristic
//! - [`core_engine`]: the event-driven moderation engine and its gateway seam
//! - [`storage`]: SQLite layer shared by registry and ledger
//!
//! The engine is stateless between events; all state lives in the ledger.

pub mod config;
pub mod core_engine;
pub mod core_filter;
pub mod core_ledger;
pub mod core_registry;
pub mod logging;
pub mod storage;
pub mod types;

pub use config::Config;
pub use core_engine::{
    Clock, EngineError, EventKind, MembershipEvent, ModerationEngine, ModerationGateway, Outcome,
    Participant, SystemClock,
};
pub use core_filter::matches_restricted_script;
pub use core_ledger::{MemberLedger, MemberProfile, MemberRecord, MemberStatus};
pub use core_registry::{GroupRegistry, ManagedGroup};
pub use logging::{init_logging, LogLevel};
pub use types::{ChatId, GroupRecordId, ParticipantId, Timestamp};
