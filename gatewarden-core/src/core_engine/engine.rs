//! The membership-event state machine.
//!
//! The engine is stateless between events; all state lives in the member
//! ledger. Admission decisions for one group are serialized behind a
//! per-group mutex spanning count, decision and ledger commit, so two
//! concurrent joins can never both observe a pre-commit count and admit past
//! the limit. Events for different groups only contend on the brief lock-map
//! lookup.

use super::clock::{day_bounds, Clock};
use super::event::{EventKind, MembershipEvent};
use super::gateway::ModerationGateway;
use crate::core_filter::matches_restricted_script;
use crate::core_ledger::{LedgerError, MemberLedger, MemberStatus};
use crate::core_registry::{GroupRegistry, ManagedGroup, RegistryError};
use crate::types::GroupRecordId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Moderation engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("registry failure: {0}")]
    Registry(#[from] RegistryError),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

/// What the engine decided for one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event's group is not managed; nothing was written
    Ignored,
    /// The status committed to the ledger
    Recorded(MemberStatus),
}

/// Event-driven moderation engine
pub struct ModerationEngine {
    registry: GroupRegistry,
    ledger: MemberLedger,
    gateway: Arc<dyn ModerationGateway>,
    clock: Arc<dyn Clock>,
    group_locks: Mutex<HashMap<GroupRecordId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ModerationEngine {
    pub fn new(
        registry: GroupRegistry,
        ledger: MemberLedger,
        gateway: Arc<dyn ModerationGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            ledger,
            gateway,
            clock,
            group_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process one membership event.
    ///
    /// Events for a single group must be delivered in platform order; the
    /// per-group lock preserves that order under concurrent delivery but
    /// cannot restore an order the caller already lost.
    pub async fn handle_event(&self, event: &MembershipEvent) -> Result<Outcome, EngineError> {
        let Some(group) = self.registry.find_by_chat_id(&event.chat_id)? else {
            debug!(chat_id = %event.chat_id, "event for unmanaged group ignored");
            return Ok(Outcome::Ignored);
        };

        let lock = self.lock_for(group.id);
        let guard = lock.lock().await;

        let decided = match event.kind {
            EventKind::Leave => self.record_leave(&group, event)?,
            EventKind::Join => self.decide_join(&group, event)?,
        };

        // The ledger write is committed; enforcement happens outside the
        // critical section and cannot roll it back.
        drop(guard);

        if decided.is_banned() {
            self.dispatch_ban(&group, event).await;
        }

        Ok(Outcome::Recorded(decided))
    }

    /// Lock map entries are never evicted, so the map grows to the number of
    /// distinct managed groups this engine has seen events for, including
    /// groups later deleted from the registry. One map entry per group is a
    /// few dozen bytes; eviction would need delete notifications the registry
    /// does not emit.
    fn lock_for(&self, group_id: GroupRecordId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.group_locks.lock().expect("group lock map poisoned");
        locks.entry(group_id).or_default().clone()
    }

    fn record_leave(
        &self,
        group: &ManagedGroup,
        event: &MembershipEvent,
    ) -> Result<MemberStatus, EngineError> {
        let existing = self.ledger.find(group.id, &event.participant.id)?;
        if matches!(existing.map(|r| r.status), Some(MemberStatus::Left)) {
            // Replayed leave: the ledger already says everything this event does
            return Ok(MemberStatus::Left);
        }

        self.ledger.upsert(
            group.id,
            &event.participant.id,
            &event.participant.profile,
            MemberStatus::Left,
            self.clock.now(),
        )?;
        Ok(MemberStatus::Left)
    }

    fn decide_join(
        &self,
        group: &ManagedGroup,
        event: &MembershipEvent,
    ) -> Result<MemberStatus, EngineError> {
        let now = self.clock.now();
        let (start, end) = day_bounds(now);

        // Every join attempt processed today counts against the limit,
        // admitted or not; this event's own row is written after the count.
        let joined_today = self.ledger.count_status_in_window(
            group.id,
            &MemberStatus::COUNTED_TOWARD_LIMIT,
            start,
            end,
        )?;

        // The limit check has priority: once it fires, the filter is never consulted
        let status = if joined_today >= group.admission_limit {
            info!(
                chat_id = %group.chat_id,
                participant = %event.participant.id,
                joined_today,
                limit = group.admission_limit,
                "daily admission limit reached, banning"
            );
            MemberStatus::BannedByLimit
        } else if group.filter_enabled && matches_restricted_script(&event.participant.full_name())
        {
            info!(
                chat_id = %group.chat_id,
                participant = %event.participant.id,
                "display name matches restricted script, banning"
            );
            MemberStatus::BannedByFilter
        } else {
            debug!(
                chat_id = %group.chat_id,
                participant = %event.participant.id,
                joined_today,
                "participant admitted"
            );
            MemberStatus::Joined
        };

        self.ledger.upsert(
            group.id,
            &event.participant.id,
            &event.participant.profile,
            status,
            now,
        )?;
        Ok(status)
    }

    async fn dispatch_ban(&self, group: &ManagedGroup, event: &MembershipEvent) {
        if let Err(err) = self
            .gateway
            .ban_participant(&group.chat_id, &event.participant.id)
            .await
        {
            // The status reflects the decision, not the enforcement outcome
            warn!(
                chat_id = %group.chat_id,
                participant = %event.participant.id,
                error = %err,
                "ban command failed; ledger decision stands"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_engine::event::Participant;
    use crate::core_engine::gateway::GatewayError;
    use crate::core_ledger::MemberProfile;
    use crate::storage::memory_pool;
    use crate::types::{ChatId, ParticipantId, Timestamp};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Records every ban request; optionally fails them all
    #[derive(Default)]
    struct RecordingGateway {
        bans: Mutex<Vec<(ChatId, ParticipantId)>>,
        fail: AtomicBool,
    }

    impl RecordingGateway {
        fn failing() -> Self {
            let gateway = Self::default();
            gateway.fail.store(true, Ordering::SeqCst);
            gateway
        }

        fn banned(&self) -> Vec<(ChatId, ParticipantId)> {
            self.bans.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModerationGateway for RecordingGateway {
        async fn ban_participant(
            &self,
            chat_id: &ChatId,
            participant_id: &ParticipantId,
        ) -> Result<(), GatewayError> {
            self.bans
                .lock()
                .unwrap()
                .push((chat_id.clone(), participant_id.clone()));
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Unreachable("simulated outage".to_string()));
            }
            Ok(())
        }
    }

    /// Clock that only moves when told to
    struct ManualClock(AtomicU64);

    impl ManualClock {
        const BASE_MILLIS: u64 = 1_755_000_000_000;

        fn new() -> Self {
            Self(AtomicU64::new(Self::BASE_MILLIS))
        }

        fn advance_hours(&self, hours: u64) {
            self.0.fetch_add(hours * 3600 * 1000, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0.load(Ordering::SeqCst))
        }
    }

    const CHAT: &str = "-1001234567890";

    struct Harness {
        engine: ModerationEngine,
        ledger: MemberLedger,
        gateway: Arc<RecordingGateway>,
        clock: Arc<ManualClock>,
        group: ManagedGroup,
    }

    fn harness(limit: u32, filter_enabled: bool) -> Harness {
        harness_with_gateway(limit, filter_enabled, Arc::new(RecordingGateway::default()))
    }

    fn harness_with_gateway(
        limit: u32,
        filter_enabled: bool,
        gateway: Arc<RecordingGateway>,
    ) -> Harness {
        let pool = memory_pool().expect("pool");
        let registry = GroupRegistry::new(pool.clone());
        let ledger = MemberLedger::new(pool);
        let group = registry
            .create(ChatId::new(CHAT), "moderated group".to_string(), limit, filter_enabled)
            .unwrap();
        let clock = Arc::new(ManualClock::new());
        let engine = ModerationEngine::new(
            registry,
            ledger.clone(),
            gateway.clone(),
            clock.clone(),
        );
        Harness { engine, ledger, gateway, clock, group }
    }

    fn participant(id: &str, first: &str, last: &str) -> Participant {
        Participant {
            id: ParticipantId::new(id),
            profile: MemberProfile {
                username: Some(format!("user_{id}")),
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
                is_premium: false,
            },
        }
    }

    fn join(id: &str, first: &str, last: &str) -> MembershipEvent {
        MembershipEvent::join(ChatId::new(CHAT), participant(id, first, last))
    }

    fn leave(id: &str) -> MembershipEvent {
        MembershipEvent::leave(ChatId::new(CHAT), participant(id, "Ann", "Doe"))
    }

    fn status_of(h: &Harness, id: &str) -> MemberStatus {
        h.ledger
            .find(h.group.id, &ParticipantId::new(id))
            .unwrap()
            .expect("ledger entry")
            .status
    }

    #[tokio::test]
    async fn unmanaged_group_event_is_ignored() {
        let h = harness(200, true);
        let event = MembershipEvent::join(ChatId::new("-999"), participant("1", "John", "Smith"));

        let outcome = h.engine.handle_event(&event).await.unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(h.gateway.banned().is_empty());
        assert_eq!(h.ledger.list_group(h.group.id).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn join_under_limit_is_admitted() {
        let h = harness(200, true);

        let outcome = h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::Joined));
        assert_eq!(status_of(&h, "1"), MemberStatus::Joined);
        assert!(h.gateway.banned().is_empty());
    }

    #[tokio::test]
    async fn zero_limit_bans_every_join() {
        // With limit 0 even the first join of the day is rejected, and the
        // filter is never consulted (a plain name gets the limit status too)
        let h = harness(0, true);

        let outcome = h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::BannedByLimit));
        assert_eq!(status_of(&h, "1"), MemberStatus::BannedByLimit);
        assert_eq!(h.gateway.banned().len(), 1);
    }

    #[tokio::test]
    async fn filter_bans_matching_name_under_limit() {
        let h = harness(200, true);

        let outcome = h.engine.handle_event(&join("1", "王", "伟")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::BannedByFilter));
        assert_eq!(
            h.gateway.banned(),
            vec![(ChatId::new(CHAT), ParticipantId::new("1"))]
        );

        // A plain name right after is admitted
        let outcome = h.engine.handle_event(&join("2", "John", "Smith")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::Joined));
        assert_eq!(h.gateway.banned().len(), 1);
    }

    #[tokio::test]
    async fn filter_disabled_admits_matching_name() {
        let h = harness(200, false);

        let outcome = h.engine.handle_event(&join("1", "عمر", "")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::Joined));
        assert!(h.gateway.banned().is_empty());
    }

    #[tokio::test]
    async fn limit_check_precedes_filter() {
        // Fill the day's quota, then send a filter-matching name: the limit
        // status must win, the filter is never consulted
        let h = harness(1, true);

        h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();

        let outcome = h.engine.handle_event(&join("2", "عمر", "")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::BannedByLimit));
        assert_eq!(status_of(&h, "2"), MemberStatus::BannedByLimit);
    }

    #[tokio::test]
    async fn rejected_attempts_consume_quota() {
        // A filter ban eats a slot: with limit 2, one admit plus one filter
        // ban leaves no room for a third, plain-named participant
        let h = harness(2, true);

        h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        h.engine.handle_event(&join("2", "王", "伟")).await.unwrap();

        let outcome = h.engine.handle_event(&join("3", "Jane", "Doe")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::BannedByLimit));
    }

    #[tokio::test]
    async fn leave_is_recorded_and_replay_is_idempotent() {
        let h = harness(200, true);

        h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        h.engine.handle_event(&leave("1")).await.unwrap();
        assert_eq!(status_of(&h, "1"), MemberStatus::Left);

        let before = h
            .ledger
            .find(h.group.id, &ParticipantId::new("1"))
            .unwrap()
            .unwrap();

        // Replayed leave with the clock advanced: ledger stays untouched
        h.clock.advance_hours(1);
        let outcome = h.engine.handle_event(&leave("1")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::Left));

        let after = h
            .ledger
            .find(h.group.id, &ParticipantId::new("1"))
            .unwrap()
            .unwrap();
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn leave_for_unknown_participant_creates_left_entry() {
        let h = harness(200, true);

        let outcome = h.engine.handle_event(&leave("7")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::Left));
        assert_eq!(status_of(&h, "7"), MemberStatus::Left);
    }

    #[tokio::test]
    async fn leaving_frees_admission_capacity() {
        let h = harness(1, true);

        h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        h.engine.handle_event(&leave("1")).await.unwrap();

        // The leaver's single row now reads Left, which the daily count
        // excludes, so the slot admits another participant the same day
        let outcome = h.engine.handle_event(&join("2", "Jane", "Doe")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::Joined));
    }

    #[tokio::test]
    async fn capacity_resets_at_the_day_boundary() {
        let h = harness(1, true);

        let first = h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        assert_eq!(first, Outcome::Recorded(MemberStatus::Joined));

        let same_day = h.engine.handle_event(&join("2", "Jane", "Doe")).await.unwrap();
        assert_eq!(same_day, Outcome::Recorded(MemberStatus::BannedByLimit));

        // 48 hours later is unambiguously a different calendar day in any zone
        h.clock.advance_hours(48);
        let next_day = h.engine.handle_event(&join("3", "Jim", "Beam")).await.unwrap();
        assert_eq!(next_day, Outcome::Recorded(MemberStatus::Joined));
    }

    #[tokio::test]
    async fn ban_failure_does_not_revert_the_decision() {
        let h = harness_with_gateway(0, true, Arc::new(RecordingGateway::failing()));

        let outcome = h.engine.handle_event(&join("1", "John", "Smith")).await.unwrap();
        assert_eq!(outcome, Outcome::Recorded(MemberStatus::BannedByLimit));
        // The gateway was asked and failed; the ledger still says banned
        assert_eq!(h.gateway.banned().len(), 1);
        assert_eq!(status_of(&h, "1"), MemberStatus::BannedByLimit);
    }

    #[tokio::test]
    async fn scenario_first_of_day_filter_ban_then_admit() {
        let h = harness(200, true);

        let first = h.engine.handle_event(&join("1", "王", "伟")).await.unwrap();
        assert_eq!(first, Outcome::Recorded(MemberStatus::BannedByFilter));

        let second = h.engine.handle_event(&join("2", "John", "Smith")).await.unwrap();
        assert_eq!(second, Outcome::Recorded(MemberStatus::Joined));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_never_exceed_the_limit() {
        const LIMIT: u32 = 20;
        const ATTEMPTS: u32 = LIMIT + 5;

        let h = harness(LIMIT, false);
        let engine = Arc::new(h.engine);

        let mut handles = Vec::new();
        for i in 0..ATTEMPTS {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                let event = join(&format!("p{i}"), "User", &format!("{i}"));
                engine.handle_event(&event).await.unwrap()
            }));
        }

        let mut admitted = 0;
        let mut banned = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Outcome::Recorded(MemberStatus::Joined) => admitted += 1,
                Outcome::Recorded(MemberStatus::BannedByLimit) => banned += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(admitted, LIMIT);
        assert_eq!(banned, ATTEMPTS - LIMIT);

        // The ledger agrees with the returned outcomes
        let records = h.ledger.list_group(h.group.id).unwrap();
        let joined = records.iter().filter(|r| r.status == MemberStatus::Joined).count();
        let limited = records
            .iter()
            .filter(|r| r.status == MemberStatus::BannedByLimit)
            .count();
        assert_eq!(joined, LIMIT as usize);
        assert_eq!(limited, (ATTEMPTS - LIMIT) as usize);
        assert_eq!(h.gateway.banned().len(), (ATTEMPTS - LIMIT) as usize);
    }
}
