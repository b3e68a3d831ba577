//! Reservation workflow
//!
//! ```text
//!           propose            decide(ACCEPT)
//!   (new) ─────────► WAIT ─────────────────► ACCEPT
//!                      │                      ▲  │
//!                      │ decide(DECLINE)      │  │
//!                      ▼                      │  ▼
//!                   DECLINE ◄────────────────────
//! ```
//!
//! Leaving WAIT needs a staff decision; ACCEPT and DECLINE may be swapped any
//! number of times. The requester may cancel (delete) in any state.

use std::sync::Arc;

use chrono::Datelike;
use shared::models::{Reservation, ReservationCreate, ReservationStatus};

use super::conflict::{OperatingHours, Slot, find_conflict};
use super::error::{ScheduleError, ScheduleResult};
use super::store::{NewReservation, ReservationStore};
use crate::auth::CurrentUser;
use crate::security_log;
use crate::utils::ErrorCode;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, validate_optional_text, validate_required_text,
};

/// Who is calling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub is_staff: bool,
}

impl From<&CurrentUser> for Actor {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            name: user.username.clone(),
            is_staff: user.is_staff(),
        }
    }
}

/// Staff verdict on a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

impl From<Decision> for ReservationStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => ReservationStatus::Accept,
            Decision::Decline => ReservationStatus::Decline,
        }
    }
}

#[derive(Clone)]
pub struct ReservationWorkflow {
    store: Arc<dyn ReservationStore>,
    hours: OperatingHours,
    default_room_id: i64,
}

impl ReservationWorkflow {
    pub fn new(store: Arc<dyn ReservationStore>, hours: OperatingHours, default_room_id: i64) -> Self {
        Self {
            store,
            hours,
            default_room_id,
        }
    }

    pub fn default_room_id(&self) -> i64 {
        self.default_room_id
    }

    /// Validate, check for conflicts, then store as WAIT
    ///
    /// Every validation runs before the store is touched. A reservation lies
    /// within one local day. The conflict check here is a fast path; the store
    /// re-checks at write time.
    pub async fn propose(
        &self,
        candidate: ReservationCreate,
        requester: &Actor,
    ) -> ScheduleResult<Reservation> {
        validate_required_text(&candidate.title, "title", MAX_NAME_LEN)?;
        validate_optional_text(&candidate.description, "description", MAX_NOTE_LEN)?;

        if candidate.start_time >= candidate.end_time {
            return Err(ScheduleError::validation(
                ErrorCode::InvalidTimeRange,
                "Start time must be before end time",
            ));
        }
        if !self.hours.same_day(candidate.start_time, candidate.end_time) {
            return Err(ScheduleError::validation(
                ErrorCode::InvalidTimeRange,
                "Reservation must start and end on the same day",
            ));
        }
        if !self.hours.contains(candidate.start_time, candidate.end_time) {
            return Err(ScheduleError::validation(
                ErrorCode::OutsideOperatingHours,
                format!(
                    "Reservations must be between {} and {}",
                    self.hours.open().format("%H:%M"),
                    self.hours.close().format("%H:%M")
                ),
            ));
        }

        let slot = Slot {
            room_id: candidate.room_id.unwrap_or(self.default_room_id),
            start: candidate.start_time,
            end: candidate.end_time,
        };

        // Single local day, so a single month
        let day = slot.start.with_timezone(&self.hours.timezone()).date_naive();
        let existing = self
            .store
            .list_by_month(slot.room_id, day.year(), day.month())
            .await?;
        if let Some(blocking) = find_conflict(&slot, &existing) {
            tracing::info!(
                room_id = slot.room_id,
                conflicting_id = blocking.id,
                requester_id = requester.id,
                "Reservation rejected: slot already reserved"
            );
            return Err(ScheduleError::Conflict {
                conflicting_id: blocking.id,
            });
        }

        let description = candidate
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        self.store
            .create(NewReservation {
                room_id: slot.room_id,
                title: candidate.title.trim().to_string(),
                description,
                start_time: slot.start,
                end_time: slot.end,
                requester_id: requester.id,
                requester_name: requester.name.clone(),
            })
            .await
    }

    /// Staff only; no conflict re-check on ACCEPT
    pub async fn decide(
        &self,
        id: i64,
        decision: Decision,
        actor: &Actor,
    ) -> ScheduleResult<Reservation> {
        if !actor.is_staff {
            security_log!(
                "WARN",
                "decision_forbidden",
                actor_id = actor.id,
                reservation_id = id
            );
            return Err(ScheduleError::staff_required());
        }

        let updated = self.store.update_status(id, decision.into()).await?;
        tracing::info!(
            reservation_id = id,
            status = %updated.status,
            actor_id = actor.id,
            "Reservation decided"
        );
        Ok(updated)
    }

    /// Delete the actor's own reservation, in any state
    pub async fn cancel(&self, id: i64, actor: &Actor) -> ScheduleResult<()> {
        self.store.delete(id, actor.id).await?;
        tracing::info!(reservation_id = id, actor_id = actor.id, "Reservation cancelled");
        Ok(())
    }

    /// Calendar view: WAIT and ACCEPT reservations of the month
    pub async fn for_month(
        &self,
        room_id: Option<i64>,
        year: i32,
        month: u32,
    ) -> ScheduleResult<Vec<Reservation>> {
        let room_id = room_id.unwrap_or(self.default_room_id);
        let mut reservations = self.store.list_by_month(room_id, year, month).await?;
        reservations.retain(|r| r.status != ReservationStatus::Decline);
        Ok(reservations)
    }

    /// The requester's reservations of the month, every status and room
    pub async fn mine(&self, requester_id: i64, year: i32, month: u32) -> ScheduleResult<Vec<Reservation>> {
        self.store.list_by_requester(requester_id, year, month).await
    }

    /// Staff only
    pub async fn waiting(&self, room_id: Option<i64>, actor: &Actor) -> ScheduleResult<Vec<Reservation>> {
        if !actor.is_staff {
            security_log!("WARN", "waiting_list_forbidden", actor_id = actor.id);
            return Err(ScheduleError::staff_required());
        }
        self.store
            .list_waiting(room_id.unwrap_or(self.default_room_id))
            .await
    }

    pub async fn get(&self, id: i64) -> ScheduleResult<Reservation> {
        self.store.get(id).await?.ok_or(ScheduleError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::scheduler::store::SqliteReservationStore;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveTime, TimeZone, Utc};
    use chrono_tz::Asia::Seoul;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn local(y: i32, mo: u32, d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Seoul
            .with_ymd_and_hms(y, mo, d, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        local(2024, 3, 4, h, m)
    }

    fn hours(open: (u32, u32), close: (u32, u32)) -> OperatingHours {
        OperatingHours::new(
            NaiveTime::from_hms_opt(open.0, open.1, 0).unwrap(),
            NaiveTime::from_hms_opt(close.0, close.1, 0).unwrap(),
            Seoul,
        )
    }

    fn member(id: i64) -> Actor {
        Actor {
            id,
            name: format!("member{id}"),
            is_staff: false,
        }
    }

    fn staff() -> Actor {
        Actor {
            id: 100,
            name: "manager".into(),
            is_staff: true,
        }
    }

    fn proposal(start: DateTime<Utc>, end: DateTime<Utc>) -> ReservationCreate {
        ReservationCreate {
            title: "Band practice".into(),
            description: None,
            start_time: start,
            end_time: end,
            room_id: None,
        }
    }

    async fn workflow_with(hours: OperatingHours) -> ReservationWorkflow {
        let db = DbService::in_memory().await.unwrap();
        let store = SqliteReservationStore::new(db.pool, Seoul);
        ReservationWorkflow::new(Arc::new(store), hours, 1)
    }

    async fn workflow() -> ReservationWorkflow {
        workflow_with(hours((9, 0), (23, 0))).await
    }

    fn assert_no_overlap(reservations: &[Reservation]) {
        let live: Vec<&Reservation> = reservations
            .iter()
            .filter(|r| r.status.blocks_slot())
            .collect();
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                assert!(
                    a.room_id != b.room_id || !a.overlaps(b.start_time, b.end_time),
                    "{} overlaps {}",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[tokio::test]
    async fn test_back_to_back_proposals_succeed() {
        let wf = workflow().await;
        wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();
        wf.propose(proposal(at(11, 0), at(12, 0)), &member(2)).await.unwrap();
        assert_eq!(wf.for_month(None, 2024, 3).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overlap_rejected_without_write() {
        let wf = workflow().await;
        let first = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();

        let err = wf
            .propose(proposal(at(10, 30), at(10, 45)), &member(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict { conflicting_id } if conflicting_id == first.id));
        assert_eq!(err.to_string(), "Slot already reserved");
        assert_eq!(wf.for_month(None, 2024, 3).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decline_frees_slot() {
        let wf = workflow().await;
        let first = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();
        wf.decide(first.id, Decision::Decline, &staff()).await.unwrap();

        let again = wf.propose(proposal(at(10, 0), at(11, 0)), &member(2)).await.unwrap();
        assert_eq!(again.status, ReservationStatus::Wait);

        // Declined one no longer shows on the calendar
        let month = wf.for_month(None, 2024, 3).await.unwrap();
        assert_eq!(month.len(), 1);
        assert_eq!(month[0].id, again.id);
    }

    #[tokio::test]
    async fn test_accept_and_decline_toggle() {
        let wf = workflow().await;
        let r = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();

        let accepted = wf.decide(r.id, Decision::Accept, &staff()).await.unwrap();
        assert_eq!(accepted.status, ReservationStatus::Accept);
        let declined = wf.decide(r.id, Decision::Decline, &staff()).await.unwrap();
        assert_eq!(declined.status, ReservationStatus::Decline);
        let accepted = wf.decide(r.id, Decision::Accept, &staff()).await.unwrap();
        assert_eq!(accepted.status, ReservationStatus::Accept);
    }

    #[tokio::test]
    async fn test_non_staff_cannot_decide_or_list_waiting() {
        let wf = workflow().await;
        let r = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();

        let err = wf.decide(r.id, Decision::Accept, &member(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Authorization { code: ErrorCode::StaffRequired, .. }
        ));
        assert_eq!(wf.get(r.id).await.unwrap().status, ReservationStatus::Wait);

        assert!(matches!(
            wf.waiting(None, &member(1)).await,
            Err(ScheduleError::Authorization { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_only_by_owner() {
        let wf = workflow().await;
        let r = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();

        let err = wf.cancel(r.id, &member(2)).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Authorization { code: ErrorCode::ReservationNotOwned, .. }
        ));
        // Staff are not owners either
        assert!(wf.cancel(r.id, &staff()).await.is_err());

        wf.decide(r.id, Decision::Accept, &staff()).await.unwrap();
        wf.cancel(r.id, &member(1)).await.unwrap();
        assert!(matches!(wf.get(r.id).await, Err(ScheduleError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_decide_unknown_id() {
        let wf = workflow().await;
        assert!(matches!(
            wf.decide(777, Decision::Accept, &staff()).await,
            Err(ScheduleError::NotFound(777))
        ));
    }

    #[tokio::test]
    async fn test_last_evening_of_month_listed_in_that_month() {
        let wf = workflow_with(hours((0, 0), (23, 59))).await;
        let r = wf
            .propose(
                proposal(local(2024, 1, 31, 22, 0), local(2024, 1, 31, 23, 59)),
                &member(1),
            )
            .await
            .unwrap();

        let jan = wf.for_month(None, 2024, 1).await.unwrap();
        let feb = wf.for_month(None, 2024, 2).await.unwrap();
        assert_eq!(jan.iter().map(|r| r.id).collect::<Vec<_>>(), vec![r.id]);
        assert!(feb.is_empty());

        let err = wf
            .propose(
                proposal(local(2024, 1, 31, 23, 0), local(2024, 1, 31, 23, 30)),
                &member(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_for_month_is_stable() {
        let wf = workflow().await;
        wf.propose(proposal(at(15, 0), at(16, 0)), &member(1)).await.unwrap();
        wf.propose(proposal(at(10, 0), at(11, 0)), &member(2)).await.unwrap();
        wf.propose(proposal(local(2024, 3, 1, 10, 0), local(2024, 3, 1, 11, 0)), &member(3))
            .await
            .unwrap();

        let first = wf.for_month(None, 2024, 3).await.unwrap();
        let second = wf.for_month(None, 2024, 3).await.unwrap();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].start_time <= w[1].start_time));
    }

    #[tokio::test]
    async fn test_mine_includes_declined_and_other_rooms() {
        let wf = workflow().await;
        let a = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();
        let mut other_room = proposal(at(10, 0), at(11, 0));
        other_room.room_id = Some(2);
        wf.propose(other_room, &member(1)).await.unwrap();
        wf.propose(proposal(at(12, 0), at(13, 0)), &member(2)).await.unwrap();
        wf.decide(a.id, Decision::Decline, &staff()).await.unwrap();

        let mine = wf.mine(1, 2024, 3).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().any(|r| r.status == ReservationStatus::Decline));
        assert!(mine.iter().all(|r| r.requester_id == 1));
    }

    #[tokio::test]
    async fn test_waiting_lists_only_wait_for_staff() {
        let wf = workflow().await;
        let a = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await.unwrap();
        let b = wf.propose(proposal(at(12, 0), at(13, 0)), &member(2)).await.unwrap();
        wf.decide(a.id, Decision::Accept, &staff()).await.unwrap();

        let waiting = wf.waiting(None, &staff()).await.unwrap();
        assert_eq!(waiting.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b.id]);
    }

    #[tokio::test]
    async fn test_no_overlap_after_mixed_sequence() {
        let wf = workflow().await;
        let slots = [
            ((10, 0), (12, 0)),
            ((11, 0), (13, 0)),
            ((12, 0), (14, 0)),
            ((9, 0), (10, 30)),
            ((13, 30), (15, 0)),
            ((14, 0), (16, 0)),
        ];

        let mut created = Vec::new();
        for (i, (s, e)) in slots.iter().enumerate() {
            if let Ok(r) = wf
                .propose(proposal(at(s.0, s.1), at(e.0, e.1)), &member(i as i64))
                .await
            {
                created.push(r);
            }
        }
        // 10-12, 12-14 and 14-16 get in
        assert_eq!(created.len(), 3);

        wf.decide(created[0].id, Decision::Decline, &staff()).await.unwrap();
        for r in &created[1..] {
            wf.decide(r.id, Decision::Accept, &staff()).await.unwrap();
        }
        for (s, e) in &slots {
            let _ = wf
                .propose(proposal(at(s.0, s.1), at(e.0, e.1)), &member(50))
                .await;
        }

        let month = wf.for_month(None, 2024, 3).await.unwrap();
        assert_eq!(month.len(), 3);
        assert_no_overlap(&month);
    }

    #[tokio::test]
    async fn test_field_validation() {
        let wf = workflow().await;
        let mut blank = proposal(at(10, 0), at(11, 0));
        blank.title = "   ".into();
        assert!(matches!(
            wf.propose(blank, &member(1)).await,
            Err(ScheduleError::Validation { code: ErrorCode::ValidationFailed, .. })
        ));

        assert!(matches!(
            wf.propose(proposal(at(11, 0), at(10, 0)), &member(1)).await,
            Err(ScheduleError::Validation { code: ErrorCode::InvalidTimeRange, .. })
        ));
    }

    #[tokio::test]
    async fn test_title_trimmed_and_default_room_used() {
        let wf = workflow().await;
        let mut p = proposal(at(10, 0), at(11, 0));
        p.title = "  Jam session  ".into();
        p.description = Some("   ".into());
        let r = wf.propose(p, &member(1)).await.unwrap();
        assert_eq!(r.title, "Jam session");
        assert_eq!(r.description, None);
        assert_eq!(r.room_id, wf.default_room_id());
        assert_eq!(r.requester_name, "member1");
    }

    /// Counts every store call; returns nothing useful
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ReservationStore for CountingStore {
        async fn create(&self, _candidate: NewReservation) -> ScheduleResult<Reservation> {
            self.hit();
            Err(ScheduleError::Persistence("counting store".into()))
        }
        async fn get(&self, _id: i64) -> ScheduleResult<Option<Reservation>> {
            self.hit();
            Ok(None)
        }
        async fn list_by_month(&self, _room_id: i64, _year: i32, _month: u32) -> ScheduleResult<Vec<Reservation>> {
            self.hit();
            Ok(Vec::new())
        }
        async fn list_by_requester(&self, _requester_id: i64, _year: i32, _month: u32) -> ScheduleResult<Vec<Reservation>> {
            self.hit();
            Ok(Vec::new())
        }
        async fn list_waiting(&self, _room_id: i64) -> ScheduleResult<Vec<Reservation>> {
            self.hit();
            Ok(Vec::new())
        }
        async fn update_status(&self, id: i64, _status: ReservationStatus) -> ScheduleResult<Reservation> {
            self.hit();
            Err(ScheduleError::NotFound(id))
        }
        async fn delete(&self, id: i64, _requester_id: i64) -> ScheduleResult<()> {
            self.hit();
            Err(ScheduleError::NotFound(id))
        }
    }

    #[tokio::test]
    async fn test_outside_hours_rejected_before_store() {
        let store = Arc::new(CountingStore::default());
        let wf = ReservationWorkflow::new(store.clone(), hours((9, 0), (23, 0)), 1);

        let err = wf
            .propose(proposal(at(8, 0), at(9, 30)), &member(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Validation { code: ErrorCode::OutsideOperatingHours, .. }
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        // Unauthorized decisions never reach the store either
        assert!(wf.decide(1, Decision::Accept, &member(1)).await.is_err());
        assert!(wf.waiting(None, &member(1)).await.is_err());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_multi_day_proposal_rejected_before_store() {
        let store = Arc::new(CountingStore::default());
        let wf = ReservationWorkflow::new(store.clone(), hours((0, 0), (23, 59)), 1);

        // Both clock times are in hours, the dates differ
        for end in [local(2024, 3, 5, 11, 0), local(2124, 3, 4, 11, 0)] {
            let err = wf
                .propose(proposal(at(10, 0), end), &member(1))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ScheduleError::Validation { code: ErrorCode::InvalidTimeRange, .. }
            ));
        }
        // Across midnight by a few minutes
        let err = wf
            .propose(
                proposal(at(23, 50), local(2024, 3, 5, 0, 10)),
                &member(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        // A same-day proposal loads exactly one month before writing
        let _ = wf.propose(proposal(at(10, 0), at(11, 0)), &member(1)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
