//! Conflict checking
//!
//! Pure functions: no I/O, no clock. Intervals are half-open `[start, end)`,
//! so back-to-back bookings never conflict.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use shared::models::Reservation;

use crate::utils::time::local_time_of_day;

/// The room and interval a candidate wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub room_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// First existing reservation that blocks `candidate`
///
/// Only reservations of the same room in WAIT or ACCEPT count.
pub fn find_conflict<'a>(candidate: &Slot, existing: &'a [Reservation]) -> Option<&'a Reservation> {
    existing.iter().find(|r| {
        r.room_id == candidate.room_id
            && r.status.blocks_slot()
            && r.overlaps(candidate.start, candidate.end)
    })
}

pub fn has_conflict(candidate: &Slot, existing: &[Reservation]) -> bool {
    find_conflict(candidate, existing).is_some()
}

/// Daily operating window, `[open, close]` inclusive, in the business timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    open: NaiveTime,
    close: NaiveTime,
    tz: Tz,
}

impl OperatingHours {
    pub fn new(open: NaiveTime, close: NaiveTime, tz: Tz) -> Self {
        Self { open, close, tz }
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Both endpoints fall inside the window and `start < end`
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start >= end {
            return false;
        }
        let within = |t: NaiveTime| self.open <= t && t <= self.close;
        within(local_time_of_day(start, self.tz)) && within(local_time_of_day(end, self.tz))
    }

    /// Start and end fall on the same local calendar date
    pub fn same_day(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start.with_timezone(&self.tz).date_naive() == end.with_timezone(&self.tz).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Seoul;
    use shared::models::ReservationStatus;

    fn local(h: u32, m: u32) -> DateTime<Utc> {
        Seoul
            .with_ymd_and_hms(2024, 3, 4, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn reservation(id: i64, room_id: i64, start: (u32, u32), end: (u32, u32), status: ReservationStatus) -> Reservation {
        Reservation {
            id,
            room_id,
            title: "t".into(),
            description: None,
            start_time: local(start.0, start.1),
            end_time: local(end.0, end.1),
            requester_id: 1,
            requester_name: "kim".into(),
            status,
            created_at: local(8, 0),
            updated_at: local(8, 0),
        }
    }

    fn slot(start: (u32, u32), end: (u32, u32)) -> Slot {
        Slot {
            room_id: 1,
            start: local(start.0, start.1),
            end: local(end.0, end.1),
        }
    }

    fn hours() -> OperatingHours {
        OperatingHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            Seoul,
        )
    }

    #[test]
    fn test_overlap_conflicts() {
        let existing = vec![reservation(1, 1, (10, 0), (11, 0), ReservationStatus::Wait)];
        assert!(has_conflict(&slot((10, 30), (10, 45)), &existing));
        assert!(has_conflict(&slot((9, 30), (10, 30)), &existing));
        assert!(has_conflict(&slot((9, 0), (12, 0)), &existing));
    }

    #[test]
    fn test_back_to_back_does_not_conflict() {
        let existing = vec![reservation(1, 1, (10, 0), (11, 0), ReservationStatus::Accept)];
        assert!(!has_conflict(&slot((11, 0), (12, 0)), &existing));
        assert!(!has_conflict(&slot((9, 0), (10, 0)), &existing));
    }

    #[test]
    fn test_declined_and_other_rooms_ignored() {
        let existing = vec![
            reservation(1, 1, (10, 0), (11, 0), ReservationStatus::Decline),
            reservation(2, 2, (10, 0), (11, 0), ReservationStatus::Accept),
        ];
        assert!(!has_conflict(&slot((10, 0), (11, 0)), &existing));
    }

    #[test]
    fn test_find_conflict_returns_first_blocker() {
        let existing = vec![
            reservation(1, 1, (10, 0), (11, 0), ReservationStatus::Decline),
            reservation(2, 1, (10, 30), (11, 30), ReservationStatus::Wait),
            reservation(3, 1, (11, 0), (12, 0), ReservationStatus::Accept),
        ];
        let hit = find_conflict(&slot((10, 0), (12, 0)), &existing).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn test_operating_hours_inclusive_bounds() {
        let h = hours();
        assert!(h.contains(local(9, 0), local(23, 0)));
        assert!(h.contains(local(10, 0), local(11, 0)));
        assert!(!h.contains(local(8, 0), local(9, 30)));
        assert!(!h.contains(local(22, 0), local(23, 30)));
    }

    #[test]
    fn test_same_day_uses_local_date() {
        let h = OperatingHours::new(NaiveTime::MIN, NaiveTime::from_hms_opt(23, 59, 0).unwrap(), Seoul);
        assert!(h.same_day(local(0, 0), local(23, 59)));
        // 2024-03-04 23:00 KST .. 2024-03-05 01:00 KST
        let next_day = local(23, 0) + chrono::Duration::hours(2);
        assert!(!h.same_day(local(23, 0), next_day));
        // Same UTC date (2024-03-04 14:00Z / 16:00Z), different local dates
        assert_eq!(local(23, 0).date_naive(), next_day.date_naive());
    }

    #[test]
    fn test_operating_hours_requires_ordering() {
        let h = hours();
        assert!(!h.contains(local(11, 0), local(10, 0)));
        assert!(!h.contains(local(11, 0), local(11, 0)));
    }
}
