//! Reservation Model (clubroom bookings)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reservation approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Pending staff decision
    #[default]
    #[serde(rename = "WAIT")]
    Wait,
    #[serde(rename = "ACCEPT")]
    Accept,
    #[serde(rename = "DECLINE")]
    Decline,
}

impl ReservationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wait => "WAIT",
            Self::Accept => "ACCEPT",
            Self::Decline => "DECLINE",
        }
    }

    /// WAIT and ACCEPT reservations hold their slot
    pub const fn blocks_slot(&self) -> bool {
        matches!(self, Self::Wait | Self::Accept)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reservation status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAIT" => Ok(Self::Wait),
            "ACCEPT" => Ok(Self::Accept),
            "DECLINE" => Ok(Self::Decline),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Reservation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    /// Bookable room
    pub room_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Exclusive end of the booked interval
    pub end_time: DateTime<Utc>,
    pub requester_id: i64,
    /// Requester display name at creation time
    pub requester_name: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Half-open interval overlap: `[s1, e1)` and `[s2, e2)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreate {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Falls back to the configured default room
    #[serde(default, alias = "studyId")]
    pub room_id: Option<i64>,
}
