//! Reservation store
//!
//! [`ReservationStore`] is the persistence seam of the scheduler; the
//! workflow only talks to this trait. [`SqliteReservationStore`] is the
//! production implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use shared::models::{Reservation, ReservationStatus};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use super::calendar::MonthWindow;
use super::error::{ScheduleError, ScheduleResult};
use crate::db::repository::reservation::{self as repo, ReservationInsert};

/// A validated proposal, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub room_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub requester_id: i64,
    pub requester_name: String,
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Assign an id and persist as WAIT
    ///
    /// Fails with [`ScheduleError::Conflict`] if a WAIT/ACCEPT reservation of
    /// the same room overlaps at write time.
    async fn create(&self, candidate: NewReservation) -> ScheduleResult<Reservation>;

    async fn get(&self, id: i64) -> ScheduleResult<Option<Reservation>>;

    /// Every status, intervals intersecting the local month, by start time
    async fn list_by_month(&self, room_id: i64, year: i32, month: u32) -> ScheduleResult<Vec<Reservation>>;

    /// Every status and room, intervals intersecting the local month, by start time
    async fn list_by_requester(
        &self,
        requester_id: i64,
        year: i32,
        month: u32,
    ) -> ScheduleResult<Vec<Reservation>>;

    /// WAIT reservations of the room in creation order
    async fn list_waiting(&self, room_id: i64) -> ScheduleResult<Vec<Reservation>>;

    /// Last write wins
    async fn update_status(&self, id: i64, status: ReservationStatus) -> ScheduleResult<Reservation>;

    /// Only the requester may delete, whatever the status
    async fn delete(&self, id: i64, requester_id: i64) -> ScheduleResult<()>;
}

/// SQLite-backed store
///
/// Creations are serialized per room: a per-room async mutex plus a
/// conditional insert inside one transaction, so two overlapping proposals
/// can never both be written.
#[derive(Clone)]
pub struct SqliteReservationStore {
    pool: SqlitePool,
    tz: Tz,
    room_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl SqliteReservationStore {
    pub fn new(pool: SqlitePool, tz: Tz) -> Self {
        Self {
            pool,
            tz,
            room_locks: Arc::new(DashMap::new()),
        }
    }

    fn room_lock(&self, room_id: i64) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl ReservationStore for SqliteReservationStore {
    async fn create(&self, candidate: NewReservation) -> ScheduleResult<Reservation> {
        let lock = self.room_lock(candidate.room_id);
        let _guard = lock.lock().await;

        let data = ReservationInsert {
            id: shared::util::snowflake_id(),
            room_id: candidate.room_id,
            title: candidate.title,
            description: candidate.description,
            start_time: candidate.start_time.timestamp_millis(),
            end_time: candidate.end_time.timestamp_millis(),
            requester_id: candidate.requester_id,
            requester_name: candidate.requester_name,
            now: shared::util::now_millis(),
        };

        let mut tx = self.pool.begin().await.map_err(repo_err)?;

        if !repo::insert_if_free(&mut *tx, &data).await? {
            let blocking =
                repo::find_blocking(&mut *tx, data.room_id, data.start_time, data.end_time).await?;
            tx.rollback().await.map_err(repo_err)?;
            return Err(match blocking {
                Some(r) => ScheduleError::Conflict {
                    conflicting_id: r.id,
                },
                None => ScheduleError::Persistence(format!(
                    "Reservation {} was not written",
                    data.id
                )),
            });
        }

        let created = repo::find_by_id(&mut *tx, data.id)
            .await?
            .ok_or_else(|| ScheduleError::Persistence("Failed to create reservation".into()))?;
        tx.commit().await.map_err(repo_err)?;

        tracing::info!(
            reservation_id = created.id,
            room_id = created.room_id,
            requester_id = created.requester_id,
            "Reservation created"
        );
        Ok(created)
    }

    async fn get(&self, id: i64) -> ScheduleResult<Option<Reservation>> {
        Ok(repo::find_by_id(&self.pool, id).await?)
    }

    async fn list_by_month(&self, room_id: i64, year: i32, month: u32) -> ScheduleResult<Vec<Reservation>> {
        let window = MonthWindow::new(year, month, self.tz)?;
        Ok(repo::find_by_room_in_range(
            &self.pool,
            room_id,
            window.start.timestamp_millis(),
            window.end.timestamp_millis(),
        )
        .await?)
    }

    async fn list_by_requester(
        &self,
        requester_id: i64,
        year: i32,
        month: u32,
    ) -> ScheduleResult<Vec<Reservation>> {
        let window = MonthWindow::new(year, month, self.tz)?;
        Ok(repo::find_by_requester_in_range(
            &self.pool,
            requester_id,
            window.start.timestamp_millis(),
            window.end.timestamp_millis(),
        )
        .await?)
    }

    async fn list_waiting(&self, room_id: i64) -> ScheduleResult<Vec<Reservation>> {
        Ok(repo::find_waiting(&self.pool, room_id).await?)
    }

    async fn update_status(&self, id: i64, status: ReservationStatus) -> ScheduleResult<Reservation> {
        let rows = repo::set_status(&self.pool, id, status, shared::util::now_millis()).await?;
        if rows == 0 {
            return Err(ScheduleError::NotFound(id));
        }
        repo::find_by_id(&self.pool, id)
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    async fn delete(&self, id: i64, requester_id: i64) -> ScheduleResult<()> {
        if repo::delete_owned(&self.pool, id, requester_id).await? == 1 {
            return Ok(());
        }
        // Nothing deleted: tell "absent" from "someone else's"
        match repo::find_by_id(&self.pool, id).await? {
            Some(_) => Err(ScheduleError::not_owner(id)),
            None => Err(ScheduleError::NotFound(id)),
        }
    }
}

fn repo_err(err: sqlx::Error) -> ScheduleError {
    crate::db::repository::RepoError::from(err).into()
}
