//! Reservation Repository

use super::{RepoError, RepoResult};
use crate::utils::time::from_millis;
use shared::models::{Reservation, ReservationStatus};
use sqlx::SqliteExecutor;

const COLUMNS: &str = "id, room_id, title, description, start_time, end_time, requester_id, requester_name, status, created_at, updated_at";

/// Raw `reservation` row; times are Unix millis
#[derive(Debug, sqlx::FromRow)]
pub struct ReservationRow {
    pub id: i64,
    pub room_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub requester_id: i64,
    pub requester_name: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = RepoError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let instant = |ms: i64, field: &str| {
            from_millis(ms).ok_or_else(|| {
                RepoError::Database(format!("Reservation {}: {field} out of range: {ms}", row.id))
            })
        };

        Ok(Reservation {
            id: row.id,
            room_id: row.room_id,
            start_time: instant(row.start_time, "start_time")?,
            end_time: instant(row.end_time, "end_time")?,
            created_at: instant(row.created_at, "created_at")?,
            updated_at: instant(row.updated_at, "updated_at")?,
            status: row
                .status
                .parse::<ReservationStatus>()
                .map_err(|e| RepoError::Database(format!("Reservation {}: {e}", row.id)))?,
            title: row.title,
            description: row.description,
            requester_id: row.requester_id,
            requester_name: row.requester_name,
        })
    }
}

fn into_models(rows: Vec<ReservationRow>) -> RepoResult<Vec<Reservation>> {
    rows.into_iter().map(Reservation::try_from).collect()
}

/// Insert payload; id and timestamps are assigned by the caller
#[derive(Debug, Clone)]
pub struct ReservationInsert {
    pub id: i64,
    pub room_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub requester_id: i64,
    pub requester_name: String,
    pub now: i64,
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> RepoResult<Option<Reservation>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {COLUMNS} FROM reservation WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.map(Reservation::try_from).transpose()
}

/// Insert as WAIT unless a WAIT/ACCEPT row of the same room overlaps
/// `[start_time, end_time)`. Returns whether the row was written.
pub async fn insert_if_free<'e, E>(executor: E, data: &ReservationInsert) -> RepoResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO reservation (id, room_id, title, description, start_time, end_time, requester_id, requester_name, status, created_at, updated_at) \
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'WAIT', ?9, ?9 \
         WHERE NOT EXISTS (SELECT 1 FROM reservation WHERE room_id = ?2 AND status IN ('WAIT', 'ACCEPT') AND start_time < ?6 AND end_time > ?5)",
    )
    .bind(data.id)
    .bind(data.room_id)
    .bind(&data.title)
    .bind(&data.description)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(data.requester_id)
    .bind(&data.requester_name)
    .bind(data.now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Earliest WAIT/ACCEPT reservation of the room overlapping `[start, end)`
pub async fn find_blocking<'e, E>(
    executor: E,
    room_id: i64,
    start_millis: i64,
    end_millis: i64,
) -> RepoResult<Option<Reservation>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {COLUMNS} FROM reservation WHERE room_id = ? AND status IN ('WAIT', 'ACCEPT') AND start_time < ? AND end_time > ? ORDER BY start_time, id LIMIT 1"
    ))
    .bind(room_id)
    .bind(end_millis)
    .bind(start_millis)
    .fetch_optional(executor)
    .await?;
    row.map(Reservation::try_from).transpose()
}

/// All statuses, intervals intersecting `[start, end)`
pub async fn find_by_room_in_range<'e, E>(
    executor: E,
    room_id: i64,
    start_millis: i64,
    end_millis: i64,
) -> RepoResult<Vec<Reservation>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {COLUMNS} FROM reservation WHERE room_id = ? AND start_time < ? AND end_time > ? ORDER BY start_time, id"
    ))
    .bind(room_id)
    .bind(end_millis)
    .bind(start_millis)
    .fetch_all(executor)
    .await?;
    into_models(rows)
}

pub async fn find_by_requester_in_range<'e, E>(
    executor: E,
    requester_id: i64,
    start_millis: i64,
    end_millis: i64,
) -> RepoResult<Vec<Reservation>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {COLUMNS} FROM reservation WHERE requester_id = ? AND start_time < ? AND end_time > ? ORDER BY start_time, id"
    ))
    .bind(requester_id)
    .bind(end_millis)
    .bind(start_millis)
    .fetch_all(executor)
    .await?;
    into_models(rows)
}

/// WAIT reservations of the room in creation order
pub async fn find_waiting<'e, E>(executor: E, room_id: i64) -> RepoResult<Vec<Reservation>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {COLUMNS} FROM reservation WHERE room_id = ? AND status = 'WAIT' ORDER BY created_at, id"
    ))
    .bind(room_id)
    .fetch_all(executor)
    .await?;
    into_models(rows)
}

/// Returns the number of rows touched (0 when the id is absent)
pub async fn set_status<'e, E>(
    executor: E,
    id: i64,
    status: ReservationStatus,
    now: i64,
) -> RepoResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE reservation SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Delete only when owned by `requester_id`; returns rows deleted
pub async fn delete_owned<'e, E>(executor: E, id: i64, requester_id: i64) -> RepoResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM reservation WHERE id = ? AND requester_id = ?")
        .bind(id)
        .bind(requester_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
