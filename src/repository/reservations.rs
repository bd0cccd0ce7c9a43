//! Reservations repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::reservation::{Reservation, ReservationStatus},
};

pub(crate) const RESERVATION_COLUMNS: &str =
    "id, item_id, user_id, structure_id, requested_at, status, copy_id";

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Waiting queue for an item, strictly FIFO by request time
    pub async fn list_queue(&self, item_id: i32) -> AppResult<Vec<Reservation>> {
        let queue = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE item_id = $1 AND status = $2 \
             ORDER BY requested_at, id",
            RESERVATION_COLUMNS
        ))
        .bind(item_id)
        .bind(ReservationStatus::Waiting)
        .fetch_all(&self.pool)
        .await?;
        Ok(queue)
    }

    /// List a user's active (waiting or ready) reservations
    pub async fn list_active_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE user_id = $1 AND status IN ($2, $3) \
             ORDER BY requested_at",
            RESERVATION_COLUMNS
        ))
        .bind(user_id)
        .bind(ReservationStatus::Waiting)
        .bind(ReservationStatus::Ready)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }
}
