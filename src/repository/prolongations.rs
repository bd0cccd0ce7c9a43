//! Prolongations repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::prolongation::{Prolongation, ProlongationStatus},
};

pub(crate) const PROLONGATION_COLUMNS: &str = "id, loan_id, user_id, kind, status, requested_at, \
     processed_at, prior_due_date, new_due_date, days_added, reservation_pending, \
     processor_id, comment";

#[derive(Clone)]
pub struct ProlongationsRepository {
    pool: Pool<Postgres>,
}

impl ProlongationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get prolongation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Prolongation> {
        sqlx::query_as::<_, Prolongation>(&format!(
            "SELECT {} FROM prolongations WHERE id = $1",
            PROLONGATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prolongation with id {} not found", id)))
    }

    /// List prolongations of a loan, newest first
    pub async fn list_by_loan(&self, loan_id: i32) -> AppResult<Vec<Prolongation>> {
        let rows = sqlx::query_as::<_, Prolongation>(&format!(
            "SELECT {} FROM prolongations WHERE loan_id = $1 ORDER BY requested_at DESC",
            PROLONGATION_COLUMNS
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// List pending manual prolongations, oldest first
    pub async fn list_pending(&self) -> AppResult<Vec<Prolongation>> {
        let rows = sqlx::query_as::<_, Prolongation>(&format!(
            "SELECT {} FROM prolongations WHERE status = $1 ORDER BY requested_at",
            PROLONGATION_COLUMNS
        ))
        .bind(ProlongationStatus::Pending)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
