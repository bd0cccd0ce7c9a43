//! Copies repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::copy::{Copy, CopyStatus},
};

pub(crate) const COPY_COLUMNS: &str = "id, item_id, module, structure_id, group_id, barcode, \
     condition, location, acquisition_price, acquisition_date, status, sequence, \
     created_at, updated_at";

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>(&format!("SELECT {} FROM copies WHERE id = $1", COPY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// Get copy by barcode
    pub async fn get_by_barcode(&self, barcode: &str) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>(&format!(
            "SELECT {} FROM copies WHERE barcode = $1",
            COPY_COLUMNS
        ))
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with barcode {} not found", barcode)))
    }

    /// List available copies of an item, sequence ascending
    pub async fn list_available(&self, item_id: i32) -> AppResult<Vec<Copy>> {
        let copies = sqlx::query_as::<_, Copy>(&format!(
            "SELECT {} FROM copies WHERE item_id = $1 AND status = $2 ORDER BY sequence",
            COPY_COLUMNS
        ))
        .bind(item_id)
        .bind(CopyStatus::Available)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    /// List all copies of an item, sequence ascending
    pub async fn list_by_item(&self, item_id: i32) -> AppResult<Vec<Copy>> {
        let copies = sqlx::query_as::<_, Copy>(&format!(
            "SELECT {} FROM copies WHERE item_id = $1 ORDER BY sequence",
            COPY_COLUMNS
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }
}
