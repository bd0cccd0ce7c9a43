//! Catalog lookup repository.
//!
//! Read-only view over the catalog collaborator: just enough to resolve an
//! item's module and genre.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::item::ItemRef,
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item reference by ID
    pub async fn get_item(&self, id: i32) -> AppResult<ItemRef> {
        sqlx::query_as::<_, ItemRef>(
            "SELECT id, module, genre_id, genre_name, title FROM items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }
}
