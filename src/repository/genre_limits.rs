//! Genre limits repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        enums::{LimitKind, Module},
        genre_limit::{GenreLimit, UpsertGenreLimit},
    },
};

const LIMIT_COLUMNS: &str =
    "id, kind, structure_id, module, genre_id, genre_name, max_count, is_active";

#[derive(Clone)]
pub struct GenreLimitsRepository {
    pool: Pool<Postgres>,
}

impl GenreLimitsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch the structure-scoped and global active rows for one
    /// (module, genre, kind), either of which may be absent. Takes an
    /// executor so the enforcer can read inside the committing transaction.
    pub async fn find_scoped<'e, E>(
        &self,
        executor: E,
        structure_id: i32,
        module: Module,
        genre_id: i16,
        kind: LimitKind,
    ) -> AppResult<(Option<GenreLimit>, Option<GenreLimit>)>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, GenreLimit>(&format!(
            "SELECT {} FROM genre_limits \
             WHERE module = $1 AND genre_id = $2 AND kind = $3 AND is_active \
               AND (structure_id = $4 OR structure_id IS NULL)",
            LIMIT_COLUMNS
        ))
        .bind(module)
        .bind(genre_id)
        .bind(kind)
        .bind(structure_id)
        .fetch_all(executor)
        .await?;

        let mut structure_row = None;
        let mut global_row = None;
        for row in rows {
            match row.structure_id {
                Some(_) => structure_row = Some(row),
                None => global_row = Some(row),
            }
        }
        Ok((structure_row, global_row))
    }

    /// List active rows visible to a structure: its own plus the global layer
    pub async fn list_for_structure(&self, structure_id: i32) -> AppResult<Vec<GenreLimit>> {
        let rows = sqlx::query_as::<_, GenreLimit>(&format!(
            "SELECT {} FROM genre_limits \
             WHERE is_active AND (structure_id = $1 OR structure_id IS NULL) \
             ORDER BY module, genre_id, kind, structure_id NULLS LAST",
            LIMIT_COLUMNS
        ))
        .bind(structure_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Upsert a limit row, keeping at most one active row per
    /// (scope, module, genre, kind).
    pub async fn upsert(&self, req: &UpsertGenreLimit) -> AppResult<GenreLimit> {
        let mut tx = self.pool.begin().await?;

        // Try to update the existing row for this exact scope first
        let updated = sqlx::query_as::<_, GenreLimit>(&format!(
            "UPDATE genre_limits \
             SET genre_name = $1, max_count = $2, is_active = $3 \
             WHERE kind = $4 AND module = $5 AND genre_id = $6 \
               AND structure_id IS NOT DISTINCT FROM $7 \
             RETURNING {}",
            LIMIT_COLUMNS
        ))
        .bind(&req.genre_name)
        .bind(req.max_count)
        .bind(req.is_active)
        .bind(req.kind)
        .bind(req.module)
        .bind(req.genre_id)
        .bind(req.structure_id)
        .fetch_optional(&mut *tx)
        .await?;

        let row = match updated {
            Some(row) => row,
            None => {
                sqlx::query_as::<_, GenreLimit>(&format!(
                    "INSERT INTO genre_limits \
                     (kind, structure_id, module, genre_id, genre_name, max_count, is_active) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     RETURNING {}",
                    LIMIT_COLUMNS
                ))
                .bind(req.kind)
                .bind(req.structure_id)
                .bind(req.module)
                .bind(req.genre_id)
                .bind(&req.genre_name)
                .bind(req.max_count)
                .bind(req.is_active)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(row)
    }
}
