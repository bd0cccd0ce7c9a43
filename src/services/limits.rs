//! Genre limit enforcement service.
//!
//! Resolves the applicable cap (structure row over global row over the
//! configured default) and counts the user's active loans or reservations in
//! the genre. The count-then-decide step runs under a per-(user, genre)
//! advisory lock on the caller's transaction so two concurrent checkouts
//! cannot both pass the check and jointly exceed the cap.

use serde::Serialize;
use sqlx::PgConnection;
use utoipa::ToSchema;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        enums::{LimitKind, Module},
        genre_limit::{resolve_max, GenreLimit, UpsertGenreLimit},
        reservation::ReservationStatus,
    },
    repository::{advisory_key, Repository, LOCK_CLASS_USER_GENRE},
};

/// Outcome of a standalone limit check
#[derive(Debug, Serialize, ToSchema)]
pub struct LimitCheck {
    pub kind: LimitKind,
    pub genre_id: i16,
    pub genre_name: Option<String>,
    pub limit: i16,
    pub current: i64,
}

#[derive(Clone)]
pub struct GenreLimitsService {
    repository: Repository,
    config: CirculationConfig,
}

impl GenreLimitsService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    fn default_max(&self, kind: LimitKind) -> i16 {
        match kind {
            LimitKind::Borrowing => self.config.default_borrow_limit,
            LimitKind::Reservation => self.config.default_reservation_limit,
        }
    }

    /// Check the cap inside the caller's transaction, taking the
    /// per-(user, genre) advisory lock first. The lock is held until the
    /// transaction commits, which closes the count-then-commit race.
    #[allow(clippy::too_many_arguments)]
    pub async fn check_within(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        structure_id: i32,
        module: Module,
        genre_id: i16,
        genre_name: Option<&str>,
        kind: LimitKind,
    ) -> AppResult<LimitCheck> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(advisory_key(LOCK_CLASS_USER_GENRE, user_id, genre_id as i32))
            .execute(&mut *conn)
            .await?;

        let (structure_row, global_row) = self
            .repository
            .genre_limits
            .find_scoped(&mut *conn, structure_id, module, genre_id, kind)
            .await?;
        let limit = resolve_max(
            structure_row.as_ref(),
            global_row.as_ref(),
            self.default_max(kind),
        );

        let current: i64 = match kind {
            LimitKind::Borrowing => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM loans l \
                     JOIN copies c ON l.copy_id = c.id \
                     JOIN items i ON c.item_id = i.id \
                     WHERE l.user_id = $1 AND l.returned_at IS NULL \
                       AND i.module = $2 AND i.genre_id = $3",
                )
                .bind(user_id)
                .bind(module)
                .bind(genre_id)
                .fetch_one(&mut *conn)
                .await?
            }
            LimitKind::Reservation => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM reservations r \
                     JOIN items i ON r.item_id = i.id \
                     WHERE r.user_id = $1 AND r.status IN ($4, $5) \
                       AND i.module = $2 AND i.genre_id = $3",
                )
                .bind(user_id)
                .bind(module)
                .bind(genre_id)
                .bind(ReservationStatus::Waiting)
                .bind(ReservationStatus::Ready)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        let genre_label = genre_name
            .map(str::to_string)
            .or_else(|| {
                structure_row
                    .as_ref()
                    .or(global_row.as_ref())
                    .and_then(|l| l.genre_name.clone())
            })
            .unwrap_or_else(|| format!("genre {}", genre_id));

        if current + 1 > limit as i64 {
            return Err(AppError::LimitExceeded {
                genre: genre_label,
                limit,
                current,
            });
        }

        Ok(LimitCheck {
            kind,
            genre_id,
            genre_name: Some(genre_label),
            limit,
            current,
        })
    }

    /// Standalone check in its own transaction; exceeding the cap surfaces
    /// as `LimitExceeded`, passing returns the current standing.
    pub async fn check_limit(
        &self,
        user_id: i32,
        structure_id: i32,
        module: Module,
        genre_id: i16,
        kind: LimitKind,
    ) -> AppResult<LimitCheck> {
        let mut tx = self.repository.pool.begin().await?;
        let check = self
            .check_within(&mut *tx, user_id, structure_id, module, genre_id, None, kind)
            .await?;
        tx.commit().await?;
        Ok(check)
    }

    /// Active rows visible to a structure (its own plus the global layer)
    pub async fn list_for_structure(&self, structure_id: i32) -> AppResult<Vec<GenreLimit>> {
        self.repository
            .genre_limits
            .list_for_structure(structure_id)
            .await
    }

    /// Upsert a limit row, keeping at most one active row per scope
    pub async fn upsert(&self, req: UpsertGenreLimit) -> AppResult<GenreLimit> {
        self.repository.genre_limits.upsert(&req).await
    }
}
