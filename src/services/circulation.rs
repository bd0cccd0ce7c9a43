//! Circulation state machine: checkout, return, reservation and
//! administrative status moves.
//!
//! Every transition runs in one transaction: the copy row is locked first,
//! the genre cap is checked under the per-(user, genre) advisory lock where
//! required, and the status flip is a conditional update guarded on the
//! expected prior status. Notifications fire only after commit.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use utoipa::ToSchema;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        copy::{Copy, CopyStatus},
        enums::{event_codes, LimitKind},
        item::ItemRef,
        loan::Loan,
        reservation::{Reservation, ReservationStatus},
    },
    repository::{
        copies::COPY_COLUMNS, loans::LOAN_COLUMNS, reservations::RESERVATION_COLUMNS, Repository,
    },
};

use super::{limits::GenreLimitsService, notifications::NotificationsService};

/// Result of returning a copy
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub loan: Loan,
    pub copy_status: CopyStatus,
    /// Head of the reservation queue now holding the copy, if any
    pub ready_reservation: Option<Reservation>,
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    limits: GenreLimitsService,
    notifications: NotificationsService,
    config: CirculationConfig,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        limits: GenreLimitsService,
        notifications: NotificationsService,
        config: CirculationConfig,
    ) -> Self {
        Self {
            repository,
            limits,
            notifications,
            config,
        }
    }

    async fn lock_copy(conn: &mut PgConnection, copy_id: i32) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>(&format!(
            "SELECT {} FROM copies WHERE id = $1 FOR UPDATE",
            COPY_COLUMNS
        ))
        .bind(copy_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", copy_id)))
    }

    async fn item_of(conn: &mut PgConnection, item_id: i32) -> AppResult<ItemRef> {
        sqlx::query_as::<_, ItemRef>(
            "SELECT id, module, genre_id, genre_name, title FROM items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
    }

    /// Flip a copy's status, guarded on the expected prior status. The guard
    /// is the compare-and-commit: zero rows means the copy moved underneath
    /// a concurrent request.
    async fn transition_copy(
        conn: &mut PgConnection,
        copy_id: i32,
        from: CopyStatus,
        to: CopyStatus,
    ) -> AppResult<()> {
        let affected = sqlx::query(
            "UPDATE copies SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to)
        .bind(copy_id)
        .bind(from)
        .execute(conn)
        .await?
        .rows_affected();

        if affected != 1 {
            return Err(AppError::Conflict(format!(
                "copy {} is no longer {}",
                copy_id, from
            )));
        }
        Ok(())
    }

    /// Lock the FIFO queue head for an item, if anyone is waiting
    async fn lock_queue_head(
        conn: &mut PgConnection,
        item_id: i32,
    ) -> AppResult<Option<Reservation>> {
        let head = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE item_id = $1 AND status = $2 \
             ORDER BY requested_at, id LIMIT 1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(item_id)
        .bind(ReservationStatus::Waiting)
        .fetch_optional(conn)
        .await?;
        Ok(head)
    }

    /// Promote a waiting reservation to Ready, holding the given copy
    async fn make_ready(
        conn: &mut PgConnection,
        reservation_id: i32,
        copy_id: i32,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET status = $1, copy_id = $2 \
             WHERE id = $3 AND status = $4 RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(ReservationStatus::Ready)
        .bind(copy_id)
        .bind(reservation_id)
        .bind(ReservationStatus::Waiting)
        .fetch_one(conn)
        .await?;
        Ok(reservation)
    }

    /// Borrow a copy. An Available copy is a plain checkout; a Reserved copy
    /// is a pickup and requires the matching Ready reservation to belong to
    /// the user. Exactly one of two concurrent checkouts on the same copy
    /// succeeds.
    pub async fn checkout(&self, copy_id: i32, user_id: i32) -> AppResult<Loan> {
        let mut tx = self.repository.pool.begin().await?;

        let copy = Self::lock_copy(&mut tx, copy_id).await?;
        let item = Self::item_of(&mut tx, copy.item_id).await?;

        let fulfilled: Option<Reservation> = match copy.status {
            CopyStatus::Available => {
                self.limits
                    .check_within(
                        &mut tx,
                        user_id,
                        copy.structure_id,
                        item.module,
                        item.genre_id,
                        item.genre_name.as_deref(),
                        LimitKind::Borrowing,
                    )
                    .await?;
                Self::transition_copy(&mut tx, copy_id, CopyStatus::Available, CopyStatus::Borrowed)
                    .await?;
                None
            }
            CopyStatus::Reserved => {
                let reservation = sqlx::query_as::<_, Reservation>(&format!(
                    "SELECT {} FROM reservations \
                     WHERE copy_id = $1 AND status = $2 FOR UPDATE",
                    RESERVATION_COLUMNS
                ))
                .bind(copy_id)
                .bind(ReservationStatus::Ready)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(format!("copy {} is reserved without a ready claim", copy_id))
                })?;

                if reservation.user_id != user_id {
                    return Err(AppError::Conflict(format!(
                        "copy {} is held for another user",
                        copy_id
                    )));
                }

                sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2 AND status = $3")
                    .bind(ReservationStatus::Fulfilled)
                    .bind(reservation.id)
                    .bind(ReservationStatus::Ready)
                    .execute(&mut *tx)
                    .await?;
                Self::transition_copy(&mut tx, copy_id, CopyStatus::Reserved, CopyStatus::Borrowed)
                    .await?;
                Some(reservation)
            }
            CopyStatus::Borrowed => {
                return Err(AppError::Conflict(format!(
                    "copy {} is no longer Available",
                    copy_id
                )))
            }
            other => {
                return Err(AppError::InvalidStateTransition(format!(
                    "cannot checkout copy {} while {}",
                    copy_id, other
                )))
            }
        };

        let now = Utc::now();
        let due_date = now + Duration::days(self.config.loan_days);
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "INSERT INTO loans (copy_id, user_id, structure_id, started_at, due_date, renewal_count) \
             VALUES ($1, $2, $3, $4, $5, 0) RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(copy_id)
        .bind(user_id)
        .bind(copy.structure_id)
        .bind(now)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if fulfilled.is_some() {
            tracing::debug!(copy_id, user_id, "reservation fulfilled at pickup");
        }
        self.notifications.notify(
            copy.structure_id,
            user_id,
            event_codes::LOAN_CHECKOUT,
            format!("'{}' borrowed, due {}", item.title, due_date.date_naive()),
        );

        Ok(loan)
    }

    /// Return a borrowed copy. With a non-empty reservation queue the copy
    /// goes straight to Reserved for the queue head (FIFO); otherwise back
    /// to Available.
    pub async fn return_copy(&self, copy_id: i32) -> AppResult<ReturnOutcome> {
        let mut tx = self.repository.pool.begin().await?;

        let copy = Self::lock_copy(&mut tx, copy_id).await?;
        if copy.status != CopyStatus::Borrowed {
            return Err(AppError::InvalidStateTransition(format!(
                "cannot return copy {} while {}",
                copy_id, copy.status
            )));
        }

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE copy_id = $1 AND returned_at IS NULL FOR UPDATE",
            LOAN_COLUMNS
        ))
        .bind(copy_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("copy {} is borrowed without an active loan", copy_id))
        })?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET returned_at = NOW() WHERE id = $1 RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(loan.id)
        .fetch_one(&mut *tx)
        .await?;

        // Head of the FIFO queue, if anyone is waiting on the item
        let head = Self::lock_queue_head(&mut tx, copy.item_id).await?;

        let (copy_status, ready_reservation) = match head {
            Some(reservation) => {
                Self::transition_copy(&mut tx, copy_id, CopyStatus::Borrowed, CopyStatus::Reserved)
                    .await?;
                let reservation = Self::make_ready(&mut tx, reservation.id, copy_id).await?;
                (CopyStatus::Reserved, Some(reservation))
            }
            None => {
                Self::transition_copy(&mut tx, copy_id, CopyStatus::Borrowed, CopyStatus::Available)
                    .await?;
                (CopyStatus::Available, None)
            }
        };

        tx.commit().await?;

        self.notifications.notify(
            loan.structure_id,
            loan.user_id,
            event_codes::LOAN_RETURN,
            format!("copy {} returned", copy_id),
        );
        if let Some(reservation) = &ready_reservation {
            self.notifications.notify(
                reservation.structure_id,
                reservation.user_id,
                event_codes::RESERVATION_READY,
                format!("reserved copy {} is ready for pickup", copy_id),
            );
        }

        Ok(ReturnOutcome {
            loan,
            copy_status,
            ready_reservation,
        })
    }

    /// Place a reservation on an item. If an available copy exists it is
    /// held immediately (Available -> Reserved, reservation Ready);
    /// otherwise the reservation queues Waiting.
    pub async fn reserve(
        &self,
        item_id: i32,
        user_id: i32,
        structure_id: i32,
    ) -> AppResult<Reservation> {
        let mut tx = self.repository.pool.begin().await?;

        let item = Self::item_of(&mut tx, item_id).await?;

        self.limits
            .check_within(
                &mut tx,
                user_id,
                structure_id,
                item.module,
                item.genre_id,
                item.genre_name.as_deref(),
                LimitKind::Reservation,
            )
            .await?;

        // Hold an on-shelf copy if one exists; skip rows another request is
        // already transitioning
        let available = sqlx::query_as::<_, Copy>(&format!(
            "SELECT {} FROM copies WHERE item_id = $1 AND status = $2 \
             ORDER BY sequence LIMIT 1 FOR UPDATE SKIP LOCKED",
            COPY_COLUMNS
        ))
        .bind(item_id)
        .bind(CopyStatus::Available)
        .fetch_optional(&mut *tx)
        .await?;

        let reservation = match available {
            Some(copy) => {
                Self::transition_copy(&mut tx, copy.id, CopyStatus::Available, CopyStatus::Reserved)
                    .await?;
                sqlx::query_as::<_, Reservation>(&format!(
                    "INSERT INTO reservations \
                     (item_id, user_id, structure_id, requested_at, status, copy_id) \
                     VALUES ($1, $2, $3, NOW(), $4, $5) RETURNING {}",
                    RESERVATION_COLUMNS
                ))
                .bind(item_id)
                .bind(user_id)
                .bind(structure_id)
                .bind(ReservationStatus::Ready)
                .bind(copy.id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Reservation>(&format!(
                    "INSERT INTO reservations \
                     (item_id, user_id, structure_id, requested_at, status, copy_id) \
                     VALUES ($1, $2, $3, NOW(), $4, NULL) RETURNING {}",
                    RESERVATION_COLUMNS
                ))
                .bind(item_id)
                .bind(user_id)
                .bind(structure_id)
                .bind(ReservationStatus::Waiting)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        if reservation.copy_id.is_some() {
            self.notifications.notify(
                structure_id,
                user_id,
                event_codes::RESERVATION_READY,
                format!("'{}' is held for pickup", item.title),
            );
        }

        Ok(reservation)
    }

    /// Cancel an active reservation. A held copy is handed to the next queue
    /// head, or released back to Available when nobody waits.
    ///
    /// Lock order is copy first, then reservation, the same order the pickup
    /// path of checkout takes; the reservation is read unlocked up front to
    /// learn which copy to lock.
    pub async fn cancel_reservation(&self, reservation_id: i32) -> AppResult<Reservation> {
        let mut tx = self.repository.pool.begin().await?;

        let snapshot = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
        })?;

        if !snapshot.status.is_active() {
            return Err(AppError::InvalidStateTransition(format!(
                "reservation {} is already {:?}",
                reservation_id, snapshot.status
            )));
        }

        if let Some(copy_id) = snapshot.copy_id {
            Self::lock_copy(&mut tx, copy_id).await?;
        }

        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        // A concurrent pickup or promotion moved it between the unlocked
        // read and the lock
        if reservation.copy_id != snapshot.copy_id || !reservation.status.is_active() {
            return Err(AppError::Conflict(format!(
                "reservation {} changed during cancellation",
                reservation_id
            )));
        }

        let mut promoted: Option<Reservation> = None;
        if let Some(copy_id) = reservation.copy_id {
            match Self::lock_queue_head(&mut tx, reservation.item_id).await? {
                Some(next) => {
                    // Copy stays Reserved, now for the next in line
                    promoted = Some(Self::make_ready(&mut tx, next.id, copy_id).await?);
                }
                None => {
                    Self::transition_copy(
                        &mut tx,
                        copy_id,
                        CopyStatus::Reserved,
                        CopyStatus::Available,
                    )
                    .await?;
                }
            }
        }

        let cancelled = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET status = $1, copy_id = NULL \
             WHERE id = $2 AND status IN ($3, $4) RETURNING {}",
            RESERVATION_COLUMNS
        ))
        .bind(ReservationStatus::Cancelled)
        .bind(reservation_id)
        .bind(ReservationStatus::Waiting)
        .bind(ReservationStatus::Ready)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(promoted) = &promoted {
            self.notifications.notify(
                promoted.structure_id,
                promoted.user_id,
                event_codes::RESERVATION_READY,
                "reserved copy is ready for pickup".to_string(),
            );
        }

        Ok(cancelled)
    }

    /// A user's active loans, oldest first
    pub async fn list_user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        self.repository.loans.list_active_by_user(user_id).await
    }

    /// A user's active reservations
    pub async fn list_user_reservations(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        self.repository
            .reservations
            .list_active_by_user(user_id)
            .await
    }

    /// The waiting queue on an item, FIFO
    pub async fn list_queue(&self, item_id: i32) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.list_queue(item_id).await
    }

    /// Administrative status move: Maintenance, Lost, Archived, or a restore
    /// to Available. Circulation moves must go through checkout/return.
    pub async fn set_status(&self, copy_id: i32, to: CopyStatus) -> AppResult<Copy> {
        if matches!(to, CopyStatus::Borrowed | CopyStatus::Reserved) {
            return Err(AppError::Validation(format!(
                "status {} is set through circulation operations",
                to
            )));
        }

        let mut tx = self.repository.pool.begin().await?;

        let copy = Self::lock_copy(&mut tx, copy_id).await?;
        if !copy.status.can_transition(to) {
            return Err(AppError::InvalidStateTransition(format!(
                "copy {} cannot move {} -> {}",
                copy_id, copy.status, to
            )));
        }

        // Taking a borrowed copy out of circulation closes its loan
        if copy.status == CopyStatus::Borrowed {
            sqlx::query("UPDATE loans SET returned_at = NOW() WHERE copy_id = $1 AND returned_at IS NULL")
                .bind(copy_id)
                .execute(&mut *tx)
                .await?;
        }

        // Taking a held copy out of circulation releases its Ready claim:
        // hand the reservation another on-shelf copy, or requeue it Waiting
        // at its original position
        let mut rehomed: Option<Reservation> = None;
        if copy.status == CopyStatus::Reserved {
            let held = sqlx::query_as::<_, Reservation>(&format!(
                "SELECT {} FROM reservations WHERE copy_id = $1 AND status = $2 FOR UPDATE",
                RESERVATION_COLUMNS
            ))
            .bind(copy_id)
            .bind(ReservationStatus::Ready)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(held) = held {
                let replacement = sqlx::query_as::<_, Copy>(&format!(
                    "SELECT {} FROM copies WHERE item_id = $1 AND status = $2 \
                     ORDER BY sequence LIMIT 1 FOR UPDATE SKIP LOCKED",
                    COPY_COLUMNS
                ))
                .bind(copy.item_id)
                .bind(CopyStatus::Available)
                .fetch_optional(&mut *tx)
                .await?;

                match replacement {
                    Some(next_copy) => {
                        Self::transition_copy(
                            &mut tx,
                            next_copy.id,
                            CopyStatus::Available,
                            CopyStatus::Reserved,
                        )
                        .await?;
                        let moved = sqlx::query_as::<_, Reservation>(&format!(
                            "UPDATE reservations SET copy_id = $1 \
                             WHERE id = $2 AND status = $3 RETURNING {}",
                            RESERVATION_COLUMNS
                        ))
                        .bind(next_copy.id)
                        .bind(held.id)
                        .bind(ReservationStatus::Ready)
                        .fetch_one(&mut *tx)
                        .await?;
                        rehomed = Some(moved);
                    }
                    None => {
                        // requested_at is untouched, so FIFO order survives
                        sqlx::query(
                            "UPDATE reservations SET status = $1, copy_id = NULL \
                             WHERE id = $2 AND status = $3",
                        )
                        .bind(ReservationStatus::Waiting)
                        .bind(held.id)
                        .bind(ReservationStatus::Ready)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }

        Self::transition_copy(&mut tx, copy_id, copy.status, to).await?;
        let updated = sqlx::query_as::<_, Copy>(&format!(
            "SELECT {} FROM copies WHERE id = $1",
            COPY_COLUMNS
        ))
        .bind(copy_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(reservation) = &rehomed {
            self.notifications.notify(
                reservation.structure_id,
                reservation.user_id,
                event_codes::RESERVATION_READY,
                format!(
                    "reserved copy {} is ready for pickup",
                    reservation.copy_id.unwrap_or_default()
                ),
            );
        }

        Ok(updated)
    }
}
