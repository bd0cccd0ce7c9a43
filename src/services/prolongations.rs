//! Prolongation (loan extension) workflow.
//!
//! Automatic requests commit immediately once the rules pass; manual
//! requests are created Pending and resolved by explicit approval or
//! denial. Approval locks the loan row in the same transaction as the
//! status flip, so it is indivisible with respect to a concurrent return.

use chrono::{Duration, Utc};
use sqlx::PgConnection;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        enums::event_codes,
        loan::Loan,
        prolongation::{Prolongation, ProlongationKind, ProlongationStatus},
        reservation::ReservationStatus,
    },
    repository::{loans::LOAN_COLUMNS, prolongations::PROLONGATION_COLUMNS, Repository},
};

use super::notifications::NotificationsService;

#[derive(Clone)]
pub struct ProlongationsService {
    repository: Repository,
    notifications: NotificationsService,
    config: CirculationConfig,
}

impl ProlongationsService {
    pub fn new(
        repository: Repository,
        notifications: NotificationsService,
        config: CirculationConfig,
    ) -> Self {
        Self {
            repository,
            notifications,
            config,
        }
    }

    async fn lock_loan(conn: &mut PgConnection, loan_id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1 FOR UPDATE",
            LOAN_COLUMNS
        ))
        .bind(loan_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Request a prolongation of a loan.
    ///
    /// A non-empty reservation queue does not block the request (unless the
    /// automatic-block policy is on); it flags the prolongation
    /// reservation-pending, and the flag is surfaced to the caller.
    pub async fn request(
        &self,
        loan_id: i32,
        user_id: i32,
        kind: ProlongationKind,
    ) -> AppResult<Prolongation> {
        let mut tx = self.repository.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, loan_id).await?;
        if loan.returned_at.is_some() {
            return Err(AppError::Conflict(format!(
                "loan {} is already returned",
                loan_id
            )));
        }
        if loan.user_id != user_id {
            return Err(AppError::Validation(format!(
                "loan {} does not belong to user {}",
                loan_id, user_id
            )));
        }
        if loan.renewal_count >= self.config.max_renewals {
            return Err(AppError::RenewalLimitReached {
                current: loan.renewal_count,
                max: self.config.max_renewals,
            });
        }

        let item_id: i32 = sqlx::query_scalar("SELECT item_id FROM copies WHERE id = $1")
            .bind(loan.copy_id)
            .fetch_one(&mut *tx)
            .await?;
        let reservation_pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reservations WHERE item_id = $1 AND status = $2)",
        )
        .bind(item_id)
        .bind(ReservationStatus::Waiting)
        .fetch_one(&mut *tx)
        .await?;

        if reservation_pending
            && kind == ProlongationKind::Automatic
            && self.config.block_auto_prolongation_on_reservation
        {
            return Err(AppError::Conflict(format!(
                "a reservation is queued on item {}, automatic prolongation is blocked",
                item_id
            )));
        }

        let days_added = self.config.extension_days;
        let prior_due = loan.due_date;
        let new_due = prior_due + Duration::days(days_added);
        let now = Utc::now();

        let prolongation = match kind {
            ProlongationKind::Automatic => {
                // Rule-validated self-service: committed in one step
                let row = sqlx::query_as::<_, Prolongation>(&format!(
                    "INSERT INTO prolongations \
                     (loan_id, user_id, kind, status, requested_at, processed_at, \
                      prior_due_date, new_due_date, days_added, reservation_pending) \
                     VALUES ($1, $2, $8, $9, $3, $3, $4, $5, $6, $7) RETURNING {}",
                    PROLONGATION_COLUMNS
                ))
                .bind(loan_id)
                .bind(user_id)
                .bind(now)
                .bind(prior_due)
                .bind(new_due)
                .bind(days_added as i32)
                .bind(reservation_pending)
                .bind(ProlongationKind::Automatic)
                .bind(ProlongationStatus::Approved)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "UPDATE loans SET due_date = $1, renewal_count = renewal_count + 1 \
                     WHERE id = $2 AND returned_at IS NULL",
                )
                .bind(new_due)
                .bind(loan_id)
                .execute(&mut *tx)
                .await?;
                row
            }
            ProlongationKind::Manual => {
                sqlx::query_as::<_, Prolongation>(&format!(
                    "INSERT INTO prolongations \
                     (loan_id, user_id, kind, status, requested_at, \
                      prior_due_date, new_due_date, days_added, reservation_pending) \
                     VALUES ($1, $2, $8, $9, $3, $4, $5, $6, $7) RETURNING {}",
                    PROLONGATION_COLUMNS
                ))
                .bind(loan_id)
                .bind(user_id)
                .bind(now)
                .bind(prior_due)
                .bind(new_due)
                .bind(days_added as i32)
                .bind(reservation_pending)
                .bind(ProlongationKind::Manual)
                .bind(ProlongationStatus::Pending)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        if prolongation.status == ProlongationStatus::Approved {
            self.notifications.notify(
                loan.structure_id,
                user_id,
                event_codes::PROLONGATION_APPROVED,
                format!("loan {} extended to {}", loan_id, new_due.date_naive()),
            );
        }

        Ok(prolongation)
    }

    /// Approve a pending prolongation: flips the status, records the
    /// processor, and moves the loan's due date — all in one transaction
    /// with the loan row locked.
    pub async fn approve(
        &self,
        id: i32,
        processor_id: i32,
        comment: Option<String>,
    ) -> AppResult<Prolongation> {
        let mut tx = self.repository.pool.begin().await?;

        let prolongation = Self::lock_prolongation(&mut tx, id).await?;
        if !prolongation
            .status
            .can_transition(ProlongationStatus::Approved)
        {
            return Err(AppError::InvalidStateTransition(format!(
                "prolongation {} is already {:?}",
                id, prolongation.status
            )));
        }

        let loan = Self::lock_loan(&mut tx, prolongation.loan_id).await?;
        if loan.returned_at.is_some() {
            return Err(AppError::Conflict(format!(
                "loan {} was returned after the request",
                loan.id
            )));
        }
        if prolongation.new_due_date <= loan.due_date {
            return Err(AppError::Conflict(format!(
                "loan {} due date already moved past the requested extension",
                loan.id
            )));
        }
        if loan.renewal_count >= self.config.max_renewals {
            return Err(AppError::RenewalLimitReached {
                current: loan.renewal_count,
                max: self.config.max_renewals,
            });
        }

        let approved = sqlx::query_as::<_, Prolongation>(&format!(
            "UPDATE prolongations \
             SET status = $4, processed_at = NOW(), processor_id = $1, comment = $2 \
             WHERE id = $3 AND status = $5 RETURNING {}",
            PROLONGATION_COLUMNS
        ))
        .bind(processor_id)
        .bind(&comment)
        .bind(id)
        .bind(ProlongationStatus::Approved)
        .bind(ProlongationStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        let affected = sqlx::query(
            "UPDATE loans SET due_date = $1, renewal_count = renewal_count + 1 \
             WHERE id = $2 AND returned_at IS NULL",
        )
        .bind(approved.new_due_date)
        .bind(loan.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected != 1 {
            return Err(AppError::Conflict(format!(
                "loan {} changed during approval",
                loan.id
            )));
        }

        tx.commit().await?;

        self.notifications.notify(
            loan.structure_id,
            approved.user_id,
            event_codes::PROLONGATION_APPROVED,
            format!(
                "loan {} extended to {}",
                loan.id,
                approved.new_due_date.date_naive()
            ),
        );

        Ok(approved)
    }

    /// Deny a pending prolongation. The loan is never touched.
    pub async fn deny(
        &self,
        id: i32,
        processor_id: i32,
        comment: Option<String>,
    ) -> AppResult<Prolongation> {
        let mut tx = self.repository.pool.begin().await?;

        let prolongation = Self::lock_prolongation(&mut tx, id).await?;
        if !prolongation.status.can_transition(ProlongationStatus::Denied) {
            return Err(AppError::InvalidStateTransition(format!(
                "prolongation {} is already {:?}",
                id, prolongation.status
            )));
        }

        let denied = sqlx::query_as::<_, Prolongation>(&format!(
            "UPDATE prolongations \
             SET status = $4, processed_at = NOW(), processor_id = $1, comment = $2 \
             WHERE id = $3 AND status = $5 RETURNING {}",
            PROLONGATION_COLUMNS
        ))
        .bind(processor_id)
        .bind(&comment)
        .bind(id)
        .bind(ProlongationStatus::Denied)
        .bind(ProlongationStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        let structure_id: i32 = sqlx::query_scalar("SELECT structure_id FROM loans WHERE id = $1")
            .bind(denied.loan_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        self.notifications.notify(
            structure_id,
            denied.user_id,
            event_codes::PROLONGATION_DENIED,
            format!("prolongation of loan {} was denied", denied.loan_id),
        );

        Ok(denied)
    }

    async fn lock_prolongation(conn: &mut PgConnection, id: i32) -> AppResult<Prolongation> {
        sqlx::query_as::<_, Prolongation>(&format!(
            "SELECT {} FROM prolongations WHERE id = $1 FOR UPDATE",
            PROLONGATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prolongation with id {} not found", id)))
    }

    /// Get prolongation by ID
    pub async fn get(&self, id: i32) -> AppResult<Prolongation> {
        self.repository.prolongations.get_by_id(id).await
    }

    /// Prolongation history of a loan
    pub async fn list_by_loan(&self, loan_id: i32) -> AppResult<Vec<Prolongation>> {
        self.repository.prolongations.list_by_loan(loan_id).await
    }

    /// Pending manual requests awaiting review
    pub async fn list_pending(&self) -> AppResult<Vec<Prolongation>> {
        self.repository.prolongations.list_pending().await
    }
}
