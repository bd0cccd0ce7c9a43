//! Prolongation (loan extension request) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// How a prolongation was requested
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum ProlongationKind {
    /// Self-service, rule-validated, committed immediately
    Automatic = 0,
    /// Staff-reviewed, created pending
    Manual = 1,
}

impl From<i16> for ProlongationKind {
    fn from(v: i16) -> Self {
        match v {
            1 => ProlongationKind::Manual,
            _ => ProlongationKind::Automatic,
        }
    }
}

impl From<ProlongationKind> for i16 {
    fn from(k: ProlongationKind) -> Self {
        k as i16
    }
}

/// Prolongation status; Approved and Denied are terminal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum ProlongationStatus {
    Pending = 0,
    Approved = 1,
    Denied = 2,
}

impl ProlongationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProlongationStatus::Approved | ProlongationStatus::Denied)
    }

    /// Only Pending -> Approved and Pending -> Denied are legal
    pub fn can_transition(&self, to: ProlongationStatus) -> bool {
        matches!(
            (*self, to),
            (ProlongationStatus::Pending, ProlongationStatus::Approved)
                | (ProlongationStatus::Pending, ProlongationStatus::Denied)
        )
    }
}

impl From<i16> for ProlongationStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ProlongationStatus::Approved,
            2 => ProlongationStatus::Denied,
            _ => ProlongationStatus::Pending,
        }
    }
}

impl From<ProlongationStatus> for i16 {
    fn from(s: ProlongationStatus) -> Self {
        s as i16
    }
}

/// Prolongation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Prolongation {
    pub id: i32,
    pub loan_id: i32,
    pub user_id: i32,
    pub kind: ProlongationKind,
    pub status: ProlongationStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub prior_due_date: DateTime<Utc>,
    /// Strictly after `prior_due_date`
    pub new_due_date: DateTime<Utc>,
    pub days_added: i32,
    /// A reservation was queued on the item at request time
    pub reservation_pending: bool,
    pub processor_id: Option<i32>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::ProlongationStatus::*;

    #[test]
    fn pending_resolves_both_ways() {
        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Denied));
    }

    #[test]
    fn terminal_states_never_transition() {
        for from in [Approved, Denied] {
            assert!(from.is_terminal());
            for to in [Pending, Approved, Denied] {
                assert!(!from.can_transition(to));
            }
        }
        assert!(!Pending.can_transition(Pending));
    }
}
