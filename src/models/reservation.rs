//! Reservation (queued claim on an item) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Reservation status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum ReservationStatus {
    /// In the FIFO queue, no copy held yet
    Waiting = 0,
    /// A copy is held for pickup
    Ready = 1,
    Fulfilled = 2,
    Cancelled = 3,
}

impl ReservationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Waiting | ReservationStatus::Ready)
    }
}

impl From<i16> for ReservationStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ReservationStatus::Ready,
            2 => ReservationStatus::Fulfilled,
            3 => ReservationStatus::Cancelled,
            _ => ReservationStatus::Waiting,
        }
    }
}

impl From<ReservationStatus> for i16 {
    fn from(s: ReservationStatus) -> Self {
        s as i16
    }
}

/// Reservation model from database.
///
/// Queue ordering is strictly FIFO by `requested_at`, id as tiebreaker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub item_id: i32,
    pub user_id: i32,
    pub structure_id: i32,
    pub requested_at: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Copy held for pickup while Ready
    pub copy_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::ReservationStatus::*;
    use super::*;

    #[test]
    fn active_means_waiting_or_ready() {
        assert!(Waiting.is_active());
        assert!(Ready.is_active());
        assert!(!Fulfilled.is_active());
        assert!(!Cancelled.is_active());
    }

    // The stored values are load-bearing: queries bind the enum directly,
    // and existing rows encode these exact numbers
    #[test]
    fn stored_values_round_trip() {
        for status in [Waiting, Ready, Fulfilled, Cancelled] {
            assert_eq!(ReservationStatus::from(i16::from(status)), status);
        }
        assert_eq!(i16::from(Waiting), 0);
        assert_eq!(i16::from(Ready), 1);
        assert_eq!(i16::from(Fulfilled), 2);
        assert_eq!(i16::from(Cancelled), 3);
    }
}
