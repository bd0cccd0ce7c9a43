//! Copy (physical lendable unit) model and status machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::Module;

/// Copy circulation status.
///
/// One exhaustively matched enum carries both the predicates and the
/// transition table; there are no independent boolean status fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum CopyStatus {
    Available = 0,
    Reserved = 1,
    Borrowed = 2,
    Maintenance = 3,
    Lost = 4,
    Archived = 5,
}

impl CopyStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, CopyStatus::Available)
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, CopyStatus::Borrowed)
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, CopyStatus::Reserved)
    }

    /// Archived copies never leave that state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CopyStatus::Archived)
    }

    /// Whether `self -> to` is a legal circulation transition.
    ///
    /// Checkout, return and reservation moves are listed explicitly;
    /// Maintenance, Lost and Archived are reachable administratively from any
    /// non-archived state, and Maintenance/Lost can be restored to Available.
    pub fn can_transition(&self, to: CopyStatus) -> bool {
        use CopyStatus::*;
        match (*self, to) {
            // checkout / reservation pickup
            (Available, Borrowed) | (Reserved, Borrowed) => true,
            // return, with or without a queued reservation
            (Borrowed, Available) | (Borrowed, Reserved) => true,
            // reservation placed against an on-shelf copy
            (Available, Reserved) => true,
            // administrative restore
            (Maintenance, Available) | (Lost, Available) => true,
            // administrative moves out of any non-archived state
            (Archived, _) => false,
            (from, Maintenance) | (from, Lost) | (from, Archived) => from != to,
            _ => false,
        }
    }
}

impl From<i16> for CopyStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => CopyStatus::Reserved,
            2 => CopyStatus::Borrowed,
            3 => CopyStatus::Maintenance,
            4 => CopyStatus::Lost,
            5 => CopyStatus::Archived,
            _ => CopyStatus::Available,
        }
    }
}

impl From<CopyStatus> for i16 {
    fn from(s: CopyStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CopyStatus::Available => "Available",
            CopyStatus::Reserved => "Reserved",
            CopyStatus::Borrowed => "Borrowed",
            CopyStatus::Maintenance => "Maintenance",
            CopyStatus::Lost => "Lost",
            CopyStatus::Archived => "Archived",
        };
        write!(f, "{}", label)
    }
}

/// Copy condition grading
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum CopyCondition {
    New = 0,
    Good = 1,
    Worn = 2,
    Damaged = 3,
}

impl From<i16> for CopyCondition {
    fn from(v: i16) -> Self {
        match v {
            0 => CopyCondition::New,
            2 => CopyCondition::Worn,
            3 => CopyCondition::Damaged,
            _ => CopyCondition::Good,
        }
    }
}

impl From<CopyCondition> for i16 {
    fn from(c: CopyCondition) -> Self {
        c as i16
    }
}

/// Full copy model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Copy {
    pub id: i32,
    pub item_id: i32,
    pub module: Module,
    pub structure_id: i32,
    /// Collection group, relevant when the barcode namespace is group-scoped
    pub group_id: Option<i32>,
    pub barcode: Option<String>,
    pub condition: CopyCondition,
    pub location: Option<String>,
    #[schema(value_type = Option<String>)]
    pub acquisition_price: Option<Decimal>,
    pub acquisition_date: Option<NaiveDate>,
    pub status: CopyStatus,
    /// Strictly increasing per parent item
    pub sequence: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register copy request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateCopy {
    pub structure_id: i32,
    pub group_id: Option<i32>,
    /// Manually supplied barcode; must not collide within the namespace scope
    #[validate(length(min = 1, max = 32))]
    pub barcode: Option<String>,
    /// Draw the barcode from this lot instead of supplying one
    pub lot_id: Option<i32>,
    pub condition: Option<CopyCondition>,
    #[validate(length(max = 64))]
    pub location: Option<String>,
    #[schema(value_type = Option<String>)]
    pub acquisition_price: Option<Decimal>,
    pub acquisition_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::CopyStatus::*;
    use super::*;

    #[test]
    fn circulation_transitions_are_reachable() {
        assert!(Available.can_transition(Borrowed));
        assert!(Available.can_transition(Reserved));
        assert!(Reserved.can_transition(Borrowed));
        assert!(Borrowed.can_transition(Available));
        assert!(Borrowed.can_transition(Reserved));
    }

    #[test]
    fn administrative_transitions() {
        for from in [Available, Reserved, Borrowed, Maintenance, Lost] {
            for to in [Maintenance, Lost, Archived] {
                if from != to {
                    assert!(from.can_transition(to), "{from} -> {to}");
                }
            }
        }
        assert!(Maintenance.can_transition(Available));
        assert!(Lost.can_transition(Available));
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(!Available.can_transition(Available));
        assert!(!Reserved.can_transition(Available));
        assert!(!Borrowed.can_transition(Borrowed));
        assert!(!Maintenance.can_transition(Borrowed));
        assert!(!Lost.can_transition(Reserved));
    }

    #[test]
    fn archived_is_terminal() {
        for to in [Available, Reserved, Borrowed, Maintenance, Lost, Archived] {
            assert!(!Archived.can_transition(to));
        }
        assert!(Archived.is_terminal());
    }

    #[test]
    fn predicates_match_variants() {
        assert!(Available.is_available());
        assert!(Borrowed.is_borrowed());
        assert!(Reserved.is_reserved());
        assert!(!Maintenance.is_available());
    }
}
