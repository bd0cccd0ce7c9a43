//! Barcode lot (pre-issued identifier batch) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::Module;

/// Lot status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum LotStatus {
    Active = 0,
    Cancelled = 1,
    Complete = 2,
}

impl LotStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, LotStatus::Active)
    }
}

impl From<i16> for LotStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LotStatus::Cancelled,
            2 => LotStatus::Complete,
            _ => LotStatus::Active,
        }
    }
}

impl From<LotStatus> for i16 {
    fn from(s: LotStatus) -> Self {
        s as i16
    }
}

/// Barcode lot model from database.
///
/// Invariants: used + cancelled <= quantity; status flips to Complete exactly
/// when used reaches quantity while Active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BarcodeLot {
    pub id: i32,
    pub module: Module,
    pub structure_id: Option<i32>,
    pub group_id: Option<i32>,
    pub quantity: i32,
    pub start_code: i64,
    pub end_code: i64,
    pub used: i32,
    pub cancelled: i32,
    pub reprints: i32,
    pub status: LotStatus,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

impl BarcodeLot {
    pub fn remaining(&self) -> i32 {
        self.quantity - self.used
    }
}

/// Issue lot request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct IssueLot {
    pub module: Module,
    #[validate(range(min = 1, max = 100_000))]
    pub quantity: i32,
    pub structure_id: Option<i32>,
    pub group_id: Option<i32>,
}

/// Render a numeric lot code as a barcode string: module prefix plus a
/// zero-padded nine-digit number.
pub fn format_code(module: Module, code: i64) -> String {
    format!("{}{:09}", module.code_prefix(), code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_prefixed_and_padded() {
        assert_eq!(format_code(Module::Game, 42), "G000000042");
        assert_eq!(format_code(Module::Book, 123_456_789), "B123456789");
    }

    #[test]
    fn consecutive_codes_sort_lexicographically() {
        let a = format_code(Module::Disc, 99);
        let b = format_code(Module::Disc, 100);
        assert!(a < b);
    }
}
