//! Shared domain enums for the circulation engine

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// Collection module a copy belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum Module {
    Book = 0,
    Game = 1,
    Film = 2,
    Disc = 3,
}

impl Module {
    /// Single-letter prefix used when formatting barcode lot codes
    pub fn code_prefix(&self) -> char {
        match self {
            Module::Book => 'B',
            Module::Game => 'G',
            Module::Film => 'F',
            Module::Disc => 'D',
        }
    }
}

impl From<i16> for Module {
    fn from(v: i16) -> Self {
        match v {
            1 => Module::Game,
            2 => Module::Film,
            3 => Module::Disc,
            _ => Module::Book,
        }
    }
}

impl From<Module> for i16 {
    fn from(m: Module) -> Self {
        m as i16
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Module::Book => "Book",
            Module::Game => "Game",
            Module::Film => "Film",
            Module::Disc => "Disc",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Outbound notification channel
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum Channel {
    Email = 0,
    Sms = 1,
}

impl From<i16> for Channel {
    fn from(v: i16) -> Self {
        match v {
            1 => Channel::Sms,
            _ => Channel::Email,
        }
    }
}

impl From<Channel> for i16 {
    fn from(c: Channel) -> Self {
        c as i16
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// EventCategory
// ---------------------------------------------------------------------------

/// Notification event categories grouping individual event codes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum EventCategory {
    Circulation = 0,
    Reservation = 1,
    Prolongation = 2,
}

impl From<i16> for EventCategory {
    fn from(v: i16) -> Self {
        match v {
            1 => EventCategory::Reservation,
            2 => EventCategory::Prolongation,
            _ => EventCategory::Circulation,
        }
    }
}

impl From<EventCategory> for i16 {
    fn from(c: EventCategory) -> Self {
        c as i16
    }
}

/// Well-known circulation event codes
pub mod event_codes {
    pub const LOAN_CHECKOUT: &str = "loan.checkout";
    pub const LOAN_RETURN: &str = "loan.return";
    pub const RESERVATION_READY: &str = "reservation.ready";
    pub const PROLONGATION_APPROVED: &str = "prolongation.approved";
    pub const PROLONGATION_DENIED: &str = "prolongation.denied";
}

/// Category an event code belongs to
pub fn category_of(event_code: &str) -> EventCategory {
    match event_code.split('.').next() {
        Some("reservation") => EventCategory::Reservation,
        Some("prolongation") => EventCategory::Prolongation,
        _ => EventCategory::Circulation,
    }
}

// ---------------------------------------------------------------------------
// LimitKind
// ---------------------------------------------------------------------------

/// Which activity a genre limit caps
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[repr(i16)]
pub enum LimitKind {
    Borrowing = 0,
    Reservation = 1,
}

impl From<i16> for LimitKind {
    fn from(v: i16) -> Self {
        match v {
            1 => LimitKind::Reservation,
            _ => LimitKind::Borrowing,
        }
    }
}

impl From<LimitKind> for i16 {
    fn from(k: LimitKind) -> Self {
        k as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_codes_map_to_categories() {
        assert_eq!(
            category_of(event_codes::LOAN_CHECKOUT),
            EventCategory::Circulation
        );
        assert_eq!(
            category_of(event_codes::RESERVATION_READY),
            EventCategory::Reservation
        );
        assert_eq!(
            category_of(event_codes::PROLONGATION_DENIED),
            EventCategory::Prolongation
        );
    }
}
