//! Data models for the Rotonde circulation engine

pub mod barcode_lot;
pub mod connector;
pub mod copy;
pub mod enums;
pub mod genre_limit;
pub mod item;
pub mod loan;
pub mod prolongation;
pub mod reservation;

// Re-export commonly used types
pub use barcode_lot::{BarcodeLot, LotStatus};
pub use connector::{CategoryOverride, Connector, EventOverride};
pub use copy::{Copy, CopyStatus};
pub use enums::{Channel, EventCategory, LimitKind, Module};
pub use genre_limit::GenreLimit;
pub use item::ItemRef;
pub use loan::Loan;
pub use prolongation::{Prolongation, ProlongationKind, ProlongationStatus};
pub use reservation::{Reservation, ReservationStatus};
