//! Repository layer for database operations

pub mod barcode_lots;
pub mod catalog;
pub mod connectors;
pub mod copies;
pub mod genre_limits;
pub mod loans;
pub mod prolongations;
pub mod reservations;

use sqlx::{Pool, Postgres};

/// Advisory lock key from a lock class and two ids. Collisions only
/// over-serialize, they never break mutual exclusion.
pub(crate) fn advisory_key(class: u8, a: i32, b: i32) -> i64 {
    ((class as i64) << 56) ^ ((a as i64) << 24) ^ (b as i64)
}

/// Lock class for the per-(user, genre) cap critical section
pub(crate) const LOCK_CLASS_USER_GENRE: u8 = 1;
/// Lock class for per-item sequence assignment
pub(crate) const LOCK_CLASS_ITEM_SEQUENCE: u8 = 2;
/// Lock class for lot-range allocation per namespace
pub(crate) const LOCK_CLASS_LOT_NAMESPACE: u8 = 3;
/// Lock class for barcode collision checks per namespace
pub(crate) const LOCK_CLASS_BARCODE: u8 = 4;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub catalog: catalog::CatalogRepository,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub reservations: reservations::ReservationsRepository,
    pub prolongations: prolongations::ProlongationsRepository,
    pub genre_limits: genre_limits::GenreLimitsRepository,
    pub connectors: connectors::ConnectorsRepository,
    pub barcode_lots: barcode_lots::BarcodeLotsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            catalog: catalog::CatalogRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            prolongations: prolongations::ProlongationsRepository::new(pool.clone()),
            genre_limits: genre_limits::GenreLimitsRepository::new(pool.clone()),
            connectors: connectors::ConnectorsRepository::new(pool.clone()),
            barcode_lots: barcode_lots::BarcodeLotsRepository::new(pool.clone()),
            pool,
        }
    }
}
