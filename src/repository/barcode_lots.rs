//! Barcode lots repository: issuing, sequential assignment, cancellation

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        barcode_lot::{format_code, BarcodeLot, IssueLot, LotStatus},
        enums::Module,
    },
};

const LOT_COLUMNS: &str = "id, module, structure_id, group_id, quantity, start_code, end_code, \
     used, cancelled, reprints, status, created_by, created_at";

/// Scope within which lot code ranges are unique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceScope {
    Global,
    Structure,
    Group,
}

impl NamespaceScope {
    pub fn parse(s: &str) -> NamespaceScope {
        match s {
            "structure" => NamespaceScope::Structure,
            "group" => NamespaceScope::Group,
            _ => NamespaceScope::Global,
        }
    }
}

use super::{advisory_key, LOCK_CLASS_LOT_NAMESPACE};

#[derive(Clone)]
pub struct BarcodeLotsRepository {
    pool: Pool<Postgres>,
}

impl BarcodeLotsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get lot by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BarcodeLot> {
        sqlx::query_as::<_, BarcodeLot>(&format!(
            "SELECT {} FROM barcode_lots WHERE id = $1",
            LOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Barcode lot with id {} not found", id)))
    }

    /// List lots, newest first
    pub async fn list(&self) -> AppResult<Vec<BarcodeLot>> {
        let rows = sqlx::query_as::<_, BarcodeLot>(&format!(
            "SELECT {} FROM barcode_lots ORDER BY created_at DESC",
            LOT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Reserve a contiguous code range unique within the namespace scope and
    /// persist the lot as active.
    pub async fn issue(
        &self,
        req: &IssueLot,
        scope: NamespaceScope,
        creator_id: i32,
    ) -> AppResult<BarcodeLot> {
        let mut tx = self.pool.begin().await?;

        // Serialize range allocation within the namespace
        let scope_id = match scope {
            NamespaceScope::Global => 0,
            NamespaceScope::Structure => req.structure_id.unwrap_or(0),
            NamespaceScope::Group => req.group_id.unwrap_or(0),
        };
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(advisory_key(
                LOCK_CLASS_LOT_NAMESPACE,
                i16::from(req.module) as i32,
                scope_id,
            ))
            .execute(&mut *tx)
            .await?;

        let range_query = match scope {
            NamespaceScope::Global => {
                "SELECT COALESCE(MAX(end_code), 0) FROM barcode_lots WHERE module = $1"
            }
            NamespaceScope::Structure => {
                "SELECT COALESCE(MAX(end_code), 0) FROM barcode_lots \
                 WHERE module = $1 AND structure_id IS NOT DISTINCT FROM $2"
            }
            NamespaceScope::Group => {
                "SELECT COALESCE(MAX(end_code), 0) FROM barcode_lots \
                 WHERE module = $1 AND group_id IS NOT DISTINCT FROM $2"
            }
        };
        let mut range = sqlx::query_scalar::<_, i64>(range_query).bind(req.module);
        if scope != NamespaceScope::Global {
            range = range.bind(match scope {
                NamespaceScope::Structure => req.structure_id,
                _ => req.group_id,
            });
        }
        let max_end: i64 = range.fetch_one(&mut *tx).await?;

        let start_code = max_end + 1;
        let end_code = start_code + req.quantity as i64 - 1;

        let lot = sqlx::query_as::<_, BarcodeLot>(&format!(
            "INSERT INTO barcode_lots \
             (module, structure_id, group_id, quantity, start_code, end_code, \
              used, cancelled, reprints, status, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, 0, 0, $7, $8) \
             RETURNING {}",
            LOT_COLUMNS
        ))
        .bind(req.module)
        .bind(req.structure_id)
        .bind(req.group_id)
        .bind(req.quantity)
        .bind(start_code)
        .bind(end_code)
        .bind(LotStatus::Active)
        .bind(creator_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(lot)
    }

    /// Hand out the next unused code as a single atomic increment-and-fetch.
    /// The lot auto-completes on the assignment that exhausts it.
    pub async fn assign_next(&self, lot_id: i32) -> AppResult<String> {
        let row = sqlx::query(
            "UPDATE barcode_lots \
             SET used = used + 1, \
                 status = CASE WHEN used + 1 >= quantity THEN $2 ELSE status END \
             WHERE id = $1 AND status = $3 AND used < quantity \
             RETURNING start_code + used - 1 AS code, module",
        )
        .bind(lot_id)
        .bind(LotStatus::Complete)
        .bind(LotStatus::Active)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let code: i64 = row.get("code");
                let module: Module = row.get("module");
                Ok(format_code(module, code))
            }
            None => {
                // Distinguish a missing lot from a non-assignable one
                let lot = self.get_by_id(lot_id).await?;
                Err(AppError::LotExhausted(format!(
                    "lot {} is {:?} with {}/{} codes used",
                    lot.id, lot.status, lot.used, lot.quantity
                )))
            }
        }
    }

    /// Cancel a lot; the unused remainder is marked cancelled. Only legal
    /// while the lot is active and not exhausted.
    pub async fn cancel(&self, lot_id: i32) -> AppResult<BarcodeLot> {
        let row = sqlx::query_as::<_, BarcodeLot>(&format!(
            "UPDATE barcode_lots \
             SET cancelled = quantity - used, status = $2 \
             WHERE id = $1 AND status = $3 AND used < quantity \
             RETURNING {}",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .bind(LotStatus::Cancelled)
        .bind(LotStatus::Active)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(lot) => Ok(lot),
            None => {
                let lot = self.get_by_id(lot_id).await?;
                debug_assert!(!matches!(lot.status, LotStatus::Active) || lot.used >= lot.quantity);
                Err(AppError::InvalidStateTransition(format!(
                    "lot {} cannot be cancelled while {:?}",
                    lot.id, lot.status
                )))
            }
        }
    }
}
