//! Copy registry service: registration and lookup of physical copies

use std::hash::{Hash, Hasher};

use sqlx::Row;

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::{Copy, CopyCondition, CopyStatus, CreateCopy},
        item::ItemRef,
    },
    repository::{
        advisory_key,
        barcode_lots::NamespaceScope,
        copies::COPY_COLUMNS,
        Repository, LOCK_CLASS_BARCODE, LOCK_CLASS_ITEM_SEQUENCE,
    },
};

/// Collision predicate for a barcode, per namespace scope. The group scope
/// compares group ids, not structure ids; ungrouped copies (NULL group)
/// share one namespace.
fn collision_query(scope: NamespaceScope) -> &'static str {
    match scope {
        NamespaceScope::Global => "SELECT EXISTS(SELECT 1 FROM copies WHERE barcode = $1)",
        NamespaceScope::Structure => {
            "SELECT EXISTS(SELECT 1 FROM copies WHERE barcode = $1 AND structure_id = $2)"
        }
        NamespaceScope::Group => {
            "SELECT EXISTS(SELECT 1 FROM copies \
             WHERE barcode = $1 AND group_id IS NOT DISTINCT FROM $2)"
        }
    }
}

/// Stable lock id for a barcode string
fn barcode_lock_id(code: &str) -> i32 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    code.hash(&mut hasher);
    hasher.finish() as i32
}

#[derive(Clone)]
pub struct RegistryService {
    repository: Repository,
    barcode_scope: NamespaceScope,
}

impl RegistryService {
    pub fn new(repository: Repository, barcode_scope: NamespaceScope) -> Self {
        Self {
            repository,
            barcode_scope,
        }
    }

    /// Register a new copy of an item.
    ///
    /// The sequence number is max(item) + 1, computed under a per-item
    /// advisory lock. The barcode is either supplied manually (checked for
    /// collision within the namespace scope) or drawn from a lot. A code
    /// drawn from a lot stays consumed even if the insert fails afterwards.
    pub async fn register_copy(&self, item_id: i32, req: CreateCopy) -> AppResult<Copy> {
        let item: ItemRef = self.repository.catalog.get_item(item_id).await?;

        let barcode = match (&req.barcode, req.lot_id) {
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "barcode and lot_id are mutually exclusive".to_string(),
                ))
            }
            (Some(code), None) => Some(code.clone()),
            (None, Some(lot_id)) => Some(self.repository.barcode_lots.assign_next(lot_id).await?),
            (None, None) => None,
        };

        let mut tx = self.repository.pool.begin().await?;

        // Serialize sequence assignment per item
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(advisory_key(LOCK_CLASS_ITEM_SEQUENCE, item_id, 0))
            .execute(&mut *tx)
            .await?;

        let sequence: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(sequence), 0) + 1 FROM copies WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await?;

        if let Some(code) = &barcode {
            // Serialize check-then-insert per barcode namespace so two
            // concurrent registrations of the same code cannot both pass
            let namespace_id = match self.barcode_scope {
                NamespaceScope::Global => 0,
                NamespaceScope::Structure => req.structure_id,
                NamespaceScope::Group => req.group_id.unwrap_or(0),
            };
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(advisory_key(
                    LOCK_CLASS_BARCODE,
                    barcode_lock_id(code),
                    namespace_id,
                ))
                .execute(&mut *tx)
                .await?;

            let mut exists = sqlx::query(collision_query(self.barcode_scope)).bind(code);
            exists = match self.barcode_scope {
                NamespaceScope::Global => exists,
                NamespaceScope::Structure => exists.bind(req.structure_id),
                NamespaceScope::Group => exists.bind(req.group_id),
            };
            let collides: bool = exists.fetch_one(&mut *tx).await?.get(0);
            if collides {
                return Err(AppError::DuplicateBarcode(code.clone()));
            }
        }

        let copy = sqlx::query_as::<_, Copy>(&format!(
            "INSERT INTO copies \
             (item_id, module, structure_id, group_id, barcode, condition, location, \
              acquisition_price, acquisition_date, status, sequence) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {}",
            COPY_COLUMNS
        ))
        .bind(item_id)
        .bind(item.module)
        .bind(req.structure_id)
        .bind(req.group_id)
        .bind(&barcode)
        .bind(req.condition.unwrap_or(CopyCondition::Good))
        .bind(&req.location)
        .bind(req.acquisition_price)
        .bind(req.acquisition_date)
        .bind(CopyStatus::Available)
        .bind(sequence)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(copy)
    }

    /// Find a copy by its barcode
    pub async fn find_by_barcode(&self, code: &str) -> AppResult<Copy> {
        self.repository.copies.get_by_barcode(code).await
    }

    /// Available copies of an item, sequence ascending
    pub async fn list_available(&self, item_id: i32) -> AppResult<Vec<Copy>> {
        self.repository.copies.list_available(item_id).await
    }

    /// All copies of an item, sequence ascending
    pub async fn list_by_item(&self, item_id: i32) -> AppResult<Vec<Copy>> {
        self.repository.copies.list_by_item(item_id).await
    }

    /// Get a copy by id
    pub async fn get(&self, copy_id: i32) -> AppResult<Copy> {
        self.repository.copies.get_by_id(copy_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_checks_barcode_alone() {
        let sql = collision_query(NamespaceScope::Global);
        assert!(!sql.contains("structure_id"));
        assert!(!sql.contains("group_id"));
    }

    #[test]
    fn structure_scope_compares_structures() {
        let sql = collision_query(NamespaceScope::Structure);
        assert!(sql.contains("structure_id"));
        assert!(!sql.contains("group_id"));
    }

    #[test]
    fn group_scope_compares_groups_not_structures() {
        let sql = collision_query(NamespaceScope::Group);
        assert!(sql.contains("group_id"));
        assert!(!sql.contains("structure_id"));
    }

    #[test]
    fn barcode_lock_id_is_stable() {
        assert_eq!(barcode_lock_id("G000000042"), barcode_lock_id("G000000042"));
    }
}
