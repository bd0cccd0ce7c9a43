//! Per-genre borrowing/reservation caps

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{LimitKind, Module};

/// Genre limit row.
///
/// `structure_id = None` is the global default layer; a structure-specific
/// row overlays it. At most one active row exists per
/// (scope, module, genre, kind).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GenreLimit {
    pub id: i32,
    pub kind: LimitKind,
    pub structure_id: Option<i32>,
    pub module: Module,
    pub genre_id: i16,
    /// Cached display name, refreshed from the catalog on write
    pub genre_name: Option<String>,
    pub max_count: i16,
    pub is_active: bool,
}

/// Upsert genre limit request
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertGenreLimit {
    pub kind: LimitKind,
    pub structure_id: Option<i32>,
    pub module: Module,
    pub genre_id: i16,
    #[validate(length(max = 64))]
    pub genre_name: Option<String>,
    #[validate(range(min = 0, max = 500))]
    pub max_count: i16,
    pub is_active: bool,
}

/// Resolve the applicable cap: structure row over global row over the
/// configured default ceiling.
pub fn resolve_max(
    structure_row: Option<&GenreLimit>,
    global_row: Option<&GenreLimit>,
    default_max: i16,
) -> i16 {
    structure_row
        .or(global_row)
        .map(|l| l.max_count)
        .unwrap_or(default_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(structure_id: Option<i32>, max_count: i16) -> GenreLimit {
        GenreLimit {
            id: 1,
            kind: LimitKind::Borrowing,
            structure_id,
            module: Module::Game,
            genre_id: 7,
            genre_name: Some("strategy".into()),
            max_count,
            is_active: true,
        }
    }

    #[test]
    fn structure_row_wins_over_global() {
        let s = row(Some(4), 3);
        let g = row(None, 8);
        assert_eq!(resolve_max(Some(&s), Some(&g), 5), 3);
    }

    #[test]
    fn global_row_wins_over_default() {
        let g = row(None, 8);
        assert_eq!(resolve_max(None, Some(&g), 5), 8);
    }

    #[test]
    fn default_applies_when_no_row_matches() {
        assert_eq!(resolve_max(None, None, 5), 5);
    }
}
