//! Minimal catalog item reference.
//!
//! The catalog proper is an external collaborator; the engine only needs the
//! module and genre of a parent item to register copies and enforce limits.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::Module;

/// Catalog item lookup row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ItemRef {
    pub id: i32,
    pub module: Module,
    pub genre_id: i16,
    pub genre_name: Option<String>,
    pub title: String,
}
