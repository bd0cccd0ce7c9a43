//! Genre limit endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        enums::{LimitKind, Module},
        genre_limit::{GenreLimit, UpsertGenreLimit},
    },
    services::limits::LimitCheck,
};

/// Standalone limit check request
#[derive(Deserialize, ToSchema)]
pub struct CheckLimitRequest {
    pub user_id: i32,
    pub structure_id: i32,
    pub module: Module,
    pub genre_id: i16,
    pub kind: LimitKind,
}

/// Upsert a genre limit row (structure-scoped or global)
#[utoipa::path(
    put,
    path = "/limits",
    tag = "limits",
    request_body = UpsertGenreLimit,
    responses(
        (status = 200, description = "Limit row upserted", body = GenreLimit),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn upsert_limit(
    State(state): State<crate::AppState>,
    Json(request): Json<UpsertGenreLimit>,
) -> AppResult<Json<GenreLimit>> {
    request.validate()?;

    let limit = state.services.limits.upsert(request).await?;
    Ok(Json(limit))
}

/// Active limit rows visible to a structure (own layer plus global)
#[utoipa::path(
    get,
    path = "/structures/{id}/limits",
    tag = "limits",
    params(
        ("id" = i32, Path, description = "Structure ID")
    ),
    responses(
        (status = 200, description = "Limit rows", body = Vec<GenreLimit>)
    )
)]
pub async fn list_structure_limits(
    State(state): State<crate::AppState>,
    Path(structure_id): Path<i32>,
) -> AppResult<Json<Vec<GenreLimit>>> {
    let limits = state.services.limits.list_for_structure(structure_id).await?;
    Ok(Json(limits))
}

/// Check whether one more loan/reservation would fit under the cap
#[utoipa::path(
    post,
    path = "/limits/check",
    tag = "limits",
    request_body = CheckLimitRequest,
    responses(
        (status = 200, description = "Within the cap; current standing returned", body = LimitCheck),
        (status = 422, description = "Cap would be exceeded")
    )
)]
pub async fn check_limit(
    State(state): State<crate::AppState>,
    Json(request): Json<CheckLimitRequest>,
) -> AppResult<Json<LimitCheck>> {
    let check = state
        .services
        .limits
        .check_limit(
            request.user_id,
            request.structure_id,
            request.module,
            request.genre_id,
            request.kind,
        )
        .await?;
    Ok(Json(check))
}
