//! Barcode lot endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        barcode_lot::{BarcodeLot, IssueLot},
        enums::Module,
    },
};

/// Issue lot request
#[derive(Deserialize, ToSchema)]
pub struct IssueLotRequest {
    pub module: Module,
    pub quantity: i32,
    pub structure_id: Option<i32>,
    pub group_id: Option<i32>,
    /// Staff member issuing the lot
    pub created_by: i32,
}

/// Assigned code response
#[derive(Serialize, ToSchema)]
pub struct AssignedCode {
    pub lot_id: i32,
    pub barcode: String,
}

/// Issue a new barcode lot
#[utoipa::path(
    post,
    path = "/lots",
    tag = "lots",
    request_body = IssueLotRequest,
    responses(
        (status = 201, description = "Lot issued with a fresh code range", body = BarcodeLot),
        (status = 400, description = "Invalid quantity")
    )
)]
pub async fn issue_lot(
    State(state): State<crate::AppState>,
    Json(request): Json<IssueLotRequest>,
) -> AppResult<(StatusCode, Json<BarcodeLot>)> {
    let issue = IssueLot {
        module: request.module,
        quantity: request.quantity,
        structure_id: request.structure_id,
        group_id: request.group_id,
    };
    issue.validate()?;

    let lot = state.services.lots.issue(issue, request.created_by).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// List lots, newest first
#[utoipa::path(
    get,
    path = "/lots",
    tag = "lots",
    responses(
        (status = 200, description = "All lots", body = Vec<BarcodeLot>)
    )
)]
pub async fn list_lots(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<BarcodeLot>>> {
    let lots = state.services.lots.list().await?;
    Ok(Json(lots))
}

/// Get a lot by ID
#[utoipa::path(
    get,
    path = "/lots/{id}",
    tag = "lots",
    params(
        ("id" = i32, Path, description = "Lot ID")
    ),
    responses(
        (status = 200, description = "The lot", body = BarcodeLot),
        (status = 404, description = "Lot not found")
    )
)]
pub async fn get_lot(
    State(state): State<crate::AppState>,
    Path(lot_id): Path<i32>,
) -> AppResult<Json<BarcodeLot>> {
    let lot = state.services.lots.get(lot_id).await?;
    Ok(Json(lot))
}

/// Draw the next unused code from a lot
#[utoipa::path(
    post,
    path = "/lots/{id}/assign",
    tag = "lots",
    params(
        ("id" = i32, Path, description = "Lot ID")
    ),
    responses(
        (status = 200, description = "Code assigned", body = AssignedCode),
        (status = 404, description = "Lot not found"),
        (status = 409, description = "Lot exhausted or not active")
    )
)]
pub async fn assign_next(
    State(state): State<crate::AppState>,
    Path(lot_id): Path<i32>,
) -> AppResult<Json<AssignedCode>> {
    let barcode = state.services.lots.assign_next(lot_id).await?;
    Ok(Json(AssignedCode { lot_id, barcode }))
}

/// Cancel an active lot, voiding its unused remainder
#[utoipa::path(
    post,
    path = "/lots/{id}/cancel",
    tag = "lots",
    params(
        ("id" = i32, Path, description = "Lot ID")
    ),
    responses(
        (status = 200, description = "Lot cancelled", body = BarcodeLot),
        (status = 404, description = "Lot not found"),
        (status = 409, description = "Lot already cancelled or complete")
    )
)]
pub async fn cancel_lot(
    State(state): State<crate::AppState>,
    Path(lot_id): Path<i32>,
) -> AppResult<Json<BarcodeLot>> {
    let lot = state.services.lots.cancel(lot_id).await?;
    Ok(Json(lot))
}
