//! Copy registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::copy::{Copy, CopyStatus, CreateCopy},
};

/// Administrative status change request
#[derive(Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub status: CopyStatus,
}

/// Register a new copy of an item
#[utoipa::path(
    post,
    path = "/items/{id}/copies",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = CreateCopy,
    responses(
        (status = 201, description = "Copy registered", body = Copy),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Barcode already in use")
    )
)]
pub async fn register_copy(
    State(state): State<crate::AppState>,
    Path(item_id): Path<i32>,
    Json(request): Json<CreateCopy>,
) -> AppResult<(StatusCode, Json<Copy>)> {
    request.validate()?;

    let copy = state.services.registry.register_copy(item_id, request).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// List all copies of an item
#[utoipa::path(
    get,
    path = "/items/{id}/copies",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Copies of the item", body = Vec<Copy>)
    )
)]
pub async fn list_copies(
    State(state): State<crate::AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<Vec<Copy>>> {
    let copies = state.services.registry.list_by_item(item_id).await?;
    Ok(Json(copies))
}

/// List available copies of an item
#[utoipa::path(
    get,
    path = "/items/{id}/copies/available",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Available copies, sequence ascending", body = Vec<Copy>)
    )
)]
pub async fn list_available(
    State(state): State<crate::AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<Vec<Copy>>> {
    let copies = state.services.registry.list_available(item_id).await?;
    Ok(Json(copies))
}

/// Get a copy by ID
#[utoipa::path(
    get,
    path = "/copies/{id}",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "The copy", body = Copy),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    Path(copy_id): Path<i32>,
) -> AppResult<Json<Copy>> {
    let copy = state.services.registry.get(copy_id).await?;
    Ok(Json(copy))
}

/// Find a copy by barcode
#[utoipa::path(
    get,
    path = "/copies/barcode/{code}",
    tag = "copies",
    params(
        ("code" = String, Path, description = "Barcode")
    ),
    responses(
        (status = 200, description = "The copy", body = Copy),
        (status = 404, description = "No copy carries this barcode")
    )
)]
pub async fn find_by_barcode(
    State(state): State<crate::AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Copy>> {
    let copy = state.services.registry.find_by_barcode(&code).await?;
    Ok(Json(copy))
}

/// Administrative status move (Maintenance, Lost, Archived or restore)
#[utoipa::path(
    put,
    path = "/copies/{id}/status",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Copy),
        (status = 400, description = "Borrowed/Reserved are circulation-only"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Transition not allowed from the current status")
    )
)]
pub async fn set_status(
    State(state): State<crate::AppState>,
    Path(copy_id): Path<i32>,
    Json(request): Json<SetStatusRequest>,
) -> AppResult<Json<Copy>> {
    let copy = state
        .services
        .circulation
        .set_status(copy_id, request.status)
        .await?;
    Ok(Json(copy))
}
