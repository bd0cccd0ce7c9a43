//! Prolongation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::prolongation::{Prolongation, ProlongationKind},
};

/// Prolongation request
#[derive(Deserialize, ToSchema)]
pub struct RequestProlongation {
    pub loan_id: i32,
    pub user_id: i32,
    pub kind: ProlongationKind,
}

/// Approve/deny request body
#[derive(Deserialize, ToSchema)]
pub struct ProcessProlongation {
    pub processor_id: i32,
    pub comment: Option<String>,
}

/// Request a prolongation of a loan
#[utoipa::path(
    post,
    path = "/prolongations",
    tag = "prolongations",
    request_body = RequestProlongation,
    responses(
        (status = 201, description = "Prolongation created (Approved for automatic, Pending for manual)", body = Prolongation),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan returned or automatic prolongation blocked by a reservation"),
        (status = 422, description = "Renewal ceiling reached")
    )
)]
pub async fn request_prolongation(
    State(state): State<crate::AppState>,
    Json(request): Json<RequestProlongation>,
) -> AppResult<(StatusCode, Json<Prolongation>)> {
    let prolongation = state
        .services
        .prolongations
        .request(request.loan_id, request.user_id, request.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(prolongation)))
}

/// Get a prolongation by ID
#[utoipa::path(
    get,
    path = "/prolongations/{id}",
    tag = "prolongations",
    params(
        ("id" = i32, Path, description = "Prolongation ID")
    ),
    responses(
        (status = 200, description = "The prolongation", body = Prolongation),
        (status = 404, description = "Prolongation not found")
    )
)]
pub async fn get_prolongation(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Prolongation>> {
    let prolongation = state.services.prolongations.get(id).await?;
    Ok(Json(prolongation))
}

/// Pending manual prolongation requests
#[utoipa::path(
    get,
    path = "/prolongations/pending",
    tag = "prolongations",
    responses(
        (status = 200, description = "Pending requests, oldest first", body = Vec<Prolongation>)
    )
)]
pub async fn list_pending(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Prolongation>>> {
    let pending = state.services.prolongations.list_pending().await?;
    Ok(Json(pending))
}

/// Prolongation history of a loan
#[utoipa::path(
    get,
    path = "/loans/{id}/prolongations",
    tag = "prolongations",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Prolongations of the loan", body = Vec<Prolongation>)
    )
)]
pub async fn list_for_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Vec<Prolongation>>> {
    let rows = state.services.prolongations.list_by_loan(loan_id).await?;
    Ok(Json(rows))
}

/// Approve a pending prolongation
#[utoipa::path(
    post,
    path = "/prolongations/{id}/approve",
    tag = "prolongations",
    params(
        ("id" = i32, Path, description = "Prolongation ID")
    ),
    request_body = ProcessProlongation,
    responses(
        (status = 200, description = "Prolongation approved, loan extended", body = Prolongation),
        (status = 404, description = "Prolongation not found"),
        (status = 409, description = "Already processed, loan returned, or due date moved past the request")
    )
)]
pub async fn approve(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ProcessProlongation>,
) -> AppResult<Json<Prolongation>> {
    let prolongation = state
        .services
        .prolongations
        .approve(id, request.processor_id, request.comment)
        .await?;
    Ok(Json(prolongation))
}

/// Deny a pending prolongation
#[utoipa::path(
    post,
    path = "/prolongations/{id}/deny",
    tag = "prolongations",
    params(
        ("id" = i32, Path, description = "Prolongation ID")
    ),
    request_body = ProcessProlongation,
    responses(
        (status = 200, description = "Prolongation denied, loan untouched", body = Prolongation),
        (status = 404, description = "Prolongation not found"),
        (status = 409, description = "Already processed")
    )
)]
pub async fn deny(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ProcessProlongation>,
) -> AppResult<Json<Prolongation>> {
    let prolongation = state
        .services
        .prolongations
        .deny(id, request.processor_id, request.comment)
        .await?;
    Ok(Json(prolongation))
}
