//! Circulation endpoints: checkout, return, reservations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{loan::Loan, reservation::Reservation},
    services::circulation::ReturnOutcome,
};

/// Checkout request
#[derive(Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub copy_id: i32,
    pub user_id: i32,
}

/// Reservation request
#[derive(Deserialize, ToSchema)]
pub struct ReserveRequest {
    pub item_id: i32,
    pub user_id: i32,
    pub structure_id: i32,
}

/// Borrow a copy (plain checkout or reservation pickup)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "circulation",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy taken by a concurrent request or held for another user"),
        (status = 422, description = "Genre limit reached")
    )
)]
pub async fn checkout(
    State(state): State<crate::AppState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .circulation
        .checkout(request.copy_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/copies/{id}/return",
    tag = "circulation",
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy returned; includes the reservation now holding it, if any", body = ReturnOutcome),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is not currently borrowed")
    )
)]
pub async fn return_copy(
    State(state): State<crate::AppState>,
    Path(copy_id): Path<i32>,
) -> AppResult<Json<ReturnOutcome>> {
    let outcome = state.services.circulation.return_copy(copy_id).await?;
    Ok(Json(outcome))
}

/// Place a reservation on an item
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "circulation",
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Reservation placed (Ready when a copy was held, Waiting otherwise)", body = Reservation),
        (status = 404, description = "Item not found"),
        (status = 422, description = "Reservation limit reached")
    )
)]
pub async fn reserve(
    State(state): State<crate::AppState>,
    Json(request): Json<ReserveRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .services
        .circulation
        .reserve(request.item_id, request.user_id, request.structure_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// A user's active loans
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "circulation",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Active loans, oldest first", body = Vec<Loan>)
    )
)]
pub async fn list_user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.circulation.list_user_loans(user_id).await?;
    Ok(Json(loans))
}

/// A user's active reservations
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "circulation",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Waiting and Ready reservations", body = Vec<Reservation>)
    )
)]
pub async fn list_user_reservations(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state
        .services
        .circulation
        .list_user_reservations(user_id)
        .await?;
    Ok(Json(reservations))
}

/// Waiting queue on an item, FIFO
#[utoipa::path(
    get,
    path = "/items/{id}/queue",
    tag = "circulation",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Waiting reservations, oldest first", body = Vec<Reservation>)
    )
)]
pub async fn list_queue(
    State(state): State<crate::AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    let queue = state.services.circulation.list_queue(item_id).await?;
    Ok(Json(queue))
}

/// Cancel an active reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "circulation",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already fulfilled or cancelled")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .services
        .circulation
        .cancel_reservation(reservation_id)
        .await?;
    Ok(Json(reservation))
}
