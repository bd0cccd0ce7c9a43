//! Notification connector endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        connector::{
            CategoryOverride, Connector, CreateConnector, EventOverride, UpsertCategoryOverride,
            UpsertEventOverride,
        },
        enums::{category_of, Channel, EventCategory},
    },
    services::connectors::ResolvedConnector,
};

/// Resolution query
#[derive(Deserialize, IntoParams)]
pub struct ResolveQuery {
    pub structure_id: i32,
    pub event_code: String,
    pub channel: Channel,
}

/// Category override scope
#[derive(Deserialize, IntoParams)]
pub struct CategoryScope {
    pub structure_id: i32,
    pub category: EventCategory,
}

/// Event override scope
#[derive(Deserialize, IntoParams)]
pub struct EventScope {
    pub structure_id: i32,
    pub event_code: String,
}

/// List all connectors
#[utoipa::path(
    get,
    path = "/connectors",
    tag = "connectors",
    responses(
        (status = 200, description = "Configured connectors", body = Vec<Connector>)
    )
)]
pub async fn list_connectors(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Connector>>> {
    let connectors = state.services.connectors.list().await?;
    Ok(Json(connectors))
}

/// Create a connector
#[utoipa::path(
    post,
    path = "/connectors",
    tag = "connectors",
    request_body = CreateConnector,
    responses(
        (status = 201, description = "Connector created", body = Connector),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_connector(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateConnector>,
) -> AppResult<(StatusCode, Json<Connector>)> {
    request.validate()?;

    let connector = state.services.connectors.create(request).await?;
    Ok((StatusCode::CREATED, Json(connector)))
}

/// Resolve the connector for a structure, event and channel
#[utoipa::path(
    get,
    path = "/connectors/resolve",
    tag = "connectors",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Resolved connector and the layer that supplied it", body = ResolvedConnector),
        (status = 404, description = "No connector defined at any layer")
    )
)]
pub async fn resolve(
    State(state): State<crate::AppState>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Json<ResolvedConnector>> {
    let category = category_of(&query.event_code);
    let resolved = state
        .services
        .connectors
        .resolve(query.structure_id, &query.event_code, category, query.channel)
        .await?;
    Ok(Json(resolved))
}

/// Upsert a category-level override
#[utoipa::path(
    put,
    path = "/connectors/overrides/category",
    tag = "connectors",
    request_body = UpsertCategoryOverride,
    responses(
        (status = 200, description = "Override upserted", body = CategoryOverride)
    )
)]
pub async fn upsert_category_override(
    State(state): State<crate::AppState>,
    Json(request): Json<UpsertCategoryOverride>,
) -> AppResult<Json<CategoryOverride>> {
    request.validate()?;

    let row = state
        .services
        .connectors
        .upsert_category_override(request)
        .await?;
    Ok(Json(row))
}

/// Clear a category-level override; resolution falls through to defaults
#[utoipa::path(
    delete,
    path = "/connectors/overrides/category",
    tag = "connectors",
    params(CategoryScope),
    responses(
        (status = 204, description = "Override cleared")
    )
)]
pub async fn clear_category_override(
    State(state): State<crate::AppState>,
    Query(scope): Query<CategoryScope>,
) -> AppResult<StatusCode> {
    state
        .services
        .connectors
        .clear_category_override(scope.structure_id, scope.category)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upsert an event-level override
#[utoipa::path(
    put,
    path = "/connectors/overrides/event",
    tag = "connectors",
    request_body = UpsertEventOverride,
    responses(
        (status = 200, description = "Override upserted", body = EventOverride)
    )
)]
pub async fn upsert_event_override(
    State(state): State<crate::AppState>,
    Json(request): Json<UpsertEventOverride>,
) -> AppResult<Json<EventOverride>> {
    request.validate()?;

    let row = state
        .services
        .connectors
        .upsert_event_override(request)
        .await?;
    Ok(Json(row))
}

/// Clear an event-level override
#[utoipa::path(
    delete,
    path = "/connectors/overrides/event",
    tag = "connectors",
    params(EventScope),
    responses(
        (status = 204, description = "Override cleared")
    )
)]
pub async fn clear_event_override(
    State(state): State<crate::AppState>,
    Query(scope): Query<EventScope>,
) -> AppResult<StatusCode> {
    state
        .services
        .connectors
        .clear_event_override(scope.structure_id, &scope.event_code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
