//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{circulation, connectors, copies, health, limits, lots, prolongations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rotonde API",
        version = "1.0.0",
        description = "Circulation Engine REST API",
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Copies
        copies::register_copy,
        copies::list_copies,
        copies::list_available,
        copies::get_copy,
        copies::find_by_barcode,
        copies::set_status,
        // Circulation
        circulation::checkout,
        circulation::return_copy,
        circulation::reserve,
        circulation::cancel_reservation,
        circulation::list_user_loans,
        circulation::list_user_reservations,
        circulation::list_queue,
        // Prolongations
        prolongations::request_prolongation,
        prolongations::get_prolongation,
        prolongations::list_pending,
        prolongations::list_for_loan,
        prolongations::approve,
        prolongations::deny,
        // Limits
        limits::upsert_limit,
        limits::list_structure_limits,
        limits::check_limit,
        // Connectors
        connectors::list_connectors,
        connectors::create_connector,
        connectors::resolve,
        connectors::upsert_category_override,
        connectors::clear_category_override,
        connectors::upsert_event_override,
        connectors::clear_event_override,
        // Lots
        lots::issue_lot,
        lots::list_lots,
        lots::get_lot,
        lots::assign_next,
        lots::cancel_lot,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::Module,
            crate::models::enums::Channel,
            crate::models::enums::EventCategory,
            crate::models::enums::LimitKind,
            // Copies
            crate::models::copy::Copy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CopyCondition,
            crate::models::copy::CreateCopy,
            copies::SetStatusRequest,
            // Items
            crate::models::item::ItemRef,
            // Circulation
            crate::models::loan::Loan,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            crate::services::circulation::ReturnOutcome,
            circulation::CheckoutRequest,
            circulation::ReserveRequest,
            // Prolongations
            crate::models::prolongation::Prolongation,
            crate::models::prolongation::ProlongationKind,
            crate::models::prolongation::ProlongationStatus,
            prolongations::RequestProlongation,
            prolongations::ProcessProlongation,
            // Limits
            crate::models::genre_limit::GenreLimit,
            crate::models::genre_limit::UpsertGenreLimit,
            crate::services::limits::LimitCheck,
            limits::CheckLimitRequest,
            // Connectors
            crate::models::connector::Connector,
            crate::models::connector::CategoryOverride,
            crate::models::connector::EventOverride,
            crate::models::connector::CreateConnector,
            crate::models::connector::UpsertCategoryOverride,
            crate::models::connector::UpsertEventOverride,
            crate::services::connectors::ResolvedConnector,
            crate::services::connectors::ResolutionLayer,
            // Lots
            crate::models::barcode_lot::BarcodeLot,
            crate::models::barcode_lot::LotStatus,
            lots::IssueLotRequest,
            lots::AssignedCode,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "copies", description = "Copy registry"),
        (name = "circulation", description = "Checkout, return and reservations"),
        (name = "prolongations", description = "Loan prolongation workflow"),
        (name = "limits", description = "Per-genre circulation caps"),
        (name = "connectors", description = "Notification connector hierarchy"),
        (name = "lots", description = "Barcode lot allocation")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
