//! Rotonde Server - Circulation Engine
//!
//! REST API server for multi-structure circulation: copies, loans,
//! reservations, prolongations, genre limits, connectors and barcode lots.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotonde_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("rotonde_server={},tower_http=debug", config.logging.level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rotonde Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, &config);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Copies
        .route("/items/:id/copies", get(api::copies::list_copies))
        .route("/items/:id/copies", post(api::copies::register_copy))
        .route(
            "/items/:id/copies/available",
            get(api::copies::list_available),
        )
        .route("/copies/:id", get(api::copies::get_copy))
        .route("/copies/:id/status", put(api::copies::set_status))
        .route("/copies/barcode/:code", get(api::copies::find_by_barcode))
        // Circulation
        .route("/loans", post(api::circulation::checkout))
        .route("/copies/:id/return", post(api::circulation::return_copy))
        .route("/reservations", post(api::circulation::reserve))
        .route(
            "/reservations/:id/cancel",
            post(api::circulation::cancel_reservation),
        )
        .route("/users/:id/loans", get(api::circulation::list_user_loans))
        .route(
            "/users/:id/reservations",
            get(api::circulation::list_user_reservations),
        )
        .route("/items/:id/queue", get(api::circulation::list_queue))
        // Prolongations
        .route(
            "/prolongations",
            post(api::prolongations::request_prolongation),
        )
        .route(
            "/prolongations/pending",
            get(api::prolongations::list_pending),
        )
        .route("/prolongations/:id", get(api::prolongations::get_prolongation))
        .route("/prolongations/:id/approve", post(api::prolongations::approve))
        .route("/prolongations/:id/deny", post(api::prolongations::deny))
        .route(
            "/loans/:id/prolongations",
            get(api::prolongations::list_for_loan),
        )
        // Genre limits
        .route("/limits", put(api::limits::upsert_limit))
        .route(
            "/structures/:id/limits",
            get(api::limits::list_structure_limits),
        )
        .route("/limits/check", post(api::limits::check_limit))
        // Connectors
        .route("/connectors", get(api::connectors::list_connectors))
        .route("/connectors", post(api::connectors::create_connector))
        .route("/connectors/resolve", get(api::connectors::resolve))
        .route(
            "/connectors/overrides/category",
            put(api::connectors::upsert_category_override),
        )
        .route(
            "/connectors/overrides/category",
            delete(api::connectors::clear_category_override),
        )
        .route(
            "/connectors/overrides/event",
            put(api::connectors::upsert_event_override),
        )
        .route(
            "/connectors/overrides/event",
            delete(api::connectors::clear_event_override),
        )
        // Barcode lots
        .route("/lots", get(api::lots::list_lots))
        .route("/lots", post(api::lots::issue_lot))
        .route("/lots/:id", get(api::lots::get_lot))
        .route("/lots/:id/assign", post(api::lots::assign_next))
        .route("/lots/:id/cancel", post(api::lots::cancel_lot))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
