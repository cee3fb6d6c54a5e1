//! Velin Server - Library Circulation Backend
//!
//! REST API server around the circulation engine.

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use velin_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        membership::PgMembershipProvider, notifications::EmailNotifier,
        scheduler::CirculationSweeper, Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("velin_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Velin Server v{}", env!("CARGO_PKG_VERSION"));

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

    // Wire repositories, collaborators and services
    let repository = Repository::new(pool.clone());
    let notifier = Arc::new(EmailNotifier::new(config.notifications.clone(), pool.clone()));
    let membership = Arc::new(PgMembershipProvider::new(pool));
    let services = Services::new(
        repository.stores(),
        notifier,
        membership,
        config.circulation.clone(),
    );

    // Background sweeps: overdue loans, lapsed pickups, payment reminders
    let sweeper = CirculationSweeper::new(
        services.loans.clone(),
        services.reservations.clone(),
        services.fees.clone(),
        Duration::from_secs(config.circulation.sweep_interval_secs),
    );
    tokio::spawn(sweeper.run());

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
        // Loans
        .route("/loans", post(api::loans::create_loan))
        .route("/loans/overdue", get(api::loans::list_overdue))
        .route("/loans/:id/return", post(api::loans::return_loan))
        .route("/loans/:id/extend", post(api::loans::extend_loan))
        .route("/loans/:id/lost", post(api::loans::report_lost))
        // Reservations
        .route("/reservations", post(api::reservations::create_reservation))
        .route(
            "/reservations/:id/cancel",
            post(api::reservations::cancel_reservation),
        )
        .route(
            "/reservations/:id/pickup",
            post(api::reservations::pick_reservation),
        )
        .route("/books/:id/queue", get(api::reservations::get_book_queue))
        // Fees
        .route("/fees", post(api::fees::create_lost_fine))
        .route("/fees/:id/pay", post(api::fees::mark_fine_paid))
        .route("/fees/:id/waive", post(api::fees::waive_fine))
        // Per-user views
        .route("/users/:id/loans", get(api::loans::get_user_loans))
        .route(
            "/users/:id/reservations",
            get(api::reservations::get_user_reservations),
        )
        .route("/users/:id/fees", get(api::fees::get_user_fees))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
