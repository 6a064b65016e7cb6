//! Libris server binary: configuration, database, router, serve.

use anyhow::Context;
use axum::{
    routing::{get, post},
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

use libris_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging.level);

    tracing::info!("Libris server v{} starting", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("connecting to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("applying migrations")?;
    tracing::info!("Database ready");

    let addr = SocketAddr::new(
        config.server.host.parse().context("parsing server.host")?,
        config.server.port,
    );

    let services = Services::new(
        Repository::new(pool),
        config.auth.clone(),
        config.loans.clone(),
    );

    // First run on an empty database: provision the librarian account
    services
        .users
        .ensure_admin(&config.bootstrap)
        .await
        .context("bootstrapping librarian account")?;

    let app = router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    });

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("libris_server={},tower_http=debug", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// All routes, the OpenAPI UI, and the shared middleware stack.
fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(api::books::index))
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        .route("/books", get(api::books::list_books))
        .route("/books/list", get(api::books::book_list))
        .route("/book/:id", get(api::books::book_detail))
        .route("/books/add", post(api::books::add_book))
        .route("/books/edit/:id", post(api::books::edit_book))
        .route("/books/delete/:id", post(api::books::delete_book))
        .route("/books/:id/borrow", post(api::circulation::borrow_book))
        .route("/books/:id/return", post(api::circulation::return_book))
        .route("/transactions", get(api::transactions::list_transactions))
        .route("/dashboard", get(api::stats::dashboard))
        .with_state(state)
        .merge(api::openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
