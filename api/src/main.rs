use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod middleware;
mod routes;
mod state;
mod upstream;
mod warehouse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hearth API",
        version = "0.1.0",
        description = "Real-estate analytics gateway: normalized agent intelligence, market trends, risk maps and listings for Hearth dashboards."
    ),
    paths(
        routes::health::health_check,
        routes::agents::get_agent,
        routes::agents::search_agents,
        routes::recommendations::recommend_agents,
        routes::sentiment::analyze_reviews,
        routes::risk::get_risk_areas,
        routes::market::market_summary,
        routes::market::market_trends,
        routes::listings::list_listings,
        routes::listings::get_listing,
    ),
    components(schemas(
        HealthResponse,
        hearth_core::error::ApiError,
        hearth_core::listings::Listing,
        hearth_core::listings::ListingStatus,
        hearth_core::listings::PaginatedResponse<hearth_core::listings::Listing>,
        routes::recommendations::RecommendRequest,
        routes::sentiment::AnalyzeReviewsRequest,
        routes::risk::RiskSeverity,
        routes::risk::RiskArea,
        routes::risk::RiskAreasResponse,
        routes::market::TrendMetric,
        routes::market::MarketSummaryResponse,
        routes::market::TrendPoint,
        routes::market::MarketTrendsResponse,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Fail fast on missing or malformed configuration
    let config = config::AppConfig::from_env().unwrap_or_else(|err| {
        eprintln!("configuration error: {err}");
        std::process::exit(1);
    });

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let app_state = state::AppState::new(pool, &config);

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    // Router with per-group rate limiting: model-backed routes are the
    // scarcest, warehouse queries the most expensive per call.
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::agents::router().layer(middleware::rate_limit::proxy_read_layer()))
        .merge(routes::recommendations::router().layer(middleware::rate_limit::model_layer()))
        .merge(routes::sentiment::router().layer(middleware::rate_limit::model_layer()))
        .merge(routes::risk::router().layer(middleware::rate_limit::proxy_read_layer()))
        .merge(routes::market::router().layer(middleware::rate_limit::warehouse_layer()))
        .merge(routes::listings::router().layer(middleware::rate_limit::listings_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Hearth API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
