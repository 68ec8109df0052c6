use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod extract;
mod middleware;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Signalfold API",
        version = "0.1.0",
        description = "Engagement scoring and readiness classification for pricing estimates. Folds best-effort interaction events into one profile per estimate; serves the derived quality indicators, readiness tier, and site-visit gate decision to the results page and the lead dashboard alike."
    ),
    paths(
        routes::health::health_check,
        routes::events::ingest_event,
        routes::events::ingest_events_batch,
        routes::events::validate_event,
        routes::profiles::get_profile,
        routes::profiles::list_profiles,
        routes::gate::check_gate,
        routes::system::get_system_config,
    ),
    components(schemas(
        HealthResponse,
        signalfold_core::error::ApiError,
        signalfold_core::events::RawEvent,
        signalfold_core::events::RawEventBatch,
        signalfold_core::events::EngagementEvent,
        signalfold_core::events::EventKind,
        signalfold_core::events::EventAck,
        signalfold_core::events::ValidationReport,
        signalfold_core::events::ValidationReason,
        signalfold_core::profile::EngagementProfile,
        signalfold_core::indicators::QualityIndicator,
        signalfold_core::readiness::ReadinessTier,
        signalfold_core::gate::GateAction,
        signalfold_core::gate::GateDecision,
        signalfold_core::engine::IndicatorView,
        signalfold_core::engine::TierView,
        signalfold_core::engine::SnapshotMeta,
        signalfold_core::engine::ProfileSnapshot,
        signalfold_core::store::PaginatedResponse<signalfold_core::engine::ProfileSnapshot>,
        routes::gate::GateCheckResponse,
        routes::system::SystemConfigResponse,
        routes::system::EventKindConfig,
        routes::system::LabelConfig,
        routes::system::ThresholdConfig,
        routes::system::LimitConfig,
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
                .unwrap_or_else(|_| "signalfold_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState::in_memory();

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    // Router with per-surface rate limiting. The write surface gets its
    // own generous limit; everything readable shares the read limit;
    // health stays unthrottled for probes.
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::events::write_router().layer(middleware::rate_limit::events_write_layer()))
        .merge(routes::events::validate_router().layer(middleware::rate_limit::reads_layer()))
        .merge(routes::profiles::router().layer(middleware::rate_limit::reads_layer()))
        .merge(routes::gate::router().layer(middleware::rate_limit::reads_layer()))
        .merge(routes::system::router().layer(middleware::rate_limit::reads_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Signalfold API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
