use crate::handlers::{self, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Routes that run the verification workflow. Kept separate so the binary can
/// put them behind a rate limiter without touching the liveness routes.
pub fn verification_routes() -> Router<Arc<AppState>> {
    Router::new().route("/verify_identity", post(handlers::verify_identity))
}

/// Assembles the full application around an already-layered set of
/// verification routes.
pub fn build_router(state: Arc<AppState>, verification: Router<Arc<AppState>>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::status))
        .route("/health", get(handlers::health))
        .route("/docs", get(handlers::serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(handlers::serve_openapi_spec))
        .merge(verification)
        .with_state(state)
        // Multipart bodies are bounded by the tower layer instead of axum's 2MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Application without rate limiting, as used by tests.
pub fn app(state: Arc<AppState>) -> Router {
    build_router(state, verification_routes())
}
