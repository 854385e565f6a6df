use deed_verify_api::config::Config;
use deed_verify_api::document_verifier::DocumentVerifier;
use deed_verify_api::face::HttpFaceEmbedder;
use deed_verify_api::face_verifier::FaceVerifier;
use deed_verify_api::handlers::AppState;
use deed_verify_api::ocr::TesseractExtractor;
use deed_verify_api::orchestrator::VerificationOrchestrator;
use deed_verify_api::router;
use deed_verify_api::uploads::StagingArea;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - OCR and face-embedding collaborators.
/// - The verification workflow and upload staging area.
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deed_verify_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let timeout = config.processing_timeout();

    let extractor = Arc::new(TesseractExtractor::new(config.tesseract_cmd.clone()));
    tracing::info!("OCR engine: {}", config.tesseract_cmd);

    let embedder = Arc::new(
        HttpFaceEmbedder::new(config.face_embedder_url.clone(), timeout)
            .map_err(|e| anyhow::anyhow!("Failed to initialize face embedder: {}", e))?,
    );
    tracing::info!("Face embedder client initialized: {}", config.face_embedder_url);

    let orchestrator = VerificationOrchestrator::new(
        DocumentVerifier::new(
            extractor,
            config.ocr_language.clone(),
            config.name_match_threshold,
            timeout,
        ),
        FaceVerifier::new(
            embedder,
            config.face_distance_threshold,
            config.multiple_face_policy(),
            timeout,
        ),
    );

    let staging = StagingArea::new(config.staging_dir.clone());
    tokio::fs::create_dir_all(staging.root()).await?;
    tracing::info!("Staging uploads under {}", staging.root().display());

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
        staging,
    });

    // Configure rate limiter per client IP
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    // Verification is rate limited; liveness and docs are not
    let protected_routes = router::verification_routes().layer(
        ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }),
    );

    let app = router::build_router(app_state, protected_routes);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
