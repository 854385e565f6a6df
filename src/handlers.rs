use crate::config::Config;
use crate::errors::AppError;
use crate::orchestrator::VerificationOrchestrator;
use crate::uploads::{classify, StagingArea};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Document and face verification workflow.
    pub orchestrator: VerificationOrchestrator,
    /// Root of the per-request upload directories.
    pub staging: StagingArea,
}

/// GET /
///
/// Static liveness payload.
pub async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "Real Estate AI Service is running!" }))
}

/// Health check endpoint.
///
/// Returns the service status, version, and current server time.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "deed-verify-api",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

fn required_field(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required form field '{}'", name)))
}

/// POST /verify_identity
///
/// Multipart form with repeated `files` parts plus `full_name` and
/// `govt_id_number`. Files are named by role: `..._deed.*`, `..._id.*` and
/// `..._live.*`.
///
/// # Returns
///
/// * 200 with the final verdict when both checks pass.
/// * 400 when a field or one of the three files is missing or ambiguous.
/// * 422 with the failing check's outcome.
/// * 500 when a check could not run.
///
/// Uploaded files are deleted before the response is returned, on every path.
pub async fn verify_identity(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("verify_identity", %request_id);

    async move {
        tracing::info!("POST /verify_identity");

        let mut staged = state.staging.begin(request_id).await?;
        let mut full_name = None;
        let mut govt_id_number = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("files") => {
                    let file_name = field.file_name().map(str::to_string).ok_or_else(|| {
                        AppError::BadRequest("File part is missing a filename".to_string())
                    })?;
                    let bytes = field.bytes().await?;
                    staged.store(&file_name, &bytes).await?;
                }
                Some("full_name") => full_name = Some(field.text().await?),
                Some("govt_id_number") => govt_id_number = Some(field.text().await?),
                other => tracing::debug!("Ignoring multipart field {:?}", other),
            }
        }

        let full_name = required_field(full_name, "full_name")?;
        let govt_id_number = required_field(govt_id_number, "govt_id_number")?;
        let uploads = classify(staged.files())?;

        tracing::info!(
            "Classified uploads: deed={} id={} live={}",
            uploads.deed.file_name,
            uploads.id.file_name,
            uploads.live.file_name
        );

        let outcome = state
            .orchestrator
            .run(&full_name, &govt_id_number, &uploads)
            .await?;

        tracing::info!("Workflow finished with status {}", outcome.status_code());

        Ok::<Response, AppError>(outcome.into_response())
    }
    .instrument(span)
    .await
}

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the working directory; 404 when it is absent.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found.").into_response(),
    }
}

/// Serves the Swagger UI HTML page pointing at [`serve_openapi_spec`].
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Deed Verify API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_trims_and_rejects_blank() {
        assert_eq!(
            required_field(Some("  John Doe ".to_string()), "full_name").unwrap(),
            "John Doe"
        );
        assert!(matches!(
            required_field(Some("   ".to_string()), "full_name"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            required_field(None, "govt_id_number"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, Json(body)) = health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "deed-verify-api");
    }
}
