/// End-to-end tests of POST /verify_identity with fake collaborators.
/// Uploaded "images" carry their fixture data as plain text: the fake OCR
/// engine returns a file's contents, and the fake face embedder turns every
/// `FACE <x>` line into a one-coordinate embedding.
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use deed_verify_api::config::Config;
use deed_verify_api::document_verifier::DocumentVerifier;
use deed_verify_api::face::{EmbedderError, Embedding, FaceEmbedder};
use deed_verify_api::face_verifier::{FaceVerifier, MultipleFacePolicy};
use deed_verify_api::handlers::AppState;
use deed_verify_api::ocr::{OcrError, TesseractExtractor, TextExtractor};
use deed_verify_api::orchestrator::VerificationOrchestrator;
use deed_verify_api::router;
use deed_verify_api::uploads::StagingArea;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "deed-verify-test-boundary";

#[derive(Default)]
struct FileTextExtractor {
    calls: AtomicUsize,
}

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract_text(&self, image: &Path, _language: &str) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::read_to_string(image)
            .await
            .map_err(|e| OcrError::Failed(e.to_string()))
    }
}

#[derive(Default)]
struct FileFaceEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl FaceEmbedder for FileFaceEmbedder {
    async fn face_encodings(&self, image: &Path) -> Result<Vec<Embedding>, EmbedderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let contents = tokio::fs::read_to_string(image).await.map_err(|e| {
            EmbedderError::UnreadableImage {
                path: image.display().to_string(),
                message: e.to_string(),
            }
        })?;

        contents
            .lines()
            .filter_map(|line| line.strip_prefix("FACE "))
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .map(|x| Embedding::new(vec![x, 0.0, 0.0]))
                    .map_err(|_| {
                        EmbedderError::InvalidResponse(format!("bad face fixture '{}'", raw))
                    })
            })
            .collect()
    }
}

struct Harness {
    staging_root: TempDir,
    ocr: Arc<FileTextExtractor>,
    faces: Arc<FileFaceEmbedder>,
    app: axum::Router,
}

fn test_config(staging_dir: PathBuf) -> Config {
    Config {
        port: 8000,
        face_embedder_url: "http://localhost:5001".to_string(),
        tesseract_cmd: "tesseract".to_string(),
        ocr_language: "eng".to_string(),
        staging_dir,
        name_match_threshold: 85,
        face_distance_threshold: 0.6,
        reject_multiple_faces: false,
        processing_timeout_secs: 5,
        max_upload_bytes: 1024 * 1024,
        rate_limit_per_second: 5,
        rate_limit_burst: 10,
    }
}

fn harness_with(extractor: Option<Arc<dyn TextExtractor>>) -> Harness {
    let staging_root = tempfile::tempdir().unwrap();
    let config = test_config(staging_root.path().to_path_buf());
    let ocr = Arc::new(FileTextExtractor::default());
    let faces = Arc::new(FileFaceEmbedder::default());

    let extractor: Arc<dyn TextExtractor> = match extractor {
        Some(extractor) => extractor,
        None => ocr.clone(),
    };

    let orchestrator = VerificationOrchestrator::new(
        DocumentVerifier::new(extractor, "eng", 85, Duration::from_secs(5)),
        FaceVerifier::new(
            faces.clone(),
            0.6,
            MultipleFacePolicy::UseFirst,
            Duration::from_secs(5),
        ),
    );

    let state = Arc::new(AppState {
        staging: StagingArea::new(config.staging_dir.clone()),
        config,
        orchestrator,
    });

    Harness {
        staging_root,
        ocr,
        faces,
        app: router::app(state),
    }
}

fn harness() -> Harness {
    harness_with(None)
}

impl Harness {
    fn staged_entries(&self) -> usize {
        std::fs::read_dir(self.staging_root.path()).unwrap().count()
    }

    async fn post(&self, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/verify_identity")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

fn multipart(files: &[(&str, &str)], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (name, contents) in files {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n{}\r\n",
            BOUNDARY, name, contents
        ));
    }
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}

const DEED_TEXT: &str = "WARRANTY DEED\nGrantee: John Doe\nOwner ID ID-9988";
const ID_TEXT: &str = "DRIVER LICENSE\nJOHN DOE\nNo. ID-9988\nFACE 0";
const CLAIM: [(&str, &str); 2] = [("full_name", "John Doe"), ("govt_id_number", "ID-9988")];

#[tokio::test]
async fn test_verified_owner_completes() {
    let h = harness();
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.55"),
        ],
        &CLAIM,
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["agent_workflow_status"], "Completed");
    assert_eq!(
        json["final_verdict"],
        "Owner Identity Verified. Ready for blockchain registration."
    );
    let details = &json["verification_details"];
    assert_eq!(details["document_verification"]["is_overall_verified"], true);
    assert_eq!(
        details["document_verification"]["deed_verification"]["name_match_score"],
        100
    );
    assert_eq!(details["face_verification"]["face_match_found"], true);
    assert_eq!(details["face_verification"]["face_distance"], 0.55);
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_missing_live_photo_is_rejected_before_verification() {
    let h = harness();
    let body = multipart(
        &[("owner_deed.png", DEED_TEXT), ("owner_id.png", ID_TEXT)],
        &CLAIM,
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Missing one or more required files"));
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.faces.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_two_id_files_are_ambiguous() {
    let h = harness();
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("spouse_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.1"),
        ],
        &CLAIM,
    );

    let (status, _) = h.post(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_missing_name_field_is_bad_request() {
    let h = harness();
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.1"),
        ],
        &[("govt_id_number", "ID-9988")],
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("full_name"));
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_name_typo_on_id_fails_documents_and_skips_faces() {
    let h = harness();
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", "DRIVER LICENSE\nJxhn Dxe\nNo. ID-9988\nFACE 0"),
            ("owner_live.jpg", "FACE 0.1"),
        ],
        &CLAIM,
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let docs = &json["document_verification"];
    assert_eq!(docs["is_overall_verified"], false);
    assert_eq!(docs["id_verification"]["name_found"], false);
    assert_eq!(docs["id_verification"]["id_found"], true);
    assert_eq!(docs["reason"], "FAILURE: ID document verification failed.");
    assert!(json.get("face_verification").is_none());
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.faces.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_distant_faces_fail_face_check() {
    let h = harness();
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.75"),
        ],
        &CLAIM,
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["face_verification"]["face_match_found"], false);
    assert_eq!(json["face_verification"]["face_distance"], 0.75);
    assert_eq!(json["face_verification"]["reason"], "Face match failed.");
    assert!(json.get("document_verification").is_none());
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_no_face_in_live_photo_is_processing_error() {
    let h = harness();
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", ""),
        ],
        &CLAIM,
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Could not find a face in the live photo.");
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_missing_ocr_engine_is_processing_error() {
    let missing: Arc<dyn TextExtractor> =
        Arc::new(TesseractExtractor::new("definitely-not-a-real-ocr-binary"));
    let h = harness_with(Some(missing));
    let body = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.1"),
        ],
        &CLAIM,
    );

    let (status, json) = h.post(body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["error"],
        "OCR engine is not installed or not in your PATH."
    );
    assert_eq!(h.faces.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.staged_entries(), 0);
}

#[tokio::test]
async fn test_status_endpoint() {
    let h = harness();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "Real Estate AI Service is running!");
}

#[tokio::test]
async fn test_concurrent_requests_do_not_collide() {
    let h = harness();

    let verified = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.2"),
        ],
        &CLAIM,
    );
    let mismatched = multipart(
        &[
            ("owner_deed.png", DEED_TEXT),
            ("owner_id.png", ID_TEXT),
            ("owner_live.jpg", "FACE 0.9"),
        ],
        &CLAIM,
    );

    let (first, second) = tokio::join!(h.post(verified), h.post(mismatched));

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(h.staged_entries(), 0);
}
