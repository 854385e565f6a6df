//! The verification workflow.
//!
//! ```text
//! Start -> DocumentsVerified | DocumentsFailed
//!       -> (if verified) FacesVerified | FacesFailed
//!       -> Completed | Rejected
//! ```
//!
//! Each step either advances or terminates with an explicit outcome. The face
//! check never starts until the document check has fully resolved.

use crate::document_verifier::DocumentVerifier;
use crate::errors::AppError;
use crate::face_verifier::FaceVerifier;
use crate::models::{
    DocumentFailureBody, DocumentVerificationOutcome, FaceFailureBody, FaceVerificationOutcome,
    FinalVerdict,
};
use crate::uploads::ClassifiedUploads;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Terminal state of a workflow run that produced a decision.
///
/// Requests that never reach a decision (bad input, processing errors) are
/// reported as [`AppError`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed(FinalVerdict),
    DocumentsFailed(DocumentVerificationOutcome),
    FacesFailed(FaceVerificationOutcome),
}

impl WorkflowOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowOutcome::Completed(_) => StatusCode::OK,
            WorkflowOutcome::DocumentsFailed(_) | WorkflowOutcome::FacesFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

impl IntoResponse for WorkflowOutcome {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            WorkflowOutcome::Completed(verdict) => (status, Json(verdict)).into_response(),
            WorkflowOutcome::DocumentsFailed(document_verification) => (
                status,
                Json(DocumentFailureBody {
                    document_verification,
                }),
            )
                .into_response(),
            WorkflowOutcome::FacesFailed(face_verification) => {
                (status, Json(FaceFailureBody { face_verification })).into_response()
            }
        }
    }
}

/// Runs the document check and, only if it passes, the face check.
#[derive(Clone)]
pub struct VerificationOrchestrator {
    documents: DocumentVerifier,
    faces: FaceVerifier,
}

impl VerificationOrchestrator {
    pub fn new(documents: DocumentVerifier, faces: FaceVerifier) -> Self {
        Self { documents, faces }
    }

    pub async fn run(
        &self,
        full_name: &str,
        govt_id_number: &str,
        uploads: &ClassifiedUploads,
    ) -> Result<WorkflowOutcome, AppError> {
        tracing::info!("Step 1: Running document verifier");
        let documents = self
            .documents
            .verify(full_name, govt_id_number, &uploads.deed.path, &uploads.id.path)
            .await
            .map_err(|e| AppError::Processing(e.to_string()))?;

        if !documents.is_overall_verified {
            tracing::warn!("Document verification failed: {}", documents.reason);
            return Ok(WorkflowOutcome::DocumentsFailed(documents));
        }
        tracing::info!("Document verification complete: {}", documents.reason);

        tracing::info!("Step 2: Running face verifier");
        let faces = self
            .faces
            .verify(&uploads.id.path, &uploads.live.path)
            .await
            .map_err(|e| AppError::Processing(e.to_string()))?;

        if !faces.face_match_found {
            tracing::warn!(
                "Face verification failed (distance {})",
                faces.face_distance
            );
            return Ok(WorkflowOutcome::FacesFailed(faces));
        }
        tracing::info!(
            "Face verification complete (distance {})",
            faces.face_distance
        );

        Ok(WorkflowOutcome::Completed(FinalVerdict::completed(
            documents, faces,
        )))
    }
}
