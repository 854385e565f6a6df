//! Document verification: OCR both documents, then look for the claimed name
//! and ID number on each.

use crate::matcher::{best_name_match, contains_id, is_name_found};
use crate::models::{DocumentCheckResult, DocumentVerificationOutcome};
use crate::ocr::{OcrError, TextExtractor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentVerificationError {
    #[error("OCR engine is not installed or not in your PATH.")]
    EngineUnavailable,
    #[error("An error occurred during OCR processing: {0}")]
    Processing(String),
}

impl From<OcrError> for DocumentVerificationError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::EngineUnavailable => DocumentVerificationError::EngineUnavailable,
            OcrError::Failed(msg) => DocumentVerificationError::Processing(msg),
        }
    }
}

/// Checks that a claimed name and government ID appear on the deed and ID card.
#[derive(Clone)]
pub struct DocumentVerifier {
    extractor: Arc<dyn TextExtractor>,
    language: String,
    name_threshold: u8,
    timeout: Duration,
}

impl DocumentVerifier {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        language: impl Into<String>,
        name_threshold: u8,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            language: language.into(),
            name_threshold,
            timeout,
        }
    }

    /// OCRs the deed, then the ID card, and checks each independently.
    ///
    /// The name is matched fuzzily per line of text; the ID must appear
    /// verbatim (case-sensitive) in the document's full text.
    pub async fn verify(
        &self,
        claimed_name: &str,
        claimed_id: &str,
        deed_image: &Path,
        id_image: &Path,
    ) -> Result<DocumentVerificationOutcome, DocumentVerificationError> {
        let deed_text = self.extract(deed_image).await?;
        let deed = self.check_document(&deed_text, claimed_name, claimed_id);
        tracing::debug!("Deed check: {:?}", deed);

        let id_text = self.extract(id_image).await?;
        let id = self.check_document(&id_text, claimed_name, claimed_id);
        tracing::debug!("ID card check: {:?}", id);

        Ok(DocumentVerificationOutcome::from_checks(deed, id))
    }

    fn check_document(&self, text: &str, claimed_name: &str, claimed_id: &str) -> DocumentCheckResult {
        let name_match_score = best_name_match(text.lines(), claimed_name);

        DocumentCheckResult {
            name_found: is_name_found(name_match_score, self.name_threshold),
            id_found: contains_id(text, claimed_id),
            name_match_score,
        }
    }

    async fn extract(&self, image: &Path) -> Result<String, DocumentVerificationError> {
        let text = tokio::time::timeout(
            self.timeout,
            self.extractor.extract_text(image, &self.language),
        )
        .await
        .map_err(|_| {
            DocumentVerificationError::Processing(format!(
                "OCR timed out after {}s on {}",
                self.timeout.as_secs(),
                image.display()
            ))
        })??;

        Ok(text)
    }
}
