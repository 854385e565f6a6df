//! OCR collaborator.
//!
//! [`TextExtractor`] is the seam the document verifier talks to;
//! [`TesseractExtractor`] shells out to the Tesseract CLI.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR engine is not installed or not in your PATH.")]
    EngineUnavailable,
    #[error("{0}")]
    Failed(String),
}

/// Extracts multi-line text from a document image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &Path, language: &str) -> Result<String, OcrError>;
}

/// Runs `tesseract <image> stdout -l <language>`.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    command: String,
}

impl TesseractExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract_text(&self, image: &Path, language: &str) -> Result<String, OcrError> {
        if let Err(e) = tokio::fs::metadata(image).await {
            return Err(OcrError::Failed(format!(
                "cannot read image {}: {}",
                image.display(),
                e
            )));
        }

        tracing::debug!("Running {} on {}", self.command, image.display());

        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::EngineUnavailable,
                _ => OcrError::Failed(format!("failed to start {}: {}", self.command, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
