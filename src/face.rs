//! Face-embedding collaborator.
//!
//! [`FaceEmbedder`] returns one embedding per detected face.
//! [`HttpFaceEmbedder`] delegates detection and encoding to a sidecar service
//! over HTTP.

use crate::circuit_breaker::{create_embedder_circuit_breaker, EmbedderCircuitBreaker};
use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedderError {
    #[error("cannot read image {path}: {message}")]
    UnreadableImage { path: String, message: String },
    #[error("face embedding service unavailable: {0}")]
    Unavailable(String),
    #[error("face embedding service returned status {status}: {body}")]
    BadStatus { status: u16, body: String },
    #[error("invalid face embedding response: {0}")]
    InvalidResponse(String),
    #[error("embedding dimensions differ ({left} vs {right})")]
    DimensionMismatch { left: usize, right: usize },
}

impl EmbedderError {
    /// Whether the error reflects on the service rather than on the image
    /// sent to it. Only these count towards opening the circuit.
    pub fn is_service_failure(&self) -> bool {
        match self {
            EmbedderError::Unavailable(_) => true,
            EmbedderError::BadStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Fixed-length face embedding, one per detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f64>,
}

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings. Lower is more similar.
    pub fn distance(&self, other: &Embedding) -> Result<f64, EmbedderError> {
        if self.values.len() != other.values.len() {
            return Err(EmbedderError::DimensionMismatch {
                left: self.values.len(),
                right: other.values.len(),
            });
        }

        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt())
    }
}

/// Detects faces in an image and encodes each one.
#[async_trait]
pub trait FaceEmbedder: Send + Sync {
    /// Embeddings for every face found, in detection order. Empty when no face
    /// was detected.
    async fn face_encodings(&self, image: &Path) -> Result<Vec<Embedding>, EmbedderError>;
}

#[derive(Debug, Deserialize)]
struct EncodingsResponse {
    encodings: Vec<Embedding>,
}

/// Client for a face-embedding sidecar exposing `POST /face_encodings`.
///
/// The request body is the raw image; the response is
/// `{"encodings": [[f64, ...], ...]}`.
pub struct HttpFaceEmbedder {
    client: Client,
    base_url: String,
    circuit_breaker: EmbedderCircuitBreaker,
}

impl HttpFaceEmbedder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EmbedderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedderError::Unavailable(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            circuit_breaker: create_embedder_circuit_breaker(),
        })
    }

    async fn request_encodings(&self, bytes: Vec<u8>) -> Result<Vec<Embedding>, EmbedderError> {
        let url = format!("{}/face_encodings", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| EmbedderError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbedderError::BadStatus { status, body });
        }

        let parsed: EncodingsResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;

        Ok(parsed.encodings)
    }
}

#[async_trait]
impl FaceEmbedder for HttpFaceEmbedder {
    async fn face_encodings(&self, image: &Path) -> Result<Vec<Embedding>, EmbedderError> {
        let bytes =
            tokio::fs::read(image)
                .await
                .map_err(|e| EmbedderError::UnreadableImage {
                    path: image.display().to_string(),
                    message: e.to_string(),
                })?;

        tracing::debug!(
            "Requesting face encodings for {} ({} bytes)",
            image.display(),
            bytes.len()
        );

        match self
            .circuit_breaker
            .call_with(
                EmbedderError::is_service_failure,
                self.request_encodings(bytes),
            )
            .await
        {
            Ok(encodings) => Ok(encodings),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("Face embedding circuit open, rejecting call");
                Err(EmbedderError::Unavailable(
                    "circuit breaker open after repeated failures".to_string(),
                ))
            }
        }
    }
}
