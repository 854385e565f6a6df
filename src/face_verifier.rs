//! Face verification: compare the face on the ID card with the live selfie.

use crate::face::{EmbedderError, Embedding, FaceEmbedder};
use crate::models::FaceVerificationOutcome;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Distance at or below which two faces are the same person.
pub const FACE_DISTANCE_THRESHOLD: f64 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaceVerificationError {
    #[error("Could not find a face in the ID card image.")]
    NoFaceInIdImage,
    #[error("Could not find a face in the live photo.")]
    NoFaceInLivePhoto,
    #[error("Found {count} faces in the {image}; exactly one is required.")]
    MultipleFaces { image: &'static str, count: usize },
    #[error("An error occurred during face recognition: {0}")]
    Processing(String),
}

impl From<EmbedderError> for FaceVerificationError {
    fn from(err: EmbedderError) -> Self {
        FaceVerificationError::Processing(err.to_string())
    }
}

/// What to do when an image holds more than one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipleFacePolicy {
    /// Compare the first detected face and log a warning.
    #[default]
    UseFirst,
    /// Refuse to decide.
    Reject,
}

#[derive(Clone)]
pub struct FaceVerifier {
    embedder: Arc<dyn FaceEmbedder>,
    distance_threshold: f64,
    multiple_faces: MultipleFacePolicy,
    timeout: Duration,
}

impl FaceVerifier {
    pub fn new(
        embedder: Arc<dyn FaceEmbedder>,
        distance_threshold: f64,
        multiple_faces: MultipleFacePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            distance_threshold,
            multiple_faces,
            timeout,
        }
    }

    /// Encodes the ID photo then the live photo and compares one face from each.
    ///
    /// The decision uses the exact distance; the reported distance is rounded
    /// to two decimals.
    pub async fn verify(
        &self,
        id_image: &Path,
        live_image: &Path,
    ) -> Result<FaceVerificationOutcome, FaceVerificationError> {
        let id_faces = self.encode(id_image).await?;
        let live_faces = self.encode(live_image).await?;

        let id_face = self
            .pick_face(id_faces, "ID card image")?
            .ok_or(FaceVerificationError::NoFaceInIdImage)?;
        let live_face = self
            .pick_face(live_faces, "live photo")?
            .ok_or(FaceVerificationError::NoFaceInLivePhoto)?;

        let distance = id_face.distance(&live_face)?;
        let face_match_found = distance <= self.distance_threshold;

        tracing::info!(
            "Face distance {:.4} (threshold {}) -> {}",
            distance,
            self.distance_threshold,
            if face_match_found { "match" } else { "no match" }
        );

        Ok(FaceVerificationOutcome {
            face_match_found,
            face_distance: round_to_hundredths(distance),
            reason: if face_match_found {
                "Face match successful.".to_string()
            } else {
                "Face match failed.".to_string()
            },
        })
    }

    fn pick_face(
        &self,
        faces: Vec<Embedding>,
        image: &'static str,
    ) -> Result<Option<Embedding>, FaceVerificationError> {
        if faces.len() > 1 {
            match self.multiple_faces {
                MultipleFacePolicy::UseFirst => {
                    tracing::warn!(
                        "Found {} faces in the {}; comparing the first one only",
                        faces.len(),
                        image
                    );
                }
                MultipleFacePolicy::Reject => {
                    return Err(FaceVerificationError::MultipleFaces {
                        image,
                        count: faces.len(),
                    });
                }
            }
        }

        Ok(faces.into_iter().next())
    }

    async fn encode(&self, image: &Path) -> Result<Vec<Embedding>, FaceVerificationError> {
        let faces = tokio::time::timeout(self.timeout, self.embedder.face_encodings(image))
            .await
            .map_err(|_| {
                FaceVerificationError::Processing(format!(
                    "face encoding timed out after {}s on {}",
                    self.timeout.as_secs(),
                    image.display()
                ))
            })??;

        Ok(faces)
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
