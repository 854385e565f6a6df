use crate::face_verifier::{MultipleFacePolicy, FACE_DISTANCE_THRESHOLD};
use crate::matcher::NAME_MATCH_THRESHOLD;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub face_embedder_url: String,
    pub tesseract_cmd: String,
    pub ocr_language: String,
    pub staging_dir: PathBuf,
    pub name_match_threshold: u8,
    pub face_distance_threshold: f64,
    pub reject_multiple_faces: bool,
    pub processing_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: var_or("PORT", "8000")
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            face_embedder_url: std::env::var("FACE_EMBEDDER_URL")
                .map_err(|_| anyhow::anyhow!("FACE_EMBEDDER_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("FACE_EMBEDDER_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("FACE_EMBEDDER_URL must start with http:// or https://");
                    }
                    Ok(url)
                })?,
            tesseract_cmd: var_or("TESSERACT_CMD", "tesseract"),
            ocr_language: var_or("OCR_LANGUAGE", "eng"),
            staging_dir: std::env::var("STAGING_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("deed-verify-uploads")),
            name_match_threshold: var_or("NAME_MATCH_THRESHOLD", &NAME_MATCH_THRESHOLD.to_string())
                .parse::<u8>()
                .map_err(|_| anyhow::anyhow!("NAME_MATCH_THRESHOLD must be a number"))
                .and_then(|t| {
                    if t > 100 {
                        anyhow::bail!("NAME_MATCH_THRESHOLD must be between 0 and 100");
                    }
                    Ok(t)
                })?,
            face_distance_threshold: var_or(
                "FACE_DISTANCE_THRESHOLD",
                &FACE_DISTANCE_THRESHOLD.to_string(),
            )
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("FACE_DISTANCE_THRESHOLD must be a number"))
            .and_then(|t| {
                if !t.is_finite() || t <= 0.0 {
                    anyhow::bail!("FACE_DISTANCE_THRESHOLD must be greater than 0");
                }
                Ok(t)
            })?,
            reject_multiple_faces: var_or("REJECT_MULTIPLE_FACES", "false")
                .parse()
                .map_err(|_| anyhow::anyhow!("REJECT_MULTIPLE_FACES must be true or false"))?,
            processing_timeout_secs: var_or("PROCESSING_TIMEOUT_SECS", "60")
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("PROCESSING_TIMEOUT_SECS must be a number"))
                .and_then(|t| {
                    if t == 0 {
                        anyhow::bail!("PROCESSING_TIMEOUT_SECS must be greater than 0");
                    }
                    Ok(t)
                })?,
            max_upload_bytes: var_or("MAX_UPLOAD_BYTES", &(25 * 1024 * 1024).to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_BYTES must be a number"))?,
            rate_limit_per_second: var_or("RATE_LIMIT_PER_SECOND", "5")
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a number"))?,
            rate_limit_burst: var_or("RATE_LIMIT_BURST", "10")
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a number"))?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Face embedder URL: {}", config.face_embedder_url);
        tracing::debug!(
            "OCR: {} (language {})",
            config.tesseract_cmd,
            config.ocr_language
        );
        tracing::debug!("Staging directory: {}", config.staging_dir.display());
        tracing::debug!(
            "Thresholds: name > {}, face distance <= {}",
            config.name_match_threshold,
            config.face_distance_threshold
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    pub fn multiple_face_policy(&self) -> MultipleFacePolicy {
        if self.reject_multiple_faces {
            MultipleFacePolicy::Reject
        } else {
            MultipleFacePolicy::UseFirst
        }
    }
}
