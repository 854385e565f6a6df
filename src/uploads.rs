//! Per-request staging of uploaded images and their classification by role.
//!
//! Every request gets its own directory under the staging root. The directory
//! lives exactly as long as its [`StagedUpload`] guard, so files are removed on
//! every exit path, including early returns and errors.

use crate::errors::{AppError, ResultExt};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;
use uuid::Uuid;

pub const MISSING_FILES_MESSAGE: &str =
    "Missing one or more required files. Please upload files with '_deed', '_id', and '_live' suffixes.";

/// Role an uploaded image plays in the verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    Deed,
    Id,
    Live,
}

impl DocumentRole {
    const ALL: [DocumentRole; 3] = [DocumentRole::Deed, DocumentRole::Id, DocumentRole::Live];

    /// Filename marker identifying the role, matched case-insensitively.
    pub fn marker(self) -> &'static str {
        match self {
            DocumentRole::Deed => "_deed",
            DocumentRole::Id => "_id",
            DocumentRole::Live => "_live",
        }
    }

    /// Roles whose marker appears in `file_name`.
    pub fn detect(file_name: &str) -> Vec<DocumentRole> {
        let lowered = file_name.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|role| lowered.contains(role.marker()))
            .collect()
    }
}

/// A file written into a request's staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Client-supplied base name, used for role classification.
    pub file_name: String,
    /// Location on disk, named after the sanitized base name.
    pub path: PathBuf,
    pub size: usize,
    /// Hex SHA-256 of the contents, for audit logging.
    pub sha256: String,
}

/// The three images a verification needs, one per role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUploads {
    pub deed: StagedFile,
    pub id: StagedFile,
    pub live: StagedFile,
}

/// Assigns each staged file to a role by its filename marker.
///
/// Files without a marker are ignored. A file carrying several markers, a
/// role claimed by several files, or a role with no file is a bad request.
pub fn classify(files: &[StagedFile]) -> Result<ClassifiedUploads, AppError> {
    let mut deed: Option<&StagedFile> = None;
    let mut id: Option<&StagedFile> = None;
    let mut live: Option<&StagedFile> = None;

    for file in files {
        let roles = DocumentRole::detect(&file.file_name);

        if roles.len() > 1 {
            return Err(AppError::BadRequest(format!(
                "File '{}' matches more than one of '_deed', '_id', '_live'.",
                file.file_name
            )));
        }

        let Some(role) = roles.first().copied() else {
            tracing::debug!("Ignoring unclassified upload {}", file.file_name);
            continue;
        };

        let slot = match role {
            DocumentRole::Deed => &mut deed,
            DocumentRole::Id => &mut id,
            DocumentRole::Live => &mut live,
        };

        if let Some(existing) = slot {
            return Err(AppError::BadRequest(format!(
                "Files '{}' and '{}' both match '{}'; upload exactly one.",
                existing.file_name,
                file.file_name,
                role.marker()
            )));
        }
        *slot = Some(file);
    }

    match (deed, id, live) {
        (Some(deed), Some(id), Some(live)) => Ok(ClassifiedUploads {
            deed: deed.clone(),
            id: id.clone(),
            live: live.clone(),
        }),
        _ => Err(AppError::BadRequest(MISSING_FILES_MESSAGE.to_string())),
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"))
}

/// Last path component of a client-supplied filename, either separator.
pub fn client_base_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or_default()
}

/// Reduces a client-supplied filename to a safe base name for disk.
///
/// Directory components are dropped and any character outside
/// `[A-Za-z0-9._-]` becomes `_`. Returns `None` when nothing usable is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let cleaned = unsafe_chars()
        .replace_all(client_base_name(raw), "_")
        .into_owned();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned)
    }
}

/// Root under which request directories are created.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh directory for one request.
    pub async fn begin(&self, request_id: Uuid) -> Result<StagedUpload, AppError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating staging root {}", self.root.display()))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", request_id))
            .tempdir_in(&self.root)
            .context("creating request staging directory")?;

        tracing::debug!("Staging uploads in {}", dir.path().display());

        Ok(StagedUpload {
            dir,
            files: Vec::new(),
        })
    }
}

/// Guard over one request's staging directory. Dropping it deletes the
/// directory and everything in it.
#[derive(Debug)]
pub struct StagedUpload {
    dir: TempDir,
    files: Vec<StagedFile>,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Writes one uploaded file under its sanitized name.
    ///
    /// The returned [`StagedFile`] keeps the client's base name, so
    /// classification only sees markers the client actually sent.
    pub async fn store(&mut self, raw_name: &str, bytes: &[u8]) -> Result<StagedFile, AppError> {
        let disk_name = sanitize_file_name(raw_name).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid upload filename '{}'", raw_name))
        })?;
        let file_name = client_base_name(raw_name).to_string();
        let path = self.dir.path().join(&disk_name);

        if self.files.iter().any(|f| f.path == path) {
            return Err(AppError::BadRequest(format!(
                "Duplicate upload filename '{}'",
                file_name
            )));
        }

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing upload {}", disk_name))?;

        let staged = StagedFile {
            file_name,
            path,
            size: bytes.len(),
            sha256: hex::encode(Sha256::digest(bytes)),
        };

        tracing::info!(
            "Staged upload {} ({} bytes, sha256 {})",
            staged.file_name,
            staged.size,
            staged.sha256
        );

        self.files.push(staged.clone());
        Ok(staged)
    }
}
