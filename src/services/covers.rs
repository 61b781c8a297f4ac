//! Cover image storage

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::CoverUpload,
};

/// Directory, relative to the web root, holding uploaded covers
const COVERS_DIR: &str = "images/covers";

#[async_trait]
pub trait CoverStore: Send + Sync {
    /// Store the upload and return its relative reference. Empty uploads
    /// store nothing.
    async fn save(&self, upload: &CoverUpload) -> AppResult<Option<String>>;

    /// Remove the content behind a reference. Missing content is not an error.
    async fn delete(&self, reference: &str) -> AppResult<()>;
}

/// Covers kept as plain files under a web root
#[derive(Debug, Clone)]
pub struct FsCoverStore {
    root: PathBuf,
}

impl FsCoverStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that `/images/covers` is served from
    pub fn covers_dir(&self) -> PathBuf {
        self.root.join(COVERS_DIR)
    }

    fn resolve(&self, reference: &str) -> AppResult<Option<PathBuf>> {
        let relative = reference.trim().trim_start_matches(['/', '\\']).replace('\\', "/");
        if relative.is_empty() {
            return Ok(None);
        }
        let path = Path::new(&relative);
        if path.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(AppError::BadRequest(format!("Invalid cover reference: {}", reference)));
        }
        Ok(Some(self.root.join(path)))
    }
}

/// Extension of the suggested file name, kept only when it is short and plain
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[async_trait]
impl CoverStore for FsCoverStore {
    async fn save(&self, upload: &CoverUpload) -> AppResult<Option<String>> {
        if upload.bytes.is_empty() {
            return Ok(None);
        }

        let dir = self.covers_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot create {}: {}", dir.display(), e)))?;

        let file_name = format!("{}{}", Uuid::new_v4(), extension_of(&upload.file_name));
        let full_path = dir.join(&file_name);
        tokio::fs::write(&full_path, &upload.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot write {}: {}", full_path.display(), e)))?;

        tracing::debug!("Saved cover image {}", full_path.display());
        Ok(Some(format!("/{}/{}", COVERS_DIR, file_name)))
    }

    async fn delete(&self, reference: &str) -> AppResult<()> {
        let Some(full_path) = self.resolve(reference)? else {
            return Ok(());
        };

        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted cover image {}", full_path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Cannot delete {}: {}",
                full_path.display(),
                e
            ))),
        }
    }
}
