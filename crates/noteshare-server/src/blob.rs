//! Blob storage for uploaded documents and preview images.
//!
//! Stored blobs are addressed by a relative key such as
//! `notes/1718000000000-3f2a9c1e-lecture.pdf`, which is also the path under
//! the `/uploads` static route.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use noteshare_core::db::unix_timestamp_millis;

/// Content type prefixes refused for both documents and images.
pub const BLOCKED_CONTENT_PREFIXES: [&str; 2] = ["video/", "audio/"];

const NOTES_DIR: &str = "notes";
const MAX_NAME_LEN: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Content type {0} is not accepted")]
    Blocked(String),

    #[error("Blob not found: {0}")]
    Missing(String),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Blob IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a declared content type falls in a blocked family.
pub fn is_blocked_content_type(content_type: &str) -> bool {
    let lowered = content_type.trim().to_ascii_lowercase();
    BLOCKED_CONTENT_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Reduce a client supplied file name to a safe single path segment.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        return "file".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` and return the key they are stored under.
    async fn store(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, BlobError>;

    async fn exists(&self, key: &str) -> bool;

    async fn read(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    async fn remove(&self, key: &str) -> Result<(), BlobError>;
}

/// Blobs as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root, refusing anything that could
    /// escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn store(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, BlobError> {
        if let Some(ct) = content_type.filter(|ct| is_blocked_content_type(ct)) {
            return Err(BlobError::Blocked(ct.to_string()));
        }

        let dir = self.root.join(NOTES_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let tag = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}-{}-{}",
            unix_timestamp_millis(),
            &tag[..8],
            sanitize_file_name(original_name)
        );
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        let key = format!("{NOTES_DIR}/{file_name}");
        debug!(key = %key, size = bytes.len(), "Blob stored");
        Ok(key)
    }

    async fn exists(&self, key: &str) -> bool {
        match self.resolve(key) {
            Ok(path) => tokio::fs::metadata(path)
                .await
                .is_ok_and(|m| m.is_file()),
            Err(_) => false,
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::Missing(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key, "Blob already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
