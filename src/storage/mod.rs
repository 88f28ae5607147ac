//! Object storage for source documents and extracted item images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::core::errors::{AppError, AppResult};

pub const DOCUMENT_BUCKET: &str = "catalog-pdfs";
pub const IMAGE_BUCKET: &str = "product-images";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, bucket: &str, path: &str) -> AppResult<Vec<u8>>;

    /// Writes `bytes` at `path`, replacing any existing object.
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> AppResult<()>;
}

/// Stores objects as plain files under `{root}/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(AppError::InvalidInput(format!("object path '{path}' is not a plain relative path")));
        }
        Ok(self.root.join(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn download(&self, bucket: &str, path: &str) -> AppResult<Vec<u8>> {
        let target = self.object_path(bucket, path)?;
        if !target.exists() {
            return Err(AppError::NotFound(format!("object {bucket}/{path}")));
        }
        std::fs::read(&target)
            .map_err(|err| AppError::Storage(format!("cannot read {bucket}/{path}: {err}")))
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> AppResult<()> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)
            .map_err(|err| AppError::Storage(format!("cannot write {bucket}/{path}: {err}")))
    }
}
