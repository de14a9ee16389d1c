//! Object storage for campaign images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AppError, AppResult};

/// Path prefix under which stored objects are served.
pub const PUBLIC_PREFIX: &str = "/storage";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous object.
    async fn put(&self, key: &str, bytes: &[u8]) -> AppResult<()>;
    /// URL a browser can fetch the object from.
    fn public_url(&self, key: &str) -> String;
}

/// Files on local disk, served back by the router under [`PUBLIC_PREFIX`].
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(AppError::Validation(format!("invalid object key {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> AppResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "object stored");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}{}/{}", self.public_base_url, PUBLIC_PREFIX, key)
    }
}

/// File extension for the image content types campaigns accept.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
