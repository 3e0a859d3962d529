//! File/blob upload service.
//!
//! Produces the URL a draft record points at (`file_url`). Uploads are not
//! part of the store's contract.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
}

/// Stores files and hands back their URL.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload(&self, file: Upload) -> Result<UploadedFile>;
}

/// Content-addressed in-process file store.
///
/// URLs have the form `mem://uploads/<first 16 hex chars of blake3>/<name>`,
/// so uploading identical content under one name yields the same URL.
#[derive(Debug, Default)]
pub struct MemoryUploads {
    files: RwLock<HashMap<String, Upload>>,
}

impl MemoryUploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a previously uploaded file by URL.
    pub fn get(&self, url: &str) -> Option<Upload> {
        self.files.read().ok()?.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UploadService for MemoryUploads {
    async fn upload(&self, file: Upload) -> Result<UploadedFile> {
        if file.bytes.is_empty() {
            return Err(ServiceError::UploadRejected(format!(
                "{} is empty",
                file.name
            )));
        }
        if file.name.is_empty() || file.name.contains('/') {
            return Err(ServiceError::UploadRejected(format!(
                "invalid file name {:?}",
                file.name
            )));
        }

        let digest = blake3::hash(&file.bytes).to_hex();
        let url = format!("mem://uploads/{}/{}", &digest.as_str()[..16], file.name);

        tracing::debug!(url = %url, size = file.bytes.len(), "stored upload");
        self.files
            .write()
            .map_err(|e| ServiceError::Backend(format!("upload lock poisoned: {}", e)))?
            .insert(url.clone(), file);

        Ok(UploadedFile { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_retrievable_url() {
        let uploads = MemoryUploads::new();
        let file = Upload::new("photo.png", "image/png", vec![1, 2, 3]);

        let stored = uploads.upload(file.clone()).await.unwrap();
        assert!(stored.url.starts_with("mem://uploads/"));
        assert!(stored.url.ends_with("/photo.png"));
        assert_eq!(uploads.get(&stored.url), Some(file));
    }

    #[tokio::test]
    async fn test_same_content_same_url() {
        let uploads = MemoryUploads::new();
        let a = uploads
            .upload(Upload::new("a.txt", "text/plain", b"same".to_vec()))
            .await
            .unwrap();
        let b = uploads
            .upload(Upload::new("a.txt", "text/plain", b"same".to_vec()))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(uploads.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_bad_names() {
        let uploads = MemoryUploads::new();
        let err = uploads
            .upload(Upload::new("empty.txt", "text/plain", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UploadRejected(_)));

        let err = uploads
            .upload(Upload::new("../x", "text/plain", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UploadRejected(_)));
        assert!(uploads.is_empty());
    }
}
