//! Blob storage for uploaded image bytes.
//!
//! Two backends: Google Cloud Storage for deployments, and a local directory
//! (served back through `/media/*`) for development.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use google_cloud_storage::client::Storage;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local storage write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("GCS upload failed: {0}")]
    Gcs(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `name` and return a publicly resolvable URL for it.
    async fn upload(&self, name: &str, data: Bytes) -> Result<String, StorageError>;
}

/// `image-<uuid>.<extension>`. UUIDv4 keeps names unique across concurrent uploads.
pub fn blob_name(extension: &str) -> String {
    format!("image-{}.{}", Uuid::new_v4(), extension)
}

/// Google Cloud Storage bucket
#[derive(Clone)]
pub struct GcsBlobStore {
    client: Storage,
    bucket_name: String,
}

impl GcsBlobStore {
    pub fn new(client: Storage, bucket_name: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
        }
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.bucket_name, name)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(&self, name: &str, data: Bytes) -> Result<String, StorageError> {
        let bucket = format!("projects/_/buckets/{}", self.bucket_name);
        self.client
            .write_object(&bucket, name, data)
            .send_buffered()
            .await
            .map_err(|e| StorageError::Gcs(e.to_string()))?;
        Ok(self.public_url(name))
    }
}

/// Directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, name: &str, data: Bytes) -> Result<String, StorageError> {
        let full_path = self.root.join(name);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &data).await?;
        Ok(format!("{}/media/{}", self.public_base_url, name))
    }
}
