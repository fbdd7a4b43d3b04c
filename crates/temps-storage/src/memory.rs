//! In-process backend keeping blobs in a shared map

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::file::StoredFile;
use crate::hasher::RandomHasher;
use crate::traits::{IdHasher, StorageBackend, Uploadable};
use crate::types::{verify_id, Confirm, StoreIdentity};
use crate::uploadable::{read_uploadable, verify_uploadable};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Backend that keeps blobs in memory. Clones share the same blobs.
#[derive(Clone)]
pub struct MemoryBackend {
    instance: u64,
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
    hasher: Arc<dyn IdHasher>,
    max_size: Option<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            blobs: Arc::new(RwLock::new(HashMap::new())),
            hasher: Arc::new(RandomHasher),
            max_size: None,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn IdHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Number of blobs currently stored
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    fn handle(&self, id: String) -> StoredFile {
        StoredFile::new(Arc::new(self.clone()), id)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("instance", &self.instance)
            .field("hasher", &self.hasher)
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn identity(&self) -> StoreIdentity {
        StoreIdentity::new("memory", self.instance.to_string(), "default")
    }

    fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    async fn upload(&self, uploadable: &dyn Uploadable) -> Result<StoredFile> {
        verify_uploadable(uploadable, self.max_size).await?;
        let id = self.hasher.hash(uploadable).await?;

        let same_store = uploadable
            .as_stored_file()
            .filter(|file| file.backend().identity() == self.identity());

        let data = match same_store {
            Some(source) => {
                debug!("COPY {} -> {}", source.id(), id);
                let blobs = self.blobs.read().await;
                blobs.get(source.id()).cloned().ok_or_else(|| StorageError::Remote {
                    status: 404,
                    code: Some("BlobNotFound".to_string()),
                    message: format!("copy source {} does not exist", source.id()),
                })?
            }
            None => {
                let data = read_uploadable(uploadable).await?;
                debug!("PUT {} ({} bytes)", id, data.len());
                data
            }
        };

        self.blobs.write().await.insert(id.clone(), data);
        Ok(self.handle(id))
    }

    fn get(&self, id: &str) -> Result<StoredFile> {
        verify_id(id)?;
        Ok(self.handle(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        verify_id(id)?;
        self.blobs.write().await.remove(id);
        Ok(())
    }

    async fn open(&self, id: &str) -> Result<Option<Cursor<Bytes>>> {
        Ok(self.read(id).await?.map(Cursor::new))
    }

    async fn read(&self, id: &str) -> Result<Option<Bytes>> {
        verify_id(id)?;
        Ok(self.blobs.read().await.get(id).cloned())
    }

    async fn size(&self, id: &str) -> Result<Option<u64>> {
        verify_id(id)?;
        Ok(self
            .blobs
            .read()
            .await
            .get(id)
            .map(|data| data.len() as u64))
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        verify_id(id)?;
        Ok(self.blobs.read().await.contains_key(id))
    }

    async fn clear(&self, confirm: Option<Confirm>) -> Result<()> {
        if confirm.is_none() {
            return Err(StorageError::ConfirmationRequired);
        }
        self.blobs.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Sha256Hasher;
    use crate::uploadable::UploadBytes;

    #[tokio::test]
    async fn test_missing_blob_is_benign() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.read("nothinghere").await.unwrap(), None);
        assert_eq!(backend.size("nothinghere").await.unwrap(), None);
        assert!(backend.open("nothinghere").await.unwrap().is_none());
        assert!(!backend.exists("nothinghere").await.unwrap());
        backend.delete("nothinghere").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let backend = MemoryBackend::new();
        let file = backend.upload(&UploadBytes::new("round trip")).await.unwrap();

        assert_eq!(
            backend.read(file.id()).await.unwrap(),
            Some(Bytes::from("round trip"))
        );
        assert_eq!(backend.size(file.id()).await.unwrap(), Some(10));
        assert!(backend.exists(file.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_max_size() {
        let backend = MemoryBackend::new().with_max_size(4);

        let err = backend.upload(&UploadBytes::new("12345")).await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 5, max_size: 4 }));
        assert!(backend.is_empty().await);

        backend.upload(&UploadBytes::new("1234")).await.unwrap();
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let backend = MemoryBackend::new();

        assert!(matches!(backend.get(""), Err(StorageError::InvalidId(_))));
        assert!(matches!(
            backend.read("a/b").await,
            Err(StorageError::InvalidId(_))
        ));
        assert!(matches!(
            backend.delete("../x").await,
            Err(StorageError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let backend = MemoryBackend::new();
        backend.upload(&UploadBytes::new("a")).await.unwrap();
        backend.upload(&UploadBytes::new("b")).await.unwrap();

        let err = backend.clear(None).await.unwrap_err();
        assert!(matches!(err, StorageError::ConfirmationRequired));
        assert_eq!(backend.len().await, 2);

        backend.clear(Some(Confirm)).await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_copy_within_same_store() {
        let backend = MemoryBackend::new();
        let original = backend.upload(&UploadBytes::new("copy me")).await.unwrap();
        let copy = backend.upload(&original).await.unwrap();

        assert_ne!(original.id(), copy.id());
        assert_eq!(copy.read().await.unwrap(), Some(Bytes::from("copy me")));
        assert_eq!(backend.len().await, 2);
    }

    #[tokio::test]
    async fn test_upload_across_stores() {
        let source = MemoryBackend::new();
        let target = MemoryBackend::new();
        assert_ne!(source.identity(), target.identity());

        let original = source.upload(&UploadBytes::new("travel")).await.unwrap();
        let moved = target.upload(&original).await.unwrap();

        assert_eq!(target.read(moved.id()).await.unwrap(), Some(Bytes::from("travel")));
        assert_eq!(moved.backend().identity(), target.identity());
    }

    #[tokio::test]
    async fn test_content_addressed_ids() {
        let backend = MemoryBackend::new().with_hasher(Arc::new(Sha256Hasher));
        let a = backend.upload(&UploadBytes::new("dup")).await.unwrap();
        let b = backend.upload(&UploadBytes::new("dup")).await.unwrap();

        assert_eq!(a.id(), b.id());
        assert_eq!(backend.len().await, 1);
    }
}
