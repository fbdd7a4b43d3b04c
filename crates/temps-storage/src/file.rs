//! Lazy handle to a stored blob

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::Result;
use crate::traits::{StorageBackend, Uploadable};

/// A (backend, id) pair returned by uploads and lookups.
///
/// Holding a `StoredFile` says nothing about whether the blob still exists;
/// every accessor goes back to the backend.
#[derive(Clone)]
pub struct StoredFile {
    backend: Arc<dyn StorageBackend>,
    id: String,
}

impl StoredFile {
    pub fn new(backend: Arc<dyn StorageBackend>, id: impl Into<String>) -> Self {
        Self {
            backend,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub async fn read(&self) -> Result<Option<Bytes>> {
        self.backend.read(&self.id).await
    }

    pub async fn size(&self) -> Result<Option<u64>> {
        self.backend.size(&self.id).await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.backend.exists(&self.id).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.backend.delete(&self.id).await
    }

    pub async fn open(&self) -> Result<Option<Cursor<Bytes>>> {
        self.backend.open(&self.id).await
    }

    /// Write the blob content to `dest`. Returns `false` without touching
    /// `dest` when the blob is missing.
    pub async fn download(&self, dest: impl AsRef<Path>) -> Result<bool> {
        let dest = dest.as_ref();
        match self.read().await? {
            Some(data) => {
                debug!("download {} -> {} ({} bytes)", self.id, dest.display(), data.len());
                tokio::fs::write(dest, &data).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredFile")
            .field("store", &self.backend.identity())
            .field("id", &self.id)
            .finish()
    }
}

#[async_trait]
impl Uploadable for StoredFile {
    async fn size(&self) -> Result<Option<u64>> {
        StoredFile::size(self).await
    }

    async fn read(&self) -> Result<Option<Bytes>> {
        StoredFile::read(self).await
    }

    fn as_stored_file(&self) -> Option<&StoredFile> {
        Some(self)
    }
}
