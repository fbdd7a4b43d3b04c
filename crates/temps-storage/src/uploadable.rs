//! Upload sources and the checks every backend runs before touching storage

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StorageError};
use crate::traits::Uploadable;

/// In-memory content with an optional declared content type and file name.
#[derive(Debug, Clone, Default)]
pub struct UploadBytes {
    data: Bytes,
    content_type: Option<String>,
    original_filename: Option<String>,
}

impl UploadBytes {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
            original_filename: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.original_filename = Some(filename.into());
        self
    }
}

#[async_trait]
impl Uploadable for UploadBytes {
    async fn size(&self) -> Result<Option<u64>> {
        Ok(Some(self.data.len() as u64))
    }

    async fn read(&self) -> Result<Option<Bytes>> {
        Ok(Some(self.data.clone()))
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }
}

/// A file on the local filesystem. Its name doubles as the original file name.
#[derive(Debug, Clone)]
pub struct UploadPath {
    path: PathBuf,
    content_type: Option<String>,
}

impl UploadPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
impl Uploadable for UploadPath {
    async fn size(&self) -> Result<Option<u64>> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        Ok(metadata.is_file().then(|| metadata.len()))
    }

    async fn read(&self) -> Result<Option<Bytes>> {
        let data = tokio::fs::read(&self.path).await?;
        Ok(Some(Bytes::from(data)))
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn original_filename(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// Check that `uploadable` reports a size within `max_size`.
///
/// Returns the verified size.
pub async fn verify_uploadable(uploadable: &dyn Uploadable, max_size: Option<u64>) -> Result<u64> {
    let size = uploadable
        .size()
        .await?
        .ok_or_else(|| StorageError::invalid_uploadable("source does not report a size"))?;

    if let Some(max_size) = max_size {
        if size > max_size {
            return Err(StorageError::TooLarge { size, max_size });
        }
    }

    Ok(size)
}

/// Read the whole source, rejecting sources with nothing readable.
pub async fn read_uploadable(uploadable: &dyn Uploadable) -> Result<Bytes> {
    uploadable
        .read()
        .await?
        .ok_or_else(|| StorageError::invalid_uploadable("source has no readable content"))
}
