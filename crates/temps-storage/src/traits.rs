use std::fmt;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::file::StoredFile;
use crate::types::{Confirm, StoreIdentity};

/// Core trait that every blob storage backend implements.
///
/// Read-path operations report a missing blob as `None` / `false` rather than
/// an error; only genuine failures are returned as `Err`.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// The store this backend addresses, used for same-store copy detection
    fn identity(&self) -> StoreIdentity;

    /// Upload ceiling in bytes, if any
    fn max_size(&self) -> Option<u64>;

    /// Store the content of `uploadable` under a freshly hashed id
    async fn upload(&self, uploadable: &dyn Uploadable) -> Result<StoredFile>;

    /// Build a handle for `id` without checking that the blob exists
    fn get(&self, id: &str) -> Result<StoredFile>;

    /// Remove the blob. Deleting a missing blob succeeds.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Fetch the full content as a seekable in-memory reader
    async fn open(&self, id: &str) -> Result<Option<Cursor<Bytes>>>;

    /// Fetch the full content
    async fn read(&self, id: &str) -> Result<Option<Bytes>>;

    /// Content length of the blob
    async fn size(&self, id: &str) -> Result<Option<u64>>;

    async fn exists(&self, id: &str) -> Result<bool>;

    /// Delete every blob in the store. Refuses to run without [`Confirm`].
    async fn clear(&self, confirm: Option<Confirm>) -> Result<()>;
}

/// A source of content that can be handed to [`StorageBackend::upload`].
#[async_trait]
pub trait Uploadable: Send + Sync {
    /// Byte length of the content, `None` when the source cannot report one
    async fn size(&self) -> Result<Option<u64>>;

    /// Full content, `None` when the source has nothing readable
    async fn read(&self) -> Result<Option<Bytes>>;

    /// Content type declared by the source
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Original file name, used to infer a content type from its extension
    fn original_filename(&self) -> Option<&str> {
        None
    }

    /// Set when the source is a handle to an already stored blob
    fn as_stored_file(&self) -> Option<&StoredFile> {
        None
    }
}

/// Strategy that derives the id a new blob is stored under.
#[async_trait]
pub trait IdHasher: Send + Sync + fmt::Debug {
    async fn hash(&self, uploadable: &dyn Uploadable) -> Result<String>;
}
