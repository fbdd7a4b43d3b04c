//! [`StorageBackend`] over an Azure Blob Storage container

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use temps_storage::{
    read_uploadable, verify_id, verify_uploadable, Confirm, IdHasher, RandomHasher, Result,
    StorageBackend, StorageError, StoreIdentity, StoredFile, Uploadable,
};
use tracing::{debug, info, warn};

use crate::client::BlobClient;
use crate::config::{AzureStorageConfig, AzureStorageInputConfig};
use crate::content_type::resolve_content_type;

/// Identity kind shared by every Azure backend
pub const AZURE_KIND: &str = "azure";

/// Stores blobs in one container of one storage account.
///
/// Clones share the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct AzureBackend {
    client: Arc<BlobClient>,
    hasher: Arc<dyn IdHasher>,
    max_size: Option<u64>,
}

impl AzureBackend {
    /// Build a backend from validated configuration.
    ///
    /// Fails with [`StorageError::Configuration`] when the account, key or
    /// container is missing, the key is not base64 or an option is malformed.
    pub fn new(config: AzureStorageConfig) -> Result<Self> {
        let client = BlobClient::new(&config)?;

        info!(
            "Azure storage backend ready: account={}, container={}, endpoint={}",
            client.account(),
            client.container(),
            client.endpoint()
        );

        Ok(Self {
            client: Arc::new(client),
            hasher: Arc::new(RandomHasher),
            max_size: config.max_size,
        })
    }

    /// Build a backend from `AZURE_STORAGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config = AzureStorageConfig::try_from(AzureStorageInputConfig::from_env()?)?;
        Self::new(config)
    }

    /// Replace the id strategy (random by default)
    pub fn with_hasher(mut self, hasher: Arc<dyn IdHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn account_name(&self) -> &str {
        self.client.account()
    }

    pub fn container(&self) -> &str {
        self.client.container()
    }

    fn handle(&self, id: String) -> StoredFile {
        StoredFile::new(Arc::new(self.clone()), id)
    }
}

/// 404 becomes `None`, everything else passes through
fn absent_on_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn identity(&self) -> StoreIdentity {
        StoreIdentity::new(AZURE_KIND, self.client.account(), self.client.container())
    }

    fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    async fn upload(&self, uploadable: &dyn Uploadable) -> Result<StoredFile> {
        verify_uploadable(uploadable, self.max_size).await?;

        let id = self.hasher.hash(uploadable).await?;
        verify_id(&id)?;

        let same_store = uploadable
            .as_stored_file()
            .filter(|file| file.backend().identity() == self.identity());

        match same_store {
            Some(source) => self.client.copy_blob(&id, source.id()).await?,
            None => {
                let data = read_uploadable(uploadable).await?;
                let content_type = resolve_content_type(uploadable);
                self.client.put_blob(&id, data, &content_type).await?;
            }
        }

        Ok(self.handle(id))
    }

    fn get(&self, id: &str) -> Result<StoredFile> {
        verify_id(id)?;
        Ok(self.handle(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        verify_id(id)?;
        absent_on_not_found(self.client.delete_blob(id).await)?;
        Ok(())
    }

    async fn open(&self, id: &str) -> Result<Option<Cursor<Bytes>>> {
        Ok(self.read(id).await?.map(Cursor::new))
    }

    async fn read(&self, id: &str) -> Result<Option<Bytes>> {
        verify_id(id)?;
        absent_on_not_found(self.client.get_blob(id).await)
    }

    async fn size(&self, id: &str) -> Result<Option<u64>> {
        verify_id(id)?;
        let properties = absent_on_not_found(self.client.get_blob_properties(id).await)?;
        Ok(properties.map(|p| p.content_length))
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        verify_id(id)?;
        let properties = absent_on_not_found(self.client.get_blob_properties(id).await)?;
        Ok(properties.is_some())
    }

    async fn clear(&self, confirm: Option<Confirm>) -> Result<()> {
        if confirm.is_none() {
            return Err(StorageError::ConfirmationRequired);
        }

        let mut names = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self.client.list_blobs(marker.as_deref()).await?;
            names.extend(page.names);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        let total = names.len();
        debug!("Clearing {} blobs from {}", total, self.identity());

        let mut failed = Vec::new();
        let mut first_error: Option<StorageError> = None;
        for name in names {
            match self.client.delete_blob(&name).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!("Failed to delete {} while clearing: {}", name, e);
                    failed.push(name);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(source) => Err(StorageError::ClearIncomplete {
                failed,
                total,
                source: Box::new(source),
            }),
            None => {
                info!("Cleared {} blobs from {}", total, self.identity());
                Ok(())
            }
        }
    }
}
