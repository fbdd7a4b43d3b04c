//! temps-storage-azure: Azure Blob Storage backend for Temps uploads
//!
//! Implements [`temps_storage::StorageBackend`] over the Blob REST API with
//! Shared Key authentication. Blobs live flat in a single container, named by
//! the backend's id strategy.
//!
//! ```rust,no_run
//! use temps_storage::{StorageBackend, UploadBytes};
//! use temps_storage_azure::{AzureBackend, AzureStorageConfig};
//!
//! # async fn example() -> temps_storage::Result<()> {
//! let config = AzureStorageConfig::new("myaccount", "c2VjcmV0LWtleQ==", "uploads")
//!     .with_max_size(10 * 1024 * 1024);
//! let backend = AzureBackend::new(config)?;
//!
//! let file = backend
//!     .upload(&UploadBytes::new("hello").with_filename("hello.txt"))
//!     .await?;
//! assert_eq!(file.read().await?.as_deref(), Some(&b"hello"[..]));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod content_type;

pub use auth::SharedKeyCredential;
pub use backend::{AzureBackend, AZURE_KIND};
pub use client::{BlobClient, BlobPage, BlobProperties};
pub use config::{AzureStorageConfig, AzureStorageInputConfig, DEFAULT_API_VERSION};
pub use content_type::{guess_content_type, resolve_content_type, DEFAULT_CONTENT_TYPE};
