//! # temps-storage
//!
//! Pluggable blob storage for Temps file uploads.
//!
//! This crate defines the contract between the upload layer and the place
//! file content actually lives:
//!
//! - **StorageBackend**: core trait every backend implements (upload, get,
//!   delete, open, read, size, exists, clear)
//! - **StoredFile**: lazy (backend, id) handle returned by uploads
//! - **Uploadable**: anything that can be uploaded (bytes, local files, other
//!   stored files)
//! - **IdHasher**: strategy deciding the id a new blob is stored under
//!
//! Missing blobs are not errors: read-path operations return `None` or
//! `false`, and deleting a missing blob succeeds.
//!
//! ## Example
//!
//! ```rust
//! use temps_storage::{Confirm, MemoryBackend, StorageBackend, UploadBytes};
//!
//! # async fn example() -> temps_storage::Result<()> {
//! let backend = MemoryBackend::new();
//!
//! let file = backend.upload(&UploadBytes::new("hello")).await?;
//! assert_eq!(file.size().await?, Some(5));
//!
//! // Unknown ids are absent, not errors
//! assert!(!backend.exists("doesnotexist").await?);
//!
//! backend.clear(Some(Confirm)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Backend Implementation
//!
//! Backend crates run [`verify_id`] and [`verify_uploadable`] before any
//! remote call and map their service's "not found" answer onto
//! [`StorageError::is_not_found`].
//!
//! Backend crates:
//! - `temps-storage-azure` - Azure Blob Storage

pub mod error;
pub mod file;
pub mod hasher;
pub mod memory;
pub mod traits;
pub mod types;
pub mod uploadable;

// Re-export commonly used items
pub use error::{Result, StorageError};
pub use file::StoredFile;
pub use hasher::{RandomHasher, Sha256Hasher};
pub use memory::MemoryBackend;
pub use traits::{IdHasher, StorageBackend, Uploadable};
pub use types::{verify_id, Confirm, StoreIdentity};
pub use uploadable::{read_uploadable, verify_uploadable, UploadBytes, UploadPath};
