use std::fmt;

use crate::error::{Result, StorageError};

/// Identifies the physical store a backend addresses.
///
/// Two backends with equal identities read and write the same blobs, which is
/// what allows an upload of a [`StoredFile`](crate::StoredFile) to become a
/// server-side copy instead of a byte transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreIdentity {
    /// Backend type identifier (azure, memory, ...)
    pub kind: &'static str,
    /// Storage account, or an instance tag for in-process stores
    pub account: String,
    /// Container (bucket) name
    pub container: String,
}

impl StoreIdentity {
    pub fn new(
        kind: &'static str,
        account: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            account: account.into(),
            container: container.into(),
        }
    }
}

impl fmt::Display for StoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.kind, self.account, self.container)
    }
}

/// Sentinel that must be passed to [`StorageBackend::clear`](crate::StorageBackend::clear).
///
/// ```rust
/// use temps_storage::Confirm;
///
/// let confirmation = Some(Confirm);
/// assert!(confirmation.is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirm;

/// Reject ids that are empty or contain anything but ASCII letters and digits.
pub fn verify_id(id: &str) -> Result<()> {
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}
