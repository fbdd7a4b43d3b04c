use thiserror::Error;

/// Unified error type for all storage backend operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Required identity or credential missing or malformed at construction
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Upload source exceeds the configured size ceiling
    #[error("Upload too large: {size} bytes exceeds the maximum of {max_size} bytes")]
    TooLarge { size: u64, max_size: u64 },

    /// Blob id is empty or contains characters outside [A-Za-z0-9]
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    /// Upload source cannot report its size or has nothing to read
    #[error("Invalid uploadable: {0}")]
    InvalidUploadable(String),

    /// Destructive operation invoked without the confirmation sentinel
    #[error("Confirmation required: pass Some(Confirm) to clear the store")]
    ConfirmationRequired,

    /// Non-success response from the remote service
    #[error("Remote error (HTTP {status}{}): {message}", .code.as_deref().map(|c| format!(", {}", c)).unwrap_or_default())]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Success response whose headers or body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Network or transport failure raised by the HTTP client
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Local I/O failure (file sources, downloads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more deletes failed while clearing a store
    #[error("Clear incomplete: {} of {total} deletes failed", .failed.len())]
    ClearIncomplete {
        failed: Vec<String>,
        total: usize,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Create a configuration error with custom message
    pub fn configuration(msg: impl Into<String>) -> Self {
        StorageError::Configuration(msg.into())
    }

    /// Create an invalid uploadable error with custom message
    pub fn invalid_uploadable(msg: impl Into<String>) -> Self {
        StorageError::InvalidUploadable(msg.into())
    }

    /// Create an invalid response error with custom message
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        StorageError::InvalidResponse(msg.into())
    }

    /// Wrap a transport-level error from an HTTP client
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Transport(Box::new(err))
    }

    /// True when the remote service answered 404 for the addressed object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Remote { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
