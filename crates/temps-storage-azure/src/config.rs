//! Azure Blob Storage backend configuration types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use temps_storage::{Result, StorageError};

/// Blob REST API version sent with every request unless overridden
pub const DEFAULT_API_VERSION: &str = "2023-11-03";

/// Option key overriding the service endpoint (emulators, sovereign clouds)
pub const OPTION_ENDPOINT: &str = "endpoint";
/// Option key overriding the REST API version
pub const OPTION_API_VERSION: &str = "api_version";
/// Option key setting an HTTP client timeout in seconds
pub const OPTION_TIMEOUT_SECS: &str = "timeout_secs";

pub const ENV_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
pub const ENV_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";
pub const ENV_CONTAINER: &str = "AZURE_STORAGE_CONTAINER";
pub const ENV_MAX_SIZE: &str = "AZURE_STORAGE_MAX_SIZE";
pub const ENV_ENDPOINT: &str = "AZURE_STORAGE_ENDPOINT";
pub const ENV_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// User-provided configuration for the Azure backend (every field optional)
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AzureStorageInputConfig {
    /// Storage account name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    /// Base64 storage account access key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Container holding the blobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Upload ceiling in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    /// Provider options forwarded to the client
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,
}

impl AzureStorageInputConfig {
    /// Read configuration from the process environment.
    ///
    /// `AZURE_STORAGE_CONNECTION_STRING` fills in the account, key and
    /// endpoint when the dedicated variables are not set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let connection = lookup(ENV_CONNECTION_STRING)
            .map(|s| parse_connection_string(&s))
            .unwrap_or_default();

        let max_size = lookup(ENV_MAX_SIZE)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    StorageError::configuration(format!("{} must be an integer: {}", ENV_MAX_SIZE, e))
                })
            })
            .transpose()?;

        let mut options = HashMap::new();
        if let Some(endpoint) = lookup(ENV_ENDPOINT).or_else(|| connection_endpoint(&connection)) {
            options.insert(OPTION_ENDPOINT.to_string(), endpoint);
        }

        Ok(Self {
            account_name: lookup(ENV_ACCOUNT).or_else(|| connection.get("AccountName").cloned()),
            access_key: lookup(ENV_ACCESS_KEY).or_else(|| connection.get("AccountKey").cloned()),
            container: lookup(ENV_CONTAINER),
            max_size,
            options,
        })
    }
}

impl fmt::Debug for AzureStorageInputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureStorageInputConfig")
            .field("account_name", &self.account_name)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("container", &self.container)
            .field("max_size", &self.max_size)
            .field("options", &self.options)
            .finish()
    }
}

/// Resolved configuration for the Azure backend
#[derive(Clone, Serialize, Deserialize)]
pub struct AzureStorageConfig {
    pub account_name: String,
    pub access_key: String,
    pub container: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,
}

impl AzureStorageConfig {
    pub fn new(
        account_name: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            access_key: access_key.into(),
            container: container.into(),
            max_size: None,
            options: HashMap::new(),
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Fail fast when identity or credential fields are missing
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("account_name", &self.account_name),
            ("access_key", &self.access_key),
            ("container", &self.container),
        ] {
            if value.trim().is_empty() {
                return Err(StorageError::configuration(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    /// Service endpoint, `https://{account}.blob.core.windows.net` by default
    pub fn endpoint(&self) -> String {
        self.options
            .get(OPTION_ENDPOINT)
            .cloned()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", self.account_name))
    }

    pub fn api_version(&self) -> &str {
        self.options
            .get(OPTION_API_VERSION)
            .map(String::as_str)
            .unwrap_or(DEFAULT_API_VERSION)
    }
}

impl fmt::Debug for AzureStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureStorageConfig")
            .field("account_name", &self.account_name)
            .field("access_key", &"<redacted>")
            .field("container", &self.container)
            .field("max_size", &self.max_size)
            .field("options", &self.options)
            .finish()
    }
}

impl TryFrom<AzureStorageInputConfig> for AzureStorageConfig {
    type Error = StorageError;

    fn try_from(input: AzureStorageInputConfig) -> Result<Self> {
        let required = |value: Option<String>, field: &str| {
            value.ok_or_else(|| StorageError::configuration(format!("{} is required", field)))
        };

        let config = Self {
            account_name: required(input.account_name, "account_name")?,
            access_key: required(input.access_key, "access_key")?,
            container: required(input.container, "container")?,
            max_size: input.max_size,
            options: input.options,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Split `Key=Value;Key=Value` pairs. Values may themselves contain `=`.
pub fn parse_connection_string(s: &str) -> HashMap<String, String> {
    s.split(';')
        .filter_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn connection_endpoint(connection: &HashMap<String, String>) -> Option<String> {
    if let Some(endpoint) = connection.get("BlobEndpoint") {
        return Some(endpoint.clone());
    }
    let suffix = connection.get("EndpointSuffix")?;
    let account = connection.get("AccountName")?;
    let protocol = connection
        .get("DefaultEndpointsProtocol")
        .map(String::as_str)
        .unwrap_or("https");
    Some(format!("{}://{}.blob.{}", protocol, account, suffix))
}
