//! Minimal Azure Blob REST client signed with Shared Key

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use temps_storage::{Result, StorageError};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::SharedKeyCredential;
use crate::config::{AzureStorageConfig, OPTION_API_VERSION, OPTION_ENDPOINT, OPTION_TIMEOUT_SECS};

const X_MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
const X_MS_VERSION: HeaderName = HeaderName::from_static("x-ms-version");
const X_MS_CLIENT_REQUEST_ID: HeaderName = HeaderName::from_static("x-ms-client-request-id");
const X_MS_BLOB_TYPE: HeaderName = HeaderName::from_static("x-ms-blob-type");
const X_MS_BLOB_CONTENT_TYPE: HeaderName = HeaderName::from_static("x-ms-blob-content-type");
const X_MS_COPY_SOURCE: HeaderName = HeaderName::from_static("x-ms-copy-source");
const X_MS_ERROR_CODE: &str = "x-ms-error-code";

/// Headers the client sets per request; provider options may not carry them
const RESERVED_HEADERS: [HeaderName; 6] = [
    X_MS_DATE,
    X_MS_VERSION,
    X_MS_CLIENT_REQUEST_ID,
    X_MS_BLOB_TYPE,
    X_MS_BLOB_CONTENT_TYPE,
    X_MS_COPY_SOURCE,
];

/// Properties returned by Get Blob Properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_length: u64,
    pub content_type: Option<String>,
}

/// One page of a List Blobs enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobPage {
    pub names: Vec<String>,
    /// Marker for the next page, `None` on the last one
    pub next_marker: Option<String>,
}

/// List Blobs response body
#[derive(Debug, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: Option<BlobsWrapper>,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobsWrapper {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
struct BlobItem {
    #[serde(rename = "Name")]
    name: String,
}

/// Error response body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code", default)]
    code: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

/// Client bound to a single container
#[derive(Debug, Clone)]
pub struct BlobClient {
    http: Client,
    credential: SharedKeyCredential,
    endpoint: Url,
    container: String,
    api_version: HeaderValue,
    extra_headers: HeaderMap,
}

impl BlobClient {
    pub fn new(config: &AzureStorageConfig) -> Result<Self> {
        config.validate()?;

        let credential = SharedKeyCredential::new(&config.account_name, &config.access_key)?;
        let endpoint = parse_endpoint(&config.endpoint())?;
        let api_version = HeaderValue::from_str(config.api_version()).map_err(|e| {
            StorageError::configuration(format!("{} is not a valid header value: {}", OPTION_API_VERSION, e))
        })?;

        let mut builder = Client::builder();
        let mut extra_headers = HeaderMap::new();

        for (key, value) in &config.options {
            match key.as_str() {
                OPTION_ENDPOINT | OPTION_API_VERSION => {}
                OPTION_TIMEOUT_SECS => {
                    let secs = value.trim().parse::<u64>().map_err(|e| {
                        StorageError::configuration(format!("{} must be an integer: {}", OPTION_TIMEOUT_SECS, e))
                    })?;
                    builder = builder.timeout(Duration::from_secs(secs));
                }
                _ if key.to_ascii_lowercase().starts_with("x-ms-") => {
                    let name = HeaderName::from_bytes(key.to_ascii_lowercase().as_bytes())
                        .map_err(|e| StorageError::configuration(format!("invalid header {}: {}", key, e)))?;
                    if RESERVED_HEADERS.contains(&name) {
                        return Err(StorageError::configuration(format!(
                            "option {} sets a header managed by the client",
                            key
                        )));
                    }
                    let value = HeaderValue::from_str(value).map_err(|e| {
                        StorageError::configuration(format!("invalid value for header {}: {}", key, e))
                    })?;
                    extra_headers.insert(name, value);
                }
                _ => warn!("Ignoring unsupported Azure storage option '{}'", key),
            }
        }

        let http = builder
            .build()
            .map_err(|e| StorageError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credential,
            endpoint,
            container: config.container.clone(),
            api_version,
            extra_headers,
        })
    }

    pub fn account(&self) -> &str {
        self.credential.account()
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL of the container, `{endpoint}/{container}`
    pub fn container_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        // parse_endpoint rejects cannot-be-a-base URLs
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.container);
        }
        url
    }

    /// URL of a blob, `{endpoint}/{container}/{name}`
    pub fn blob_url(&self, name: &str) -> Url {
        let mut url = self.container_url();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(name);
        }
        url
    }

    /// Put Blob as a block blob
    pub async fn put_blob(&self, name: &str, body: Bytes, content_type: &str) -> Result<()> {
        debug!("PUT {} ({} bytes, {})", name, body.len(), content_type);

        let request = self
            .http
            .request(Method::PUT, self.blob_url(name))
            .header(X_MS_BLOB_TYPE, "BlockBlob")
            .header(X_MS_BLOB_CONTENT_TYPE, content_type)
            .header(CONTENT_TYPE, content_type)
            .body(body);

        self.send(request).await?;
        Ok(())
    }

    /// Copy Blob from another blob in the same container
    pub async fn copy_blob(&self, name: &str, source_name: &str) -> Result<()> {
        let source = self.blob_url(source_name);
        debug!("COPY {} -> {}", source_name, name);

        let request = self
            .http
            .request(Method::PUT, self.blob_url(name))
            .header(X_MS_COPY_SOURCE, source.as_str())
            .header(CONTENT_LENGTH, 0u64);

        self.send(request).await?;
        Ok(())
    }

    pub async fn get_blob(&self, name: &str) -> Result<Bytes> {
        debug!("GET {}", name);

        let response = self
            .send(self.http.request(Method::GET, self.blob_url(name)))
            .await?;
        response.bytes().await.map_err(StorageError::transport)
    }

    pub async fn get_blob_properties(&self, name: &str) -> Result<BlobProperties> {
        debug!("HEAD {}", name);

        let response = self
            .send(self.http.request(Method::HEAD, self.blob_url(name)))
            .await?;

        // HEAD responses carry no body, so the header is read directly
        properties_from_headers(response.headers())
    }

    pub async fn delete_blob(&self, name: &str) -> Result<()> {
        debug!("DELETE {}", name);

        self.send(self.http.request(Method::DELETE, self.blob_url(name)))
            .await?;
        Ok(())
    }

    /// List Blobs, one page starting at `marker`
    pub async fn list_blobs(&self, marker: Option<&str>) -> Result<BlobPage> {
        debug!("LIST {} marker={:?}", self.container, marker);

        let mut url = self.container_url();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container");
            query.append_pair("comp", "list");
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }

        let response = self.send(self.http.request(Method::GET, url)).await?;
        let body = response.text().await.map_err(StorageError::transport)?;

        parse_blob_page(&body)
    }

    /// Stamp, sign and execute a request. Non-success statuses become
    /// [`StorageError::Remote`].
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let mut request = builder.build().map_err(StorageError::transport)?;

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let headers = request.headers_mut();
        for (name, value) in &self.extra_headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers.insert(X_MS_DATE, header_value(&date)?);
        headers.insert(X_MS_VERSION, self.api_version.clone());
        headers.insert(
            X_MS_CLIENT_REQUEST_ID,
            header_value(&Uuid::new_v4().to_string())?,
        );

        let authorization = self.credential.authorization(&request)?;
        request
            .headers_mut()
            .insert(reqwest::header::AUTHORIZATION, header_value(&authorization)?);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(StorageError::transport)?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| StorageError::configuration(format!("invalid header value: {}", e)))
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| StorageError::configuration(format!("invalid endpoint {}: {}", endpoint, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(StorageError::configuration(format!(
            "endpoint must be an http(s) URL: {}",
            endpoint
        )));
    }
    Ok(url)
}

fn parse_blob_page(body: &str) -> Result<BlobPage> {
    let parsed: EnumerationResults = quick_xml::de::from_str(body.trim_start_matches('\u{feff}'))
        .map_err(|e| {
            StorageError::invalid_response(format!("Failed to parse List Blobs response: {}", e))
        })?;

    Ok(BlobPage {
        names: parsed
            .blobs
            .map(|blobs| blobs.blob.into_iter().map(|item| item.name).collect())
            .unwrap_or_default(),
        next_marker: parsed.next_marker.filter(|marker| !marker.trim().is_empty()),
    })
}

fn properties_from_headers(headers: &HeaderMap) -> Result<BlobProperties> {
    let raw_length = headers
        .get(CONTENT_LENGTH)
        .ok_or_else(|| StorageError::invalid_response("Get Blob Properties returned no Content-Length"))?;
    let content_length = raw_length
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            StorageError::invalid_response(format!(
                "Get Blob Properties returned an unparseable Content-Length: {:?}",
                raw_length
            ))
        })?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    Ok(BlobProperties {
        content_length,
        content_type,
    })
}

async fn remote_error(response: Response) -> StorageError {
    let status = response.status();
    let header_code = response
        .headers()
        .get(X_MS_ERROR_CODE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.unwrap_or_default();
    let parsed = quick_xml::de::from_str::<ErrorBody>(body.trim_start_matches('\u{feff}')).ok();
    let (body_code, body_message) = match parsed {
        Some(error) => (error.code, error.message),
        None => (None, None),
    };

    let message = body_message
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        });

    StorageError::Remote {
        status: status.as_u16(),
        code: header_code.or(body_code),
        message,
    }
}
