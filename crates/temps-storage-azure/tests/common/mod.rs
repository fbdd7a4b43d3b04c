//! Common test utilities shared across Azure backend integration tests
//!
//! - An in-memory fake of the Blob service mounted on a wiremock server
//! - Backend constructors pointed at that server
//! - Tracing setup for readable failures

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use temps_storage_azure::{AzureBackend, AzureStorageConfig};
use url::Url;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ACCOUNT: &str = "devstoreaccount1";
// base64("secret-key")
pub const ACCESS_KEY: &str = "c2VjcmV0LWtleQ==";
pub const CONTAINER: &str = "uploads";

#[derive(Debug, Clone)]
pub struct FakeBlob {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Blob service fake keyed by (container, blob name).
///
/// Supports Put Blob, Copy Blob, Get Blob, Get Blob Properties, Delete Blob
/// and paginated List Blobs.
#[derive(Clone)]
pub struct FakeBlobService {
    blobs: Arc<Mutex<BTreeMap<(String, String), FakeBlob>>>,
    page_size: usize,
}

impl FakeBlobService {
    pub fn new(page_size: usize) -> Self {
        Self {
            blobs: Arc::new(Mutex::new(BTreeMap::new())),
            page_size,
        }
    }

    /// Mount as the fallback responder for every request
    pub async fn mount(&self, server: &MockServer) {
        Mock::given(any())
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    pub fn insert(&self, container: &str, name: &str, data: &[u8]) {
        self.blobs.lock().unwrap().insert(
            (container.to_string(), name.to_string()),
            FakeBlob {
                data: data.to_vec(),
                content_type: None,
            },
        );
    }

    pub fn get(&self, container: &str, name: &str) -> Option<FakeBlob> {
        self.blobs
            .lock()
            .unwrap()
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }

    pub fn count(&self, container: &str) -> usize {
        self.blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .count()
    }

    fn not_found(code: &str) -> ResponseTemplate {
        ResponseTemplate::new(404)
            .insert_header("x-ms-error-code", code)
            .insert_header("content-type", "application/xml")
            .set_body_string(format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>{}</Code><Message>The specified resource does not exist.</Message></Error>",
                code
            ))
    }

    fn put(&self, request: &Request, container: &str, name: &str) -> ResponseTemplate {
        let key = (container.to_string(), name.to_string());
        let mut blobs = self.blobs.lock().unwrap();

        if let Some(source) = request.headers.get("x-ms-copy-source") {
            let source = source.to_str().ok().and_then(|s| Url::parse(s).ok());
            let source_name = source
                .as_ref()
                .and_then(|url| url.path_segments())
                .and_then(|mut segments| segments.next_back().map(str::to_string));

            let copied = source_name
                .and_then(|source_name| blobs.get(&(container.to_string(), source_name)).cloned());
            return match copied {
                Some(blob) => {
                    blobs.insert(key, blob);
                    ResponseTemplate::new(202).insert_header("x-ms-copy-status", "success")
                }
                None => Self::not_found("CannotVerifyCopySource"),
            };
        }

        let content_type = request
            .headers
            .get("x-ms-blob-content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        blobs.insert(
            key,
            FakeBlob {
                data: request.body.clone(),
                content_type,
            },
        );
        ResponseTemplate::new(201)
    }

    fn list(&self, request: &Request, container: &str) -> ResponseTemplate {
        let marker = request
            .url
            .query_pairs()
            .find(|(name, _)| name == "marker")
            .map(|(_, value)| value.into_owned());

        let names: Vec<String> = self
            .blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, name)| name.clone())
            .filter(|name| marker.as_ref().map_or(true, |m| name >= m))
            .collect();

        let page: Vec<&String> = names.iter().take(self.page_size).collect();
        let next_marker = names.get(self.page_size).cloned().unwrap_or_default();

        let blobs: String = page
            .iter()
            .map(|name| {
                format!(
                    "<Blob><Name>{}</Name><Properties><BlobType>BlockBlob</BlobType></Properties></Blob>",
                    name
                )
            })
            .collect();

        ResponseTemplate::new(200)
            .insert_header("content-type", "application/xml")
            .set_body_string(format!(
                "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults ServiceEndpoint=\"http://127.0.0.1/\" ContainerName=\"{}\"><Blobs>{}</Blobs><NextMarker>{}</NextMarker></EnumerationResults>",
                container, blobs, next_marker
            ))
    }
}

impl Respond for FakeBlobService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path().trim_start_matches('/').to_string();
        let (container, name) = match path.split_once('/') {
            Some((container, name)) => (container.to_string(), name.to_string()),
            None => (path.clone(), String::new()),
        };
        let key = (container.clone(), name.clone());

        match (request.method.as_str(), name.is_empty()) {
            ("GET", true) => self.list(request, &container),
            ("PUT", false) => self.put(request, &container, &name),
            ("GET", false) => match self.blobs.lock().unwrap().get(&key) {
                Some(blob) => {
                    let content_type = blob
                        .content_type
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".to_string());
                    ResponseTemplate::new(200)
                        .set_body_bytes(blob.data.clone())
                        .insert_header("content-type", content_type.as_str())
                }
                None => Self::not_found("BlobNotFound"),
            },
            ("HEAD", false) => match self.blobs.lock().unwrap().get(&key) {
                Some(blob) => ResponseTemplate::new(200)
                    .set_body_bytes(blob.data.clone())
                    .insert_header("content-length", blob.data.len().to_string().as_str()),
                None => ResponseTemplate::new(404).insert_header("x-ms-error-code", "BlobNotFound"),
            },
            ("DELETE", false) => match self.blobs.lock().unwrap().remove(&key) {
                Some(_) => ResponseTemplate::new(202),
                None => Self::not_found("BlobNotFound"),
            },
            _ => ResponseTemplate::new(400).insert_header("x-ms-error-code", "UnsupportedHttpVerb"),
        }
    }
}

pub fn config(server: &MockServer, container: &str) -> AzureStorageConfig {
    AzureStorageConfig::new(ACCOUNT, ACCESS_KEY, container).with_option("endpoint", server.uri())
}

pub fn backend(server: &MockServer) -> AzureBackend {
    AzureBackend::new(config(server, CONTAINER)).unwrap()
}

/// Mock server with the fake service mounted, page size 1000
pub async fn start() -> (MockServer, FakeBlobService) {
    start_with_page_size(1000).await
}

pub async fn start_with_page_size(page_size: usize) -> (MockServer, FakeBlobService) {
    init_tracing();
    let server = MockServer::start().await;
    let service = FakeBlobService::new(page_size);
    service.mount(&server).await;
    (server, service)
}

/// Requests the server has seen so far
pub async fn requests(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("temps_storage_azure=debug")
        .try_init();
}
