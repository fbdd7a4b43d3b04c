//! Shared Key authorization for the Blob REST API
//!
//! The signature covers the request verb, a fixed list of standard headers,
//! every `x-ms-*` header and the canonicalized resource:
//!
//! ```text
//! VERB\n
//! Content-Encoding\n
//! Content-Language\n
//! Content-Length\n
//! Content-MD5\n
//! Content-Type\n
//! Date\n
//! If-Modified-Since\n
//! If-Match\n
//! If-None-Match\n
//! If-Unmodified-Since\n
//! Range\n
//! CanonicalizedHeaders
//! CanonicalizedResource
//! ```

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use reqwest::Request;
use sha2::Sha256;
use temps_storage::{Result, StorageError};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Account name plus decoded access key
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    pub fn new(account: impl Into<String>, access_key: &str) -> Result<Self> {
        let key = BASE64_STANDARD.decode(access_key.trim()).map_err(|e| {
            StorageError::configuration(format!("access_key is not valid base64: {}", e))
        })?;

        Ok(Self {
            account: account.into(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// `Authorization` header value for a fully built request.
    ///
    /// The request must already carry its `x-ms-date` header.
    pub fn authorization(&self, request: &Request) -> Result<String> {
        let string_to_sign = string_to_sign(&self.account, request);

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::configuration(format!("HMAC key error: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account, signature))
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

fn string_to_sign(account: &str, request: &Request) -> String {
    let headers = request.headers();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    };

    // Zero-length bodies sign as an empty Content-Length
    let content_length = match request.body().and_then(|body| body.as_bytes()) {
        Some(bytes) if !bytes.is_empty() => bytes.len().to_string(),
        _ => String::new(),
    };

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}{}",
        request.method().as_str(),
        header("content-encoding"),
        header("content-language"),
        content_length,
        header("content-md5"),
        header("content-type"),
        // Date is carried in x-ms-date instead
        "",
        header("if-modified-since"),
        header("if-match"),
        header("if-none-match"),
        header("if-unmodified-since"),
        header("range"),
        canonicalized_headers(headers),
        canonicalized_resource(account, request.url()),
    )
}

fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.as_str();
        if !name.starts_with("x-ms-") {
            continue;
        }
        if let Ok(value) = value.to_str() {
            ms_headers.entry(name).or_default().push(value.trim());
        }
    }

    ms_headers
        .into_iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{}{}", account, url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        resource.push_str(&format!("\n{}:{}", name, values.join(",")));
    }

    resource
}
