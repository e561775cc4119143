//! Content-addressed JSON document store.
//!
//! [`MetadataClient`] is the seam between the submission flows and the
//! pinning service. [`PinataClient`] talks to the Pinata HTTP API and an IPFS
//! gateway; [`InMemoryMetadataStore`] keeps documents in process for demo
//! runs and tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Request never produced a response.
    Network(String),
    /// Service answered with a non-success status.
    Status { status: u16, body: String },
    /// Response body was not the expected JSON shape.
    Decode(String),
    /// No document stored under the hash.
    Missing(String),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::Network(e) => write!(f, "metadata network error: {e}"),
            MetadataError::Status { status, body } => {
                write!(f, "metadata service returned {status}: {body}")
            }
            MetadataError::Decode(e) => write!(f, "metadata decode error: {e}"),
            MetadataError::Missing(hash) => write!(f, "no metadata document for {hash}"),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<reqwest::Error> for MetadataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MetadataError::Decode(e.to_string())
        } else {
            MetadataError::Network(e.to_string())
        }
    }
}

/// Upload and fetch JSON documents by content hash.
///
/// Uploads may be retried by callers; implementations must not rely on
/// deduplication. Fetches fail explicitly on any non-success response.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn upload(&self, document: &Value) -> Result<String, MetadataError>;

    async fn fetch(&self, hash: &str) -> Result<Value, MetadataError>;
}

/// Fetch a document and decode it into `T`.
pub async fn fetch_as<T: DeserializeOwned>(
    client: &dyn MetadataClient,
    hash: &str,
) -> Result<T, MetadataError> {
    let value = client.fetch(hash).await?;
    serde_json::from_value(value).map_err(|e| MetadataError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Pinata
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PinataClient {
    client: Client,
    api_url: String,
    gateway: String,
    jwt: String,
}

impl PinataClient {
    pub fn new(
        api_url: impl Into<String>,
        gateway: impl Into<String>,
        jwt: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MetadataError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(PinataClient {
            client,
            api_url: api_url.into(),
            gateway: gateway.into(),
            jwt: jwt.into(),
        })
    }

    pub fn gateway_url(&self, hash: &str) -> String {
        format!("https://{}/ipfs/{}", self.gateway, hash)
    }
}

#[async_trait]
impl MetadataClient for PinataClient {
    async fn upload(&self, document: &Value) -> Result<String, MetadataError> {
        let body = serde_json::json!({
            "pinataContent": document,
            "pinataMetadata": {
                "name": format!("validify-{}", chrono::Utc::now().timestamp_millis())
            }
        });
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.jwt)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MetadataError::Status { status: status.as_u16(), body });
        }

        let result: Value = resp.json().await?;
        let hash = result
            .get("IpfsHash")
            .and_then(Value::as_str)
            .ok_or_else(|| MetadataError::Decode("response has no IpfsHash".to_string()))?;
        log::info!("Pinned metadata document {hash}");
        Ok(hash.to_string())
    }

    async fn fetch(&self, hash: &str) -> Result<Value, MetadataError> {
        let resp = self.client.get(self.gateway_url(hash)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MetadataError::Status { status: status.as_u16(), body });
        }
        Ok(resp.json().await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local document store. Identical documents map to identical hashes.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    documents: Mutex<HashMap<String, Value>>,
    fail_uploads: AtomicBool,
    fail_fetches: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document under a caller-chosen hash.
    pub fn insert(&self, hash: &str, document: Value) {
        let mut docs = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert(hash.to_string(), document);
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }
}

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// sha2-256 multihash prefix: function code 0x12, digest length 32.
const MULTIHASH_SHA256: [u8; 2] = [0x12, 0x20];

/// CIDv0 of the document text: base58 of the sha2-256 multihash, which
/// always renders as `Qm` followed by 44 characters.
fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut multihash = Vec::with_capacity(34);
    multihash.extend_from_slice(&MULTIHASH_SHA256);
    multihash.extend_from_slice(&digest);

    let base = BigUint::from(58u32);
    let mut n = BigUint::from_bytes_be(&multihash);
    let mut digits = Vec::with_capacity(46);
    while !n.is_zero() {
        let rem = (&n % &base).to_u32_digits().first().copied().unwrap_or(0);
        digits.push(BASE58_ALPHABET[rem as usize]);
        n /= &base;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

#[async_trait]
impl MetadataClient for InMemoryMetadataStore {
    async fn upload(&self, document: &Value) -> Result<String, MetadataError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MetadataError::Status {
                status: 503,
                body: "upload disabled".to_string(),
            });
        }
        let hash = content_hash(&document.to_string());
        self.insert(&hash, document.clone());
        Ok(hash)
    }

    async fn fetch(&self, hash: &str) -> Result<Value, MetadataError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(MetadataError::Status {
                status: 504,
                body: "gateway timeout".to_string(),
            });
        }
        let docs = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        docs.get(hash)
            .cloned()
            .ok_or_else(|| MetadataError::Missing(hash.to_string()))
    }
}
