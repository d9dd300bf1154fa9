// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Asset store boundary: a key/blob object store with list-by-prefix,
//! download-URL resolution, put and delete.
//!
//! Two backends: [`MockAssetStore`] keeps everything in memory and supports
//! error injection for tests; [`GatewayAssetStore`] talks to an object-store
//! HTTP gateway with reqwest.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Server error: {0}")]
    Server(String),
}

/// One listing entry. The store only promises the key; everything else the
/// catalog derives from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub key: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// List keys under a prefix. An unknown prefix is an empty listing, not
    /// an error.
    async fn list(&self, prefix: &str) -> Result<Vec<StoreEntry>, StoreError>;

    /// Resolve a downloadable URL for a stored key.
    async fn get_download_url(&self, key: &str) -> Result<String, StoreError>;

    /// Fetch the bytes of a stored key.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Delete a key; absent keys fail with [`StoreError::NotFound`].
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory backend for tests.
///
/// Listing order is deterministic (lexicographic by key). A whole-store
/// error can be injected for the next call, and per-key errors can be pinned
/// so that one item fails while its siblings succeed.
#[derive(Default)]
pub struct MockAssetStore {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    injected_error: Arc<Mutex<Option<StoreError>>>,
    key_errors: Arc<Mutex<HashMap<String, String>>>,
    key_delays: Arc<Mutex<HashMap<String, Duration>>>,
    list_calls: AtomicUsize,
}

impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, bypassing `put`.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .expect("mock store lock")
            .insert(key.to_string(), data.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .expect("mock store lock")
            .contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("mock store lock")
            .keys()
            .cloned()
            .collect()
    }

    /// Fail the next store call with `error`, then recover.
    pub fn inject_error(&self, error: StoreError) {
        *self.injected_error.lock().expect("mock store lock") = Some(error);
    }

    /// Pin a persistent failure for one key's `get`/`get_download_url`.
    pub fn fail_key(&self, key: &str, message: &str) {
        self.key_errors
            .lock()
            .expect("mock store lock")
            .insert(key.to_string(), message.to_string());
    }

    /// Hold one key's `get`/`get_download_url` open, so tests can skew
    /// per-item completion order.
    pub fn delay_key(&self, key: &str, delay: Duration) {
        self.key_delays
            .lock()
            .expect("mock store lock")
            .insert(key.to_string(), delay);
    }

    fn take_injected(&self) -> Option<StoreError> {
        self.injected_error.lock().expect("mock store lock").take()
    }

    /// Number of `list` calls observed, for asserting refresh counts.
    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn key_error(&self, key: &str) -> Option<StoreError> {
        self.key_errors
            .lock()
            .expect("mock store lock")
            .get(key)
            .map(|msg| StoreError::Network(msg.clone()))
    }

    async fn apply_delay(&self, key: &str) {
        let delay = self
            .key_delays
            .lock()
            .expect("mock store lock")
            .get(key)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoreEntry>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        let objects = self.objects.lock().expect("mock store lock");
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .map(|k| StoreEntry { key: k.clone() })
            .collect())
    }

    async fn get_download_url(&self, key: &str) -> Result<String, StoreError> {
        self.apply_delay(key).await;
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        if let Some(err) = self.key_error(key) {
            return Err(err);
        }
        if !self.contains(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(format!("mock://store/{key}"))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.apply_delay(key).await;
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        if let Some(err) = self.key_error(key) {
            return Err(err);
        }
        self.objects
            .lock()
            .expect("mock store lock")
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        self.insert(key, data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if let Some(err) = self.take_injected() {
            return Err(err);
        }
        self.objects
            .lock()
            .expect("mock store lock")
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ListReply {
    entries: Vec<StoreEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlReply {
    url: String,
}

/// HTTP client for an object-store gateway.
///
/// REST shape: `GET {base}/list?prefix=`, `GET {base}/url/{key}`,
/// `PUT {base}/blob/{key}`, `DELETE {base}/blob/{key}`. A 404 on delete or
/// URL resolution maps to [`StoreError::NotFound`]; blob downloads go
/// through the resolved URL, same as a browser client would.
pub struct GatewayAssetStore {
    client: Client,
    base_url: String,
}

impl GatewayAssetStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AssetStore for GatewayAssetStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let response = self
            .client
            .get(format!("{}/list", self.base_url))
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if response.status() == 404 {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(StoreError::Server(format!(
                "list returned status {}",
                response.status()
            )));
        }
        let reply: ListReply = response
            .json()
            .await
            .map_err(|e| StoreError::Server(format!("invalid list reply: {e}")))?;
        debug!(prefix, count = reply.entries.len(), "listed store prefix");
        Ok(reply.entries)
    }

    async fn get_download_url(&self, key: &str) -> Result<String, StoreError> {
        let response = self
            .client
            .get(format!("{}/url/{}", self.base_url, key))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if response.status() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            return Err(StoreError::Server(format!(
                "url resolution returned status {}",
                response.status()
            )));
        }
        let reply: UrlReply = response
            .json()
            .await
            .map_err(|e| StoreError::Server(format!("invalid url reply: {e}")))?;
        Ok(reply.url)
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let url = self.get_download_url(key).await?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if response.status() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            return Err(StoreError::Server(format!(
                "download returned status {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        let response = self
            .client
            .put(format!("{}/blob/{}", self.base_url, key))
            .body(data)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Server(format!(
                "put returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(format!("{}/blob/{}", self.base_url, key))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if response.status() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            return Err(StoreError::Server(format!(
                "delete returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
