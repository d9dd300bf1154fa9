// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client for the remote detection endpoint, single and batched.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::types::{
    DetectionError, DetectionMode, DetectionOutcome, DetectionRecord, DetectionReply,
};
use crate::catalog::keys;
use crate::storage::AssetStore;

/// Seam between the batch driver and the HTTP endpoint, so tests can swap
/// in a scripted endpoint.
#[async_trait]
pub trait DetectionApi: Send + Sync {
    async fn detect(
        &self,
        image: Bytes,
        filename: &str,
        mode: DetectionMode,
    ) -> Result<DetectionReply, DetectionError>;
}

#[derive(Debug, Deserialize)]
struct RawDetectReply {
    s3_url: Option<String>,
    filename: Option<String>,
    #[serde(default)]
    detections: Vec<DetectionRecord>,
}

/// reqwest client for `POST {endpoint}/detect` with a multipart body of
/// `image` (binary) and `mode` (text).
pub struct HttpDetectionApi {
    client: Client,
    endpoint: String,
}

impl HttpDetectionApi {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, DetectionError> {
        url::Url::parse(endpoint)
            .map_err(|e| DetectionError::Transport(format!("invalid endpoint url: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DetectionError::Transport(e.to_string()))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("detection client configured: endpoint={}", endpoint);
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DetectionApi for HttpDetectionApi {
    async fn detect(
        &self,
        image: Bytes,
        filename: &str,
        mode: DetectionMode,
    ) -> Result<DetectionReply, DetectionError> {
        let part = multipart::Part::bytes(image.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| DetectionError::Transport(e.to_string()))?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("mode", mode.as_str());

        let response = self
            .client
            .post(format!("{}/detect", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DetectionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectionError::Endpoint(status.as_u16()));
        }

        let raw: RawDetectReply = response
            .json()
            .await
            .map_err(|e| DetectionError::Parse(e.to_string()))?;

        // 2xx without the result-image reference is still a failure, never
        // a partial success.
        let s3_url = raw
            .s3_url
            .filter(|u| !u.is_empty())
            .ok_or(DetectionError::MissingResultUrl)?;

        debug!(
            filename,
            mode = %mode,
            detections = raw.detections.len(),
            "detection completed"
        );
        Ok(DetectionReply {
            s3_url,
            filename: raw.filename,
            detections: raw.detections,
        })
    }
}

/// Scripted endpoint for tests.
///
/// Replies are keyed by upload filename. Unscripted filenames succeed with
/// the detector's conventional output names and, when a publish store is
/// attached, the annotated image and sidecar are written to `processed/`
/// the way the real service does.
#[derive(Default)]
pub struct MockDetectionApi {
    detections: Mutex<HashMap<String, Vec<DetectionRecord>>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, DetectionMode)>>,
    publish_store: Option<Arc<crate::storage::MockAssetStore>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockDetectionApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write annotated/sidecar outputs into `store` on success.
    pub fn with_publish_store(mut self, store: Arc<crate::storage::MockAssetStore>) -> Self {
        self.publish_store = Some(store);
        self
    }

    /// Hold each request open, so tests can observe in-flight overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn script_detections(&self, filename: &str, records: Vec<DetectionRecord>) {
        self.detections
            .lock()
            .expect("mock api lock")
            .insert(filename.to_string(), records);
    }

    pub fn fail_for(&self, filename: &str, message: &str) {
        self.failures
            .lock()
            .expect("mock api lock")
            .insert(filename.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<(String, DetectionMode)> {
        self.calls.lock().expect("mock api lock").clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionApi for MockDetectionApi {
    async fn detect(
        &self,
        _image: Bytes,
        filename: &str,
        mode: DetectionMode,
    ) -> Result<DetectionReply, DetectionError> {
        self.calls
            .lock()
            .expect("mock api lock")
            .push((filename.to_string(), mode));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted_failure = self
            .failures
            .lock()
            .expect("mock api lock")
            .get(filename)
            .cloned();
        if let Some(message) = scripted_failure {
            return Err(DetectionError::Transport(message));
        }

        let stem = filename.rsplit_once('.').map_or(filename, |(s, _)| s);
        let annotated_name = format!("{stem}_annotated.jpg");
        let detections = self
            .detections
            .lock()
            .expect("mock api lock")
            .get(filename)
            .cloned()
            .unwrap_or_default();

        if let Some(store) = &self.publish_store {
            let sidecar = serde_json::to_vec(&detections).expect("serialize detections");
            store.insert(
                &format!("{}/{annotated_name}", keys::PROCESSED_PREFIX),
                Bytes::from_static(b"annotated-jpeg"),
            );
            store.insert(
                &format!("{}/{stem}_detections.json", keys::PROCESSED_PREFIX),
                sidecar,
            );
        }

        Ok(DetectionReply {
            s3_url: format!("https://processed-images-100.s3.amazonaws.com/processed/{annotated_name}"),
            filename: Some(annotated_name),
            detections,
        })
    }
}

/// Drives single and batched submissions against the store + endpoint.
pub struct DetectionClient {
    store: Arc<dyn AssetStore>,
    api: Arc<dyn DetectionApi>,
    batch_concurrency: usize,
}

impl DetectionClient {
    pub fn new(
        store: Arc<dyn AssetStore>,
        api: Arc<dyn DetectionApi>,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            store,
            api,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Submit one upload. Single attempt, no retry; re-running with the same
    /// mode overwrites the prior annotated/sidecar pair because their keys
    /// derive from the upload's base name.
    pub async fn detect_one(
        &self,
        upload_key: &str,
        mode: DetectionMode,
    ) -> Result<DetectionReply, DetectionError> {
        detect_inner(
            self.store.clone(),
            self.api.clone(),
            upload_key.to_string(),
            mode,
        )
        .await
    }

    /// Submit every key with bounded concurrency.
    ///
    /// Failures are isolated per item; the call returns only once every
    /// request has settled (join-all barrier), with outcomes in input order.
    /// The caller triggers exactly one catalog refresh afterwards.
    pub async fn detect_batch(
        &self,
        upload_keys: &[String],
        mode: DetectionMode,
    ) -> Vec<DetectionOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut handles = Vec::with_capacity(upload_keys.len());

        for key in upload_keys {
            let store = self.store.clone();
            let api = self.api.clone();
            let sem = semaphore.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                let result = detect_inner(store, api, key.clone(), mode).await;
                DetectionOutcome {
                    upload_key: key,
                    result,
                }
            }));
        }

        // Join-all barrier: nothing proceeds until every request settled.
        let settled = futures::future::join_all(handles).await;
        let mut outcomes = Vec::with_capacity(settled.len());
        for (key, joined) in upload_keys.iter().zip(settled) {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(key = %key, "detection task failed: {e}");
                    outcomes.push(DetectionOutcome {
                        upload_key: key.clone(),
                        result: Err(DetectionError::Transport(format!(
                            "detection task failed: {e}"
                        ))),
                    });
                }
            }
        }

        let failures = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            total = outcomes.len(),
            failures,
            mode = %mode,
            "detection batch settled"
        );
        outcomes
    }
}

async fn detect_inner(
    store: Arc<dyn AssetStore>,
    api: Arc<dyn DetectionApi>,
    upload_key: String,
    mode: DetectionMode,
) -> Result<DetectionReply, DetectionError> {
    let image = store.get(&upload_key).await?;
    let filename = keys::display_name(&upload_key);
    debug!(key = %upload_key, bytes = image.len(), mode = %mode, "submitting detection");
    api.detect(image, filename, mode).await
}
