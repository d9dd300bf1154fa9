// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Catalog projection: listing, correlation and versioned snapshot installs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::keys;
use super::snapshot::{Asset, CatalogSnapshot, CorrelatedResult, ItemNotice};
use crate::detection::DetectionRecord;
use crate::storage::{AssetStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to list assets: {0}")]
    List(#[source] StoreError),
    #[error("Failed to delete asset: {0}")]
    Delete(#[source] StoreError),
}

/// In-memory projection of the store.
///
/// The installed snapshot is the one piece of shared mutable state in the
/// engine; everything else only reads it. Refreshes carry a monotonically
/// increasing token and install last-token-wins, so a slow refresh that
/// completes after a newer one is discarded rather than rolling the view
/// back.
pub struct AssetCatalog {
    store: Arc<dyn AssetStore>,
    current: RwLock<Arc<CatalogSnapshot>>,
    refresh_seq: AtomicU64,
    fetch_concurrency: usize,
}

struct ResolvedItem {
    display_url: Option<String>,
    metadata_key: Option<String>,
    detections: Vec<DetectionRecord>,
    notices: Vec<ItemNotice>,
}

impl AssetCatalog {
    pub fn new(store: Arc<dyn AssetStore>, fetch_concurrency: usize) -> Self {
        Self {
            store,
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
            refresh_seq: AtomicU64::new(0),
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    /// Currently installed snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().expect("catalog lock").clone()
    }

    /// Rebuild the projection for one owner.
    ///
    /// A failure of either top-level list call fails the whole refresh and
    /// leaves the installed snapshot untouched. Per-item URL and sidecar
    /// failures are isolated: the item degrades (no URL / empty detections)
    /// and a notice is recorded, siblings are unaffected.
    pub async fn refresh(&self, owner: &str) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let token = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let upload_entries = self
            .store
            .list(&keys::upload_prefix(owner))
            .await
            .map_err(CatalogError::List)?;
        let processed_entries = self
            .store
            .list(&keys::processed_prefix())
            .await
            .map_err(CatalogError::List)?;

        let uploads: Vec<Asset> = upload_entries
            .iter()
            .map(|e| Asset::upload(&e.key))
            .collect();

        let mut annotated_keys = Vec::new();
        let mut metadata_files = Vec::new();
        for entry in &processed_entries {
            if keys::is_image_key(&entry.key) {
                annotated_keys.push(entry.key.clone());
            } else if keys::is_metadata_key(&entry.key) {
                metadata_files.push(Asset::metadata(&entry.key));
            } else {
                debug!(key = %entry.key, "ignoring processed entry with unknown extension");
            }
        }

        // Per-item fan-out, bounded. Completion order is irrelevant: results
        // are joined back by key.
        let semaphore = Arc::new(Semaphore::new(self.fetch_concurrency));
        let mut handles = Vec::with_capacity(annotated_keys.len());
        for key in &annotated_keys {
            let store = self.store.clone();
            let sem = semaphore.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                let resolved = resolve_annotated(store.as_ref(), &key).await;
                (key, resolved)
            }));
        }

        let mut resolved_by_key: HashMap<String, ResolvedItem> = HashMap::new();
        let mut notices = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok((key, item)) => {
                    resolved_by_key.insert(key, item);
                }
                Err(e) => warn!("catalog fan-out task failed: {e}"),
            }
        }

        let mut annotated = Vec::with_capacity(annotated_keys.len());
        for key in &annotated_keys {
            let item = match resolved_by_key.remove(key) {
                Some(item) => item,
                // Task panicked; degrade to a bare entry.
                None => ResolvedItem {
                    display_url: None,
                    metadata_key: keys::metadata_key_for(key),
                    detections: Vec::new(),
                    notices: vec![ItemNotice {
                        key: key.clone(),
                        message: "internal: resolution task did not complete".to_string(),
                    }],
                },
            };
            notices.extend(item.notices);
            annotated.push(CorrelatedResult {
                asset: Asset::annotated(key),
                display_url: item.display_url,
                metadata_key: item.metadata_key,
                detections: item.detections,
            });
        }

        let snapshot = Arc::new(CatalogSnapshot {
            token,
            uploads,
            annotated,
            metadata_files,
            notices,
        });
        Ok(self.install(snapshot))
    }

    /// Install a snapshot unless a fresher one already landed; returns
    /// whichever snapshot is current afterwards.
    fn install(&self, snapshot: Arc<CatalogSnapshot>) -> Arc<CatalogSnapshot> {
        let mut current = self.current.write().expect("catalog lock");
        if snapshot.token > current.token {
            *current = snapshot;
        } else {
            debug!(
                stale = snapshot.token,
                installed = current.token,
                "discarding stale refresh result"
            );
        }
        current.clone()
    }

    /// Delete an asset. An annotated key also gets a best-effort companion
    /// delete of its sidecar; a missing or failing companion never fails the
    /// primary delete. Callers refresh afterwards regardless.
    pub async fn delete(&self, key: &str) -> Result<(), CatalogError> {
        self.store.delete(key).await.map_err(CatalogError::Delete)?;

        if let Some(companion) = keys::metadata_key_for(key) {
            match self.store.delete(&companion).await {
                Ok(()) => debug!(key = %companion, "deleted companion sidecar"),
                Err(StoreError::NotFound(_)) => {
                    debug!(key = %companion, "companion sidecar already absent")
                }
                Err(e) => warn!(key = %companion, "companion delete failed: {e}"),
            }
        }
        Ok(())
    }
}

/// Resolve the display URL and sidecar detections for one annotated image.
async fn resolve_annotated(store: &dyn AssetStore, key: &str) -> ResolvedItem {
    let mut notices = Vec::new();

    let display_url = match store.get_download_url(key).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(key, "display url resolution failed: {e}");
            notices.push(ItemNotice {
                key: key.to_string(),
                message: format!("display url unavailable: {e}"),
            });
            None
        }
    };

    let metadata_key = keys::metadata_key_for(key);
    let detections = match &metadata_key {
        Some(sidecar) => match store.get(sidecar).await {
            Ok(body) => match serde_json::from_slice::<Vec<DetectionRecord>>(&body) {
                Ok(records) => records,
                Err(e) => {
                    warn!(key = %sidecar, "sidecar parse failed: {e}");
                    notices.push(ItemNotice {
                        key: key.to_string(),
                        message: format!("detection metadata unreadable: {e}"),
                    });
                    Vec::new()
                }
            },
            // Sidecar has not landed yet; expected, not noticeworthy.
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => {
                warn!(key = %sidecar, "sidecar fetch failed: {e}");
                notices.push(ItemNotice {
                    key: key.to_string(),
                    message: format!("detection metadata unavailable: {e}"),
                });
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    ResolvedItem {
        display_url,
        metadata_key,
        detections,
        notices,
    }
}
