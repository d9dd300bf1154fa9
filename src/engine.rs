// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Facade tying the catalog, detection client and selection together the
//! way the UI drives them: every mutation of the store funnels back into
//! exactly one catalog refresh.

use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::catalog::{keys, AssetCatalog, CatalogError, CatalogSnapshot};
use crate::config::EngineConfig;
use crate::detection::{DetectionApi, DetectionClient, DetectionError, DetectionMode, DetectionOutcome};
use crate::selection::{compute_crop, CropRect, SelectionState};
use crate::storage::{AssetStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
}

pub struct Engine {
    store: Arc<dyn AssetStore>,
    catalog: AssetCatalog,
    detector: DetectionClient,
    selection: SelectionState,
    crop_padding: f32,
}

impl Engine {
    pub fn new(
        store: Arc<dyn AssetStore>,
        api: Arc<dyn DetectionApi>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            catalog: AssetCatalog::new(store.clone(), config.refresh_concurrency),
            detector: DetectionClient::new(store.clone(), api, config.batch_concurrency),
            selection: SelectionState::new(
                config.max_upload_selection,
                config.max_annotated_selection,
            ),
            crop_padding: config.crop_padding,
            store,
        }
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.catalog.snapshot()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub async fn refresh(&self, owner: &str) -> Result<Arc<CatalogSnapshot>, EngineError> {
        Ok(self.catalog.refresh(owner).await?)
    }

    /// Crop rectangle for the focused detection of an annotated asset,
    /// using the configured padding. `None` when nothing is focused, the
    /// asset is gone from the snapshot, or the index is out of range — all
    /// of which mean "show the full image".
    pub fn focused_crop(&self, annotated_key: &str) -> Option<CropRect> {
        let index = self.selection.focused_detection(annotated_key)?;
        let snapshot = self.catalog.snapshot();
        let result = snapshot
            .annotated
            .iter()
            .find(|r| r.asset.key == annotated_key)?;
        let record = result.detections.get(index)?;
        Some(compute_crop(record.bbox, self.crop_padding))
    }

    /// Store a new raw upload under the owner's prefix, then refresh.
    pub async fn upload(
        &self,
        owner: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<String, EngineError> {
        let key = keys::upload_key(owner, filename);
        self.store.put(&key, data).await?;
        info!(key = %key, "stored upload");
        self.catalog.refresh(owner).await?;
        Ok(key)
    }

    /// Delete an asset (companion sidecar handled by the catalog), then
    /// refresh regardless of the companion outcome.
    pub async fn delete(
        &self,
        owner: &str,
        key: &str,
    ) -> Result<Arc<CatalogSnapshot>, EngineError> {
        self.catalog.delete(key).await?;
        Ok(self.catalog.refresh(owner).await?)
    }

    /// Run batched detection over `upload_keys`, then perform the single
    /// post-batch refresh once every request has settled.
    pub async fn run_detection(
        &self,
        owner: &str,
        upload_keys: &[String],
        mode: DetectionMode,
    ) -> Result<(Vec<DetectionOutcome>, Arc<CatalogSnapshot>), EngineError> {
        let outcomes = self.detector.detect_batch(upload_keys, mode).await;
        let snapshot = self.catalog.refresh(owner).await?;
        Ok((outcomes, snapshot))
    }

    /// [`run_detection`] over the currently selected uploads.
    ///
    /// [`run_detection`]: Engine::run_detection
    pub async fn detect_selected(
        &self,
        owner: &str,
        mode: DetectionMode,
    ) -> Result<(Vec<DetectionOutcome>, Arc<CatalogSnapshot>), EngineError> {
        let selected = self.selection.selected_uploads().to_vec();
        self.run_detection(owner, &selected, mode).await
    }
}
