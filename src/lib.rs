// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Asset-lifecycle and detection-correlation engine.
//!
//! Tracks three eventually-consistent collections in a remote object store
//! (raw uploads, annotated output images, detection-metadata sidecars),
//! reconciles them into a unified catalog snapshot, drives batched calls to
//! a remote detection endpoint, and computes the crop transform for zooming
//! into one detection. Invoked programmatically by a UI layer; no server or
//! CLI surface of its own.

pub mod catalog;
pub mod config;
pub mod detection;
pub mod engine;
pub mod selection;
pub mod storage;
pub mod utils;

pub use catalog::{
    Asset, AssetCatalog, AssetKind, CatalogError, CatalogSnapshot, CorrelatedResult, ItemNotice,
};
pub use config::EngineConfig;
pub use detection::{
    BoundingBox, DetectionApi, DetectionClient, DetectionError, DetectionMode, DetectionOutcome,
    DetectionRecord, DetectionReply, HttpDetectionApi, MockDetectionApi,
};
pub use engine::{Engine, EngineError};
pub use selection::{compute_crop, CropRect, SelectionError, SelectionMode, SelectionState};
pub use storage::{AssetStore, GatewayAssetStore, MockAssetStore, StoreEntry, StoreError};
