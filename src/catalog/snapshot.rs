// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Unified view over the three stored collections.

use serde::{Deserialize, Serialize};

use super::keys;
use crate::detection::DetectionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Upload,
    Annotated,
    DetectionMetadata,
}

/// One stored object tracked by the catalog. Never mutated in place; a
/// refresh replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub key: String,
    pub kind: AssetKind,
    /// Owner id, derived from the key prefix for uploads.
    pub owner: Option<String>,
    pub display_name: String,
}

impl Asset {
    pub fn upload(key: &str) -> Self {
        Self {
            owner: keys::owner_from_key(key).map(str::to_string),
            display_name: keys::display_name(key).to_string(),
            key: key.to_string(),
            kind: AssetKind::Upload,
        }
    }

    pub fn annotated(key: &str) -> Self {
        Self {
            owner: None,
            display_name: keys::display_name(key).to_string(),
            key: key.to_string(),
            kind: AssetKind::Annotated,
        }
    }

    pub fn metadata(key: &str) -> Self {
        Self {
            owner: None,
            display_name: keys::display_name(key).to_string(),
            key: key.to_string(),
            kind: AssetKind::DetectionMetadata,
        }
    }
}

/// Derived, non-owning join of one annotated image to its sidecar.
///
/// `detections` is empty (never absent) when the sidecar has not appeared
/// yet, failed to fetch, or failed to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedResult {
    pub asset: Asset,
    pub display_url: Option<String>,
    pub metadata_key: Option<String>,
    pub detections: Vec<DetectionRecord>,
}

/// Non-blocking per-item failure surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemNotice {
    pub key: String,
    pub message: String,
}

/// Immutable projection of the store, replaced wholesale on each refresh.
/// `token` increases monotonically; a stale in-flight refresh never
/// overwrites a fresher snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub token: u64,
    pub uploads: Vec<Asset>,
    pub annotated: Vec<CorrelatedResult>,
    pub metadata_files: Vec<Asset>,
    pub notices: Vec<ItemNotice>,
}
