// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod asset_store;

pub use asset_store::{AssetStore, GatewayAssetStore, MockAssetStore, StoreEntry, StoreError};
