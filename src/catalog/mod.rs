// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod keys;
pub mod refresh;
pub mod snapshot;

pub use refresh::{AssetCatalog, CatalogError};
pub use snapshot::{Asset, AssetKind, CatalogSnapshot, CorrelatedResult, ItemNotice};
