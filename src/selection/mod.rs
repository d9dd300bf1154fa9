// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod state;
pub mod zoom;

pub use state::{SelectionError, SelectionMode, SelectionState};
pub use zoom::{compute_crop, CropRect, DEFAULT_CROP_PADDING};
