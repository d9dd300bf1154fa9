// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod types;

pub use client::{DetectionApi, DetectionClient, HttpDetectionApi, MockDetectionApi};
pub use types::{
    BoundingBox, DetectionError, DetectionMode, DetectionOutcome, DetectionRecord, DetectionReply,
};
