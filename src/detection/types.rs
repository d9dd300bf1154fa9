// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire types for the remote detection endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::storage::StoreError;

/// Model selector sent as the multipart `mode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionMode {
    Airplane,
    Ship,
    Both,
    CombinedModel,
}

impl DetectionMode {
    pub const ALL: [DetectionMode; 4] = [
        DetectionMode::Airplane,
        DetectionMode::Ship,
        DetectionMode::Both,
        DetectionMode::CombinedModel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Airplane => "airplane",
            DetectionMode::Ship => "ship",
            DetectionMode::Both => "both",
            DetectionMode::CombinedModel => "combinedModel",
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMode {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airplane" => Ok(DetectionMode::Airplane),
            "ship" => Ok(DetectionMode::Ship),
            "both" => Ok(DetectionMode::Both),
            "combinedModel" => Ok(DetectionMode::CombinedModel),
            other => Err(DetectionError::InvalidMode(other.to_string())),
        }
    }
}

/// Bounding box in source-image pixel coordinates.
///
/// Wire form is the four-element array `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One detected object, as emitted by the detector and stored in the
/// metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Validated success body from the detection endpoint.
///
/// The endpoint is only considered successful when the transport reported
/// 2xx AND the body carried the result-image reference; anything else is a
/// [`DetectionError`], never a partial success.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionReply {
    /// Public URL of the annotated image the service wrote to the store.
    pub s3_url: String,
    /// Basename of the annotated image, when the service reports it.
    pub filename: Option<String>,
    pub detections: Vec<DetectionRecord>,
}

/// Per-item result of a batch submission, in input order.
#[derive(Debug)]
pub struct DetectionOutcome {
    pub upload_key: String,
    pub result: Result<DetectionReply, DetectionError>,
}

impl DetectionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Detection endpoint returned status {0}")]
    Endpoint(u16),
    #[error("Detection reply missing result image reference")]
    MissingResultUrl,
    #[error("Invalid detection mode: {0}")]
    InvalidMode(String),
    #[error("Failed to parse detection reply: {0}")]
    Parse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
