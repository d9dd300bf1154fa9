// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crop geometry for zooming into one detection.

use crate::detection::BoundingBox;

pub const DEFAULT_CROP_PADDING: f32 = 10.0;

/// Display-space region used to render a zoomed view of one detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    /// Clamp the rectangle to `[0,0] .. [image_width,image_height]`.
    ///
    /// [`compute_crop`] itself never clamps, so boxes near an image edge can
    /// produce a negative origin; rendering surfaces that cannot clip call
    /// this explicitly.
    pub fn clamp_to(self, image_width: f32, image_height: f32) -> CropRect {
        let x = self.x.max(0.0);
        let y = self.y.max(0.0);
        let right = (self.x + self.width).min(image_width);
        let bottom = (self.y + self.height).min(image_height);
        CropRect {
            x,
            y,
            width: (right - x).max(0.0),
            height: (bottom - y).max(0.0),
        }
    }
}

/// Crop for a detection box, padded so the box sits centered: origin
/// `(x - padding, y - padding)`, size `(w + 2*padding, h + 2*padding)`.
/// Pure transform, no clamping.
pub fn compute_crop(bbox: BoundingBox, padding: f32) -> CropRect {
    CropRect {
        x: bbox.x - padding,
        y: bbox.y - padding,
        width: bbox.width + 2.0 * padding,
        height: bbox.height + 2.0 * padding,
    }
}
