// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key derivation between the three stored collections.
//!
//! Uploads live under `uploads/{owner}/{filename}`. The remote detector
//! writes an annotated image `processed/{base}_annotated.{ext}` plus a
//! sidecar `processed/{base}_detections.json`. Everything in this module is
//! a pure string transform; the annotated-to-sidecar mapping is the
//! load-bearing contract, the forward mapping is advisory only (the remote
//! service may insert a mode infix such as `_ship_annotated`).

pub const UPLOADS_PREFIX: &str = "uploads";
pub const PROCESSED_PREFIX: &str = "processed";

const ANNOTATED_SUFFIX: &str = "_annotated";
const METADATA_SUFFIX: &str = "_detections";
const METADATA_EXT: &str = "json";

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png"];

/// Listing prefix for one owner's raw uploads.
pub fn upload_prefix(owner: &str) -> String {
    format!("{UPLOADS_PREFIX}/{owner}/")
}

/// Listing prefix for annotated outputs and metadata sidecars.
pub fn processed_prefix() -> String {
    format!("{PROCESSED_PREFIX}/")
}

/// Store key for a new raw upload.
pub fn upload_key(owner: &str, filename: &str) -> String {
    format!("{UPLOADS_PREFIX}/{owner}/{filename}")
}

/// Owner id encoded in an upload key, if the key has the upload shape.
pub fn owner_from_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(UPLOADS_PREFIX)?.strip_prefix('/')?;
    let (owner, filename) = rest.split_once('/')?;
    if owner.is_empty() || filename.is_empty() {
        return None;
    }
    Some(owner)
}

/// Basename of a key, used as its display name.
pub fn display_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// True when the key names an image by extension (jpg/jpeg/png).
pub fn is_image_key(key: &str) -> bool {
    match split_extension(display_name(key)).1 {
        Some(ext) => IMAGE_EXTS.iter().any(|e| ext.eq_ignore_ascii_case(e)),
        None => false,
    }
}

/// True when the key names a detection-metadata sidecar by extension.
pub fn is_metadata_key(key: &str) -> bool {
    match split_extension(display_name(key)).1 {
        Some(ext) => ext.eq_ignore_ascii_case(METADATA_EXT),
        None => false,
    }
}

/// Sidecar key for an annotated image key.
///
/// `processed/{base}_annotated.{ext}` maps to
/// `processed/{base}_detections.json`. Returns `None` for keys that do not
/// carry the annotation suffix; callers treat that as "no companion", never
/// as an error.
pub fn metadata_key_for(annotated_key: &str) -> Option<String> {
    if !is_image_key(annotated_key) {
        return None;
    }
    let (dir, name) = match annotated_key.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, annotated_key),
    };
    let (stem, _ext) = split_extension(name);
    let base = stem.strip_suffix(ANNOTATED_SUFFIX)?;
    if base.is_empty() {
        return None;
    }
    match dir {
        Some(dir) => Some(format!("{dir}/{base}{METADATA_SUFFIX}.{METADATA_EXT}")),
        None => Some(format!("{base}{METADATA_SUFFIX}.{METADATA_EXT}")),
    }
}

/// Reverse of [`metadata_key_for`]: the annotated image key a sidecar
/// belongs to. The detector always emits `.jpg` annotated images, so the
/// reverse mapping fixes that extension.
pub fn annotated_key_for(metadata_key: &str) -> Option<String> {
    if !is_metadata_key(metadata_key) {
        return None;
    }
    let (dir, name) = match metadata_key.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, metadata_key),
    };
    let (stem, _ext) = split_extension(name);
    let base = stem.strip_suffix(METADATA_SUFFIX)?;
    if base.is_empty() {
        return None;
    }
    match dir {
        Some(dir) => Some(format!("{dir}/{base}{ANNOTATED_SUFFIX}.jpg")),
        None => Some(format!("{base}{ANNOTATED_SUFFIX}.jpg")),
    }
}

/// Advisory forward mapping: where the detector is expected to place the
/// annotated output for an upload. Not exact (the service may add a mode
/// infix); the reverse mapping above is the contract that matters.
pub fn expected_annotated_key(upload_key: &str) -> Option<String> {
    if !is_image_key(upload_key) {
        return None;
    }
    let (stem, _ext) = split_extension(display_name(upload_key));
    Some(format!(
        "{PROCESSED_PREFIX}/{stem}{ANNOTATED_SUFFIX}.jpg"
    ))
}
