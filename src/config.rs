// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine configuration with environment overrides.

use tracing::warn;

use crate::selection::DEFAULT_CROP_PADDING;

/// Tunables for the engine. `Default` matches the hosted UI's behavior.
/// The endpoint, timeout and concurrency fields can be overridden from the
/// environment via [`from_env`]; the selection limits and crop padding are
/// part of the viewer contract and are only set in code.
///
/// [`from_env`]: EngineConfig::from_env
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the detection service; requests go to `{endpoint}/detect`.
    pub detect_endpoint: String,
    /// Base URL of the object-store gateway.
    pub store_gateway_url: String,
    pub request_timeout_secs: u64,
    /// Ceiling on in-flight detection requests in one batch. Defaults to
    /// the upload selection limit, so a full batch runs fully parallel.
    pub batch_concurrency: usize,
    /// Ceiling on per-item URL/sidecar fetches during a catalog refresh.
    pub refresh_concurrency: usize,
    pub max_upload_selection: usize,
    pub max_annotated_selection: usize,
    pub crop_padding: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detect_endpoint: "http://127.0.0.1:8080".to_string(),
            store_gateway_url: "http://127.0.0.1:5522".to_string(),
            request_timeout_secs: 120,
            batch_concurrency: 9,
            refresh_concurrency: 8,
            max_upload_selection: 9,
            max_annotated_selection: 3,
            crop_padding: DEFAULT_CROP_PADDING,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (reading `.env` first),
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            detect_endpoint: env_or("DETECT_ENDPOINT_URL", defaults.detect_endpoint),
            store_gateway_url: env_or("STORE_GATEWAY_URL", defaults.store_gateway_url),
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            batch_concurrency: env_parsed("DETECT_BATCH_CONCURRENCY", defaults.batch_concurrency),
            refresh_concurrency: env_parsed(
                "CATALOG_FETCH_CONCURRENCY",
                defaults.refresh_concurrency,
            ),
            max_upload_selection: defaults.max_upload_selection,
            max_annotated_selection: defaults.max_annotated_selection,
            crop_padding: defaults.crop_padding,
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("ignoring unparseable {name}={value}");
            default
        }),
        Err(_) => default,
    }
}
