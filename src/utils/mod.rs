// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared helpers.

/// Install the fmt tracing subscriber. Safe to call more than once (later
/// calls are no-ops), so tests and embedding binaries can both use it.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}
