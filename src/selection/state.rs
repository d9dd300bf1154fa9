// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Selection state machine over the two mutually exclusive viewer modes.

use std::collections::HashMap;
use thiserror::Error;

/// Which collection is being selected from. The two modes are mutually
/// exclusive: entering one drops the other's set entirely, by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Idle,
    Uploads(Vec<String>),
    Annotated(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Adding beyond the limit is rejected with no state change; the caller
    /// surfaces this as an immediate notice.
    #[error("Selection limit reached: at most {limit} {kind} may be selected")]
    LimitExceeded { kind: &'static str, limit: usize },
}

/// Process-local selection state, plus the per-asset focused-detection
/// index (`None` means "show the full image").
pub struct SelectionState {
    mode: SelectionMode,
    focused: HashMap<String, usize>,
    max_uploads: usize,
    max_annotated: usize,
}

impl SelectionState {
    pub fn new(max_uploads: usize, max_annotated: usize) -> Self {
        Self {
            mode: SelectionMode::Idle,
            focused: HashMap::new(),
            max_uploads,
            max_annotated,
        }
    }

    pub fn mode(&self) -> &SelectionMode {
        &self.mode
    }

    pub fn selected_uploads(&self) -> &[String] {
        match &self.mode {
            SelectionMode::Uploads(keys) => keys,
            _ => &[],
        }
    }

    pub fn selected_annotated(&self) -> &[String] {
        match &self.mode {
            SelectionMode::Annotated(keys) => keys,
            _ => &[],
        }
    }

    /// Toggle an upload key. Entering upload mode empties any annotated
    /// selection.
    pub fn toggle_upload(&mut self, key: &str) -> Result<(), SelectionError> {
        let result = match &mut self.mode {
            SelectionMode::Uploads(keys) => toggle_in(keys, key, "uploads", self.max_uploads),
            _ if self.max_uploads == 0 => Err(SelectionError::LimitExceeded {
                kind: "uploads",
                limit: 0,
            }),
            _ => {
                self.mode = SelectionMode::Uploads(vec![key.to_string()]);
                Ok(())
            }
        };
        if result.is_ok() && keys_empty(&self.mode) {
            self.mode = SelectionMode::Idle;
        }
        result
    }

    /// Toggle an annotated key. Entering annotated mode empties any upload
    /// selection.
    pub fn toggle_annotated(&mut self, key: &str) -> Result<(), SelectionError> {
        let result = match &mut self.mode {
            SelectionMode::Annotated(keys) => {
                toggle_in(keys, key, "annotated images", self.max_annotated)
            }
            _ if self.max_annotated == 0 => Err(SelectionError::LimitExceeded {
                kind: "annotated images",
                limit: 0,
            }),
            _ => {
                self.mode = SelectionMode::Annotated(vec![key.to_string()]);
                Ok(())
            }
        };
        if result.is_ok() && keys_empty(&self.mode) {
            self.mode = SelectionMode::Idle;
        }
        result
    }

    pub fn clear(&mut self) {
        self.mode = SelectionMode::Idle;
    }

    /// Radio-button focus over one asset's detections: choosing the focused
    /// index again returns to `None` (full image).
    pub fn toggle_detection(&mut self, annotated_key: &str, index: usize) -> Option<usize> {
        match self.focused.get(annotated_key) {
            Some(&current) if current == index => {
                self.focused.remove(annotated_key);
                None
            }
            _ => {
                self.focused.insert(annotated_key.to_string(), index);
                Some(index)
            }
        }
    }

    pub fn focused_detection(&self, annotated_key: &str) -> Option<usize> {
        self.focused.get(annotated_key).copied()
    }

    pub fn clear_focus(&mut self, annotated_key: &str) {
        self.focused.remove(annotated_key);
    }
}

fn keys_empty(mode: &SelectionMode) -> bool {
    match mode {
        SelectionMode::Idle => true,
        SelectionMode::Uploads(keys) | SelectionMode::Annotated(keys) => keys.is_empty(),
    }
}

fn toggle_in(
    keys: &mut Vec<String>,
    key: &str,
    kind: &'static str,
    limit: usize,
) -> Result<(), SelectionError> {
    if let Some(pos) = keys.iter().position(|k| k == key) {
        keys.remove(pos);
        return Ok(());
    }
    if keys.len() >= limit {
        return Err(SelectionError::LimitExceeded { kind, limit });
    }
    keys.push(key.to_string());
    Ok(())
}
