// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Versioned load/save of the workspace, including the legacy snapshot migration.
//!
//! None of these functions return errors: storage and parse failures are logged and turned
//! into "nothing loaded" or "not saved" so the caller can keep working in memory.

use serde_json::Value;

use super::snapshot_json::normalize_snapshot;
use super::storage::Storage;
use super::workspace_json::{normalize_workspace_state, workspace_to_value};
use super::{Rejected, LEGACY_SNAPSHOT_KEY, WORKSPACE_STATE_KEY};
use crate::model::{
    timestamp_now, ConversationId, ConversationSnapshot, ModelProviderSettings,
    WorkspaceConversation, WorkspaceState,
};

#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] Rejected),
}

fn decode<T>(raw: &str, normalize: fn(&Value) -> Result<T, Rejected>) -> Result<T, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(normalize(&value)?)
}

fn remove_logged(storage: &dyn Storage, key: &str) -> bool {
    match storage.remove_item(key) {
        Ok(()) => true,
        Err(error) => {
            tracing::error!(key, %error, "failed to remove stored item");
            false
        }
    }
}

fn read_logged(storage: &dyn Storage, key: &str) -> Option<String> {
    match storage.get_item(key) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::error!(key, %error, "failed to read stored item");
            None
        }
    }
}

/// Wraps a legacy single-conversation snapshot as the only conversation of a new workspace.
pub fn create_workspace_from_legacy_snapshot(snapshot: ConversationSnapshot) -> WorkspaceState {
    let now = timestamp_now();
    let conversation_id = ConversationId::fresh_conversation();
    let conversation = WorkspaceConversation::new(
        conversation_id.clone(),
        snapshot.derived_title(),
        now.clone(),
        now,
        snapshot,
    );
    WorkspaceState::from_parts_unchecked(
        vec![conversation],
        conversation_id,
        Vec::new(),
        ModelProviderSettings::default(),
    )
}

fn migrate_from_legacy(storage: &dyn Storage) -> Option<WorkspaceState> {
    let raw = read_logged(storage, LEGACY_SNAPSHOT_KEY)?;
    let snapshot = match decode(&raw, normalize_snapshot) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::warn!(%error, "invalid legacy snapshot found, removing dirty data");
            remove_logged(storage, LEGACY_SNAPSHOT_KEY);
            return None;
        }
    };

    let migrated = create_workspace_from_legacy_snapshot(snapshot);
    if save_workspace_state(&migrated, storage) && remove_logged(storage, LEGACY_SNAPSHOT_KEY) {
        tracing::info!(
            conversation_id = %migrated.active_conversation_id(),
            "legacy snapshot migrated to workspace state"
        );
    }
    Some(migrated)
}

/// Loads the workspace, migrating the legacy snapshot on first run.
///
/// A stored workspace that fails to parse or validate is removed before the legacy key is
/// tried. A valid legacy snapshot is wrapped into a fresh workspace, saved under the current
/// key and, once that save succeeded, removed. Returns `None` when neither key yields a usable
/// value; the caller is expected to seed a default workspace.
pub fn load_workspace_state(storage: &dyn Storage) -> Option<WorkspaceState> {
    let _scope = tracing::debug_span!("workspace_state").entered();
    if let Some(raw) = read_logged(storage, WORKSPACE_STATE_KEY) {
        match decode(&raw, normalize_workspace_state) {
            Ok(state) => return Some(state),
            Err(DecodeError::Json(error)) => {
                tracing::error!(%error, "failed to parse workspace state, removing dirty data");
                remove_logged(storage, WORKSPACE_STATE_KEY);
            }
            Err(DecodeError::Rejected(reason)) => {
                tracing::warn!(%reason, "workspace state schema invalid, removing dirty data");
                remove_logged(storage, WORKSPACE_STATE_KEY);
            }
        }
    }

    migrate_from_legacy(storage)
}

/// Normalizes `state` and writes it under the current key.
///
/// Returns `false` without touching storage when the state does not normalize (for example it
/// has no conversations), and `false` when encoding or the storage write fails.
pub fn save_workspace_state(state: &WorkspaceState, storage: &dyn Storage) -> bool {
    let _scope = tracing::debug_span!("workspace_state").entered();
    let normalized = match workspace_to_value(state)
        .map_err(DecodeError::from)
        .and_then(|value| normalize_workspace_state(&value).map_err(DecodeError::from))
    {
        Ok(normalized) => normalized,
        Err(DecodeError::Rejected(reason)) => {
            tracing::warn!(%reason, "refused to persist invalid workspace state");
            return false;
        }
        Err(DecodeError::Json(error)) => {
            tracing::error!(%error, "failed to encode workspace state");
            return false;
        }
    };

    let encoded = match workspace_to_value(&normalized)
        .and_then(|value| serde_json::to_string(&value))
    {
        Ok(encoded) => encoded,
        Err(error) => {
            tracing::error!(%error, "failed to encode workspace state");
            return false;
        }
    };

    match storage.set_item(WORKSPACE_STATE_KEY, &encoded) {
        Ok(()) => true,
        Err(error) => {
            tracing::error!(%error, "failed to persist workspace state");
            false
        }
    }
}

/// Removes both the current and the legacy key.
pub fn clear_workspace_state(storage: &dyn Storage) {
    let _scope = tracing::debug_span!("workspace_state").entered();
    for key in [WORKSPACE_STATE_KEY, LEGACY_SNAPSHOT_KEY] {
        if let Err(error) = storage.remove_item(key) {
            tracing::error!(key, %error, "failed to clear workspace state");
        }
    }
}
