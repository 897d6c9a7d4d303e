// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for the workspace in client-side key-value storage.
//!
//! The store module owns the JSON wire format, the normalizers that turn untrusted stored JSON
//! back into model values, and the versioned load/save path including the one-time migration
//! from the single-conversation snapshot format.

pub mod snapshot_json;
pub mod storage;
pub mod workspace_json;
pub mod workspace_store;

pub use snapshot_json::{normalize_snapshot, snapshot_to_value, SNAPSHOT_VERSION};
pub use storage::{DirStorage, MemoryStorage, Storage, StorageError, WriteDurability};
pub use workspace_json::{normalize_workspace_state, workspace_to_value, WORKSPACE_VERSION};
pub use workspace_store::{
    clear_workspace_state, create_workspace_from_legacy_snapshot, load_workspace_state,
    save_workspace_state,
};

/// Key of the single-conversation snapshot written by older clients.
pub const LEGACY_SNAPSHOT_KEY: &str = "nexa.v1.conversation.snapshot";
/// Key of the current multi-conversation workspace document.
pub const WORKSPACE_STATE_KEY: &str = "nexa.v2.workspace.state";

/// Why a stored document was refused by a normalizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("unsupported schema version {found}, expected {expected}")]
    UnsupportedVersion { expected: u64, found: String },
    #[error("field `{0}` is missing or has the wrong type")]
    BadField(&'static str),
    #[error("no valid nodes")]
    NoNodes,
    #[error("no valid conversations")]
    NoConversations,
}
