// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A workspace holds conversations; each conversation wraps a snapshot made of graph nodes and
//! one message bucket per node.

pub(crate) mod fixtures;
pub mod ids;
pub mod message;
pub mod node;
pub mod snapshot;
pub mod tags;
pub mod title;
pub mod workspace;

pub use ids::{ConversationId, Id, IdError, MessageId, NodeId, NoteId};
pub use message::{ChatMessage, Quote, Role};
pub use node::{GraphNode, Position};
pub use snapshot::ConversationSnapshot;
pub use tags::{tag_key, ConversationTag, TagSource};
pub use workspace::{
    ModelProviderSettings, WorkspaceConversation, WorkspaceNote, WorkspaceState,
    DEFAULT_PROVIDER_URL,
};

/// Current UTC time as an ISO-8601 string with millisecond precision (`...T12:00:00.000Z`).
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
