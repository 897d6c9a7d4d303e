// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::ids::{ConversationId, MessageId, NodeId, NoteId};
use super::snapshot::ConversationSnapshot;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.openai.com/v1";

/// Flat model-provider configuration. The key is stored verbatim and never validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProviderSettings {
    pub provider_url: String,
    pub api_key: String,
}

impl Default for ModelProviderSettings {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_owned(),
            api_key: String::new(),
        }
    }
}

/// One named conversation in the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceConversation {
    id: ConversationId,
    title: String,
    title_edited: bool,
    created_at: String,
    updated_at: String,
    snapshot: ConversationSnapshot,
}

impl WorkspaceConversation {
    pub fn new(
        id: ConversationId,
        title: impl Into<String>,
        created_at: impl Into<String>,
        updated_at: impl Into<String>,
        snapshot: ConversationSnapshot,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            title_edited: false,
            created_at: created_at.into(),
            updated_at: updated_at.into(),
            snapshot,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// True once the user picked the title; derived titles never replace it.
    pub fn title_edited(&self) -> bool {
        self.title_edited
    }

    pub fn set_title_edited(&mut self, edited: bool) {
        self.title_edited = edited;
    }

    /// Sets a user-chosen title.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.title_edited = true;
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    pub fn set_updated_at(&mut self, updated_at: impl Into<String>) {
        self.updated_at = updated_at.into();
    }

    pub fn snapshot(&self) -> &ConversationSnapshot {
        &self.snapshot
    }

    pub fn set_snapshot(&mut self, snapshot: ConversationSnapshot) {
        self.snapshot = snapshot;
    }
}

/// A captured excerpt pointing back at the message it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceNote {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub source_conversation_id: ConversationId,
    pub source_node_id: NodeId,
    pub source_message_id: MessageId,
    pub created_at: String,
}

/// Everything the client persists: all conversations, notes and provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceState {
    conversations: Vec<WorkspaceConversation>,
    active_conversation_id: ConversationId,
    notes: Vec<WorkspaceNote>,
    model_provider: ModelProviderSettings,
}

impl WorkspaceState {
    /// Returns `None` when `conversations` is empty; an unknown active id falls back to the
    /// first conversation.
    pub fn new(
        conversations: Vec<WorkspaceConversation>,
        active_conversation_id: ConversationId,
        notes: Vec<WorkspaceNote>,
        model_provider: ModelProviderSettings,
    ) -> Option<Self> {
        let first = conversations.first()?.id().clone();
        let active_conversation_id = if conversations
            .iter()
            .any(|conversation| conversation.id() == &active_conversation_id)
        {
            active_conversation_id
        } else {
            first
        };

        Some(Self {
            conversations,
            active_conversation_id,
            notes,
            model_provider,
        })
    }

    /// Builds a state without checking invariants. Persisting such a state is refused when it
    /// has no conversations.
    pub fn from_parts_unchecked(
        conversations: Vec<WorkspaceConversation>,
        active_conversation_id: ConversationId,
        notes: Vec<WorkspaceNote>,
        model_provider: ModelProviderSettings,
    ) -> Self {
        Self {
            conversations,
            active_conversation_id,
            notes,
            model_provider,
        }
    }

    pub fn conversations(&self) -> &[WorkspaceConversation] {
        &self.conversations
    }

    pub fn conversations_mut(&mut self) -> &mut Vec<WorkspaceConversation> {
        &mut self.conversations
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<&WorkspaceConversation> {
        self.conversations.iter().find(|conversation| conversation.id() == id)
    }

    pub fn conversation_mut(&mut self, id: &ConversationId) -> Option<&mut WorkspaceConversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| conversation.id() == id)
    }

    pub fn active_conversation_id(&self) -> &ConversationId {
        &self.active_conversation_id
    }

    pub fn set_active_conversation_id(&mut self, id: ConversationId) -> bool {
        if self.conversation(&id).is_none() {
            return false;
        }
        self.active_conversation_id = id;
        true
    }

    pub fn active_conversation(&self) -> Option<&WorkspaceConversation> {
        self.conversation(&self.active_conversation_id)
    }

    pub fn notes(&self) -> &[WorkspaceNote] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut Vec<WorkspaceNote> {
        &mut self.notes
    }

    pub fn model_provider(&self) -> &ModelProviderSettings {
        &self.model_provider
    }

    pub fn set_model_provider(&mut self, model_provider: ModelProviderSettings) {
        self.model_provider = model_provider;
    }
}
