// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Workspace-level operations: conversations, notes and provider settings.

use super::{ObjectKind, OpError};
use crate::model::fixtures::seed_conversation;
use crate::model::title::{note_title, DEFAULT_CONVERSATION_TITLE};
use crate::model::{
    ConversationId, ConversationSnapshot, MessageId, ModelProviderSettings, NodeId, NoteId,
    WorkspaceNote, WorkspaceState,
};

/// Input for [`add_note`]; the title is derived from the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub content: String,
    pub source_conversation_id: ConversationId,
    pub source_node_id: NodeId,
    pub source_message_id: MessageId,
}

/// Appends a fresh, empty conversation and makes it active.
pub fn create_conversation(state: &WorkspaceState, now: &str) -> (WorkspaceState, ConversationId) {
    let mut next = state.clone();
    let conversation = seed_conversation(now);
    let id = conversation.id().clone();
    next.conversations_mut().push(conversation);
    next.set_active_conversation_id(id.clone());
    (next, id)
}

pub fn rename_conversation(
    state: &WorkspaceState,
    id: &ConversationId,
    title: &str,
) -> Result<WorkspaceState, OpError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(OpError::Empty { field: "title" });
    }
    let mut next = state.clone();
    next.conversation_mut(id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Conversation, id))?
        .rename(title);
    Ok(next)
}

/// Removes a conversation. Removing the last one leaves a fresh empty conversation behind.
pub fn delete_conversation(
    state: &WorkspaceState,
    id: &ConversationId,
    now: &str,
) -> Result<WorkspaceState, OpError> {
    if state.conversation(id).is_none() {
        return Err(OpError::not_found(ObjectKind::Conversation, id));
    }

    let mut next = state.clone();
    next.conversations_mut()
        .retain(|conversation| conversation.id() != id);
    if next.conversations().is_empty() {
        next.conversations_mut().push(seed_conversation(now));
    }
    if next.active_conversation_id() == id {
        if let Some(first) = next.conversations().first().map(|c| c.id().clone()) {
            next.set_active_conversation_id(first);
        }
    }
    Ok(next)
}

pub fn set_active_conversation(
    state: &WorkspaceState,
    id: &ConversationId,
) -> Result<WorkspaceState, OpError> {
    let mut next = state.clone();
    if next.set_active_conversation_id(id.clone()) {
        Ok(next)
    } else {
        Err(OpError::not_found(ObjectKind::Conversation, id))
    }
}

/// Stores an updated snapshot for a conversation and bumps its `updated_at`.
///
/// A conversation still carrying the default title picks up a title derived from its first
/// user message; a title the user chose is kept.
pub fn replace_snapshot(
    state: &WorkspaceState,
    id: &ConversationId,
    snapshot: ConversationSnapshot,
    now: &str,
) -> Result<WorkspaceState, OpError> {
    let mut next = state.clone();
    let conversation = next
        .conversation_mut(id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Conversation, id))?;
    if !conversation.title_edited() && conversation.title() == DEFAULT_CONVERSATION_TITLE {
        conversation.set_title(snapshot.derived_title());
    }
    conversation.set_snapshot(snapshot);
    conversation.set_updated_at(now);
    Ok(next)
}

/// Captures a note pointing at an existing message.
pub fn add_note(
    state: &WorkspaceState,
    note: NewNote,
    now: &str,
) -> Result<(WorkspaceState, NoteId), OpError> {
    let content = note.content.trim();
    if content.is_empty() {
        return Err(OpError::Empty { field: "note" });
    }

    let snapshot = state
        .conversation(&note.source_conversation_id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Conversation, &note.source_conversation_id))?
        .snapshot();
    if !snapshot.contains_node(&note.source_node_id) {
        return Err(OpError::not_found(ObjectKind::Node, &note.source_node_id));
    }
    if !snapshot
        .messages(&note.source_node_id)
        .iter()
        .any(|message| message.id() == &note.source_message_id)
    {
        return Err(OpError::not_found(ObjectKind::Message, &note.source_message_id));
    }

    let id = NoteId::fresh_note();
    let record = WorkspaceNote {
        id: id.clone(),
        title: note_title(content),
        content: content.to_owned(),
        source_conversation_id: note.source_conversation_id.clone(),
        source_node_id: note.source_node_id.clone(),
        source_message_id: note.source_message_id.clone(),
        created_at: now.to_owned(),
    };

    let mut next = state.clone();
    next.notes_mut().push(record);
    Ok((next, id))
}

pub fn remove_note(state: &WorkspaceState, id: &NoteId) -> Result<WorkspaceState, OpError> {
    if !state.notes().iter().any(|note| &note.id == id) {
        return Err(OpError::not_found(ObjectKind::Note, id));
    }
    let mut next = state.clone();
    next.notes_mut().retain(|note| &note.id != id);
    Ok(next)
}

/// Replaces the provider settings. The URL is trimmed and must not be empty; the key is kept
/// verbatim.
pub fn update_model_provider(
    state: &WorkspaceState,
    settings: ModelProviderSettings,
) -> Result<WorkspaceState, OpError> {
    let provider_url = settings.provider_url.trim();
    if provider_url.is_empty() {
        return Err(OpError::Empty {
            field: "provider_url",
        });
    }
    let mut next = state.clone();
    next.set_model_provider(ModelProviderSettings {
        provider_url: provider_url.to_owned(),
        api_key: settings.api_key,
    });
    Ok(next)
}
