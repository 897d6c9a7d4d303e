// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire format and normalization for the workspace document (schema version 2).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot_json::{check_version, normalize_snapshot, snapshot_to_json, SnapshotJson};
use super::Rejected;
use crate::model::{
    ConversationId, MessageId, ModelProviderSettings, NodeId, NoteId, WorkspaceConversation,
    WorkspaceNote, WorkspaceState, DEFAULT_PROVIDER_URL,
};

pub const WORKSPACE_VERSION: u64 = 2;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationJson {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    title_edited: bool,
    created_at: String,
    updated_at: String,
    snapshot: SnapshotJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteJson {
    id: String,
    title: String,
    content: String,
    source_conversation_id: String,
    source_node_id: String,
    source_message_id: String,
    created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelProviderJson {
    provider_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceJson {
    version: u64,
    conversations: Vec<ConversationJson>,
    active_conversation_id: String,
    notes: Vec<NoteJson>,
    model_provider: ModelProviderJson,
}

fn conversation_from_value(raw: &Value) -> Option<WorkspaceConversation> {
    let object = raw.as_object()?;
    let text = |field: &str| object.get(field).and_then(Value::as_str);

    let id = ConversationId::new(text("id")?).ok()?;
    let title = text("title")?;
    let created_at = text("createdAt")?;
    let updated_at = text("updatedAt")?;
    let snapshot = match normalize_snapshot(object.get("snapshot")?) {
        Ok(snapshot) => snapshot,
        Err(reason) => {
            tracing::debug!(
                conversation_id = %id,
                %reason,
                "dropping conversation with invalid snapshot"
            );
            return None;
        }
    };

    let title_edited = object
        .get("titleEdited")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let (title, title_edited) = match title.trim() {
        "" => (snapshot.derived_title(), false),
        title => (title.to_owned(), title_edited),
    };
    let mut conversation =
        WorkspaceConversation::new(id, title, created_at, updated_at, snapshot);
    conversation.set_title_edited(title_edited);
    Some(conversation)
}

fn note_from_value(raw: &Value) -> Option<WorkspaceNote> {
    let note = NoteJson::deserialize(raw).ok()?;
    let title = note.title.trim();
    let content = note.content.trim();
    if title.is_empty() || content.is_empty() {
        return None;
    }

    Some(WorkspaceNote {
        id: NoteId::new(note.id).ok()?,
        title: title.to_owned(),
        content: content.to_owned(),
        source_conversation_id: ConversationId::new(note.source_conversation_id).ok()?,
        source_node_id: NodeId::new(note.source_node_id).ok()?,
        source_message_id: MessageId::new(note.source_message_id).ok()?,
        created_at: note.created_at,
    })
}

fn provider_from_value(raw: Option<&Value>) -> ModelProviderSettings {
    let Some(object) = raw.and_then(Value::as_object) else {
        return ModelProviderSettings::default();
    };

    let provider_url = object
        .get("providerUrl")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_PROVIDER_URL)
        .to_owned();
    let api_key = object
        .get("apiKey")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    ModelProviderSettings {
        provider_url,
        api_key,
    }
}

/// Validates untrusted JSON into a workspace.
///
/// Requires `version == 2` and at least one conversation that survives validation (an empty
/// workspace is refused, never padded with a fresh conversation). Conversations with a
/// duplicate id, malformed fields or an invalid snapshot are dropped; blank titles are
/// re-derived from the first user message. Notes with a blank title or content are dropped and
/// provider settings fall back to their defaults field by field.
pub fn normalize_workspace_state(raw: &Value) -> Result<WorkspaceState, Rejected> {
    let object = raw.as_object().ok_or(Rejected::NotAnObject)?;
    check_version(object, WORKSPACE_VERSION)?;
    let raw_conversations = object
        .get("conversations")
        .and_then(Value::as_array)
        .ok_or(Rejected::BadField("conversations"))?;

    let mut seen = HashSet::new();
    let conversations: Vec<WorkspaceConversation> = raw_conversations
        .iter()
        .filter_map(conversation_from_value)
        .filter(|conversation| seen.insert(conversation.id().clone()))
        .collect();
    let Some(first) = conversations.first() else {
        return Err(Rejected::NoConversations);
    };

    let active_conversation_id = object
        .get("activeConversationId")
        .and_then(Value::as_str)
        .and_then(|id| ConversationId::new(id).ok())
        .unwrap_or_else(|| first.id().clone());

    let notes = object
        .get("notes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(note_from_value)
        .collect();

    WorkspaceState::new(
        conversations,
        active_conversation_id,
        notes,
        provider_from_value(object.get("modelProvider")),
    )
    .ok_or(Rejected::NoConversations)
}

fn workspace_to_json(state: &WorkspaceState) -> WorkspaceJson {
    WorkspaceJson {
        version: WORKSPACE_VERSION,
        conversations: state
            .conversations()
            .iter()
            .map(|conversation| ConversationJson {
                id: conversation.id().to_string(),
                title: conversation.title().to_owned(),
                title_edited: conversation.title_edited(),
                created_at: conversation.created_at().to_owned(),
                updated_at: conversation.updated_at().to_owned(),
                snapshot: snapshot_to_json(conversation.snapshot()),
            })
            .collect(),
        active_conversation_id: state.active_conversation_id().to_string(),
        notes: state
            .notes()
            .iter()
            .map(|note| NoteJson {
                id: note.id.to_string(),
                title: note.title.clone(),
                content: note.content.clone(),
                source_conversation_id: note.source_conversation_id.to_string(),
                source_node_id: note.source_node_id.to_string(),
                source_message_id: note.source_message_id.to_string(),
                created_at: note.created_at.clone(),
            })
            .collect(),
        model_provider: ModelProviderJson {
            provider_url: state.model_provider().provider_url.clone(),
            api_key: state.model_provider().api_key.clone(),
        },
    }
}

/// Encodes `state` in the camelCase wire format without validating it.
pub fn workspace_to_value(state: &WorkspaceState) -> Result<Value, serde_json::Error> {
    serde_json::to_value(workspace_to_json(state))
}
