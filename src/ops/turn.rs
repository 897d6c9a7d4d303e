// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turns: user prompts, assistant placeholders, retries and streamed reply content.

use super::{ObjectKind, OpError};
use crate::model::{ChatMessage, ConversationSnapshot, MessageId, NodeId};

/// Content given to a reply that was interrupted before any text arrived.
pub const INTERRUPTED_PLACEHOLDER: &str = "[interrupted]";

/// An empty streaming assistant message waiting for the reply streamer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub node_id: NodeId,
    pub message_id: MessageId,
    pub prompt_message_id: MessageId,
    pub prompt: String,
    /// Earlier replies to the same prompt, oldest first.
    pub prior_replies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnAppended {
    pub snapshot: ConversationSnapshot,
    pub user_message_id: MessageId,
    pub reply: PendingReply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryStarted {
    pub snapshot: ConversationSnapshot,
    pub retry_index: u32,
    pub reply: PendingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed,
}

impl StreamOutcome {
    pub fn is_interrupted(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Appends a user message and an empty streaming reply to the active node.
pub fn append_user_message(
    snapshot: &ConversationSnapshot,
    content: &str,
) -> Result<TurnAppended, OpError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(OpError::Empty { field: "message" });
    }

    let mut next = snapshot.clone();
    let node_id = next.active_node_id().clone();
    let user = ChatMessage::user(node_id.clone(), content);
    let placeholder = ChatMessage::pending_reply(node_id.clone(), user.id().clone(), 1);
    let reply = PendingReply {
        node_id: node_id.clone(),
        message_id: placeholder.id().clone(),
        prompt_message_id: user.id().clone(),
        prompt: content.to_owned(),
        prior_replies: Vec::new(),
    };
    let user_message_id = user.id().clone();

    let bucket = next
        .messages_mut(&node_id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Node, &node_id))?;
    bucket.push(user);
    bucket.push(placeholder);

    Ok(TurnAppended {
        snapshot: next,
        user_message_id,
        reply,
    })
}

/// Starts another reply to the user message `reply_to_message_id` in `node_id`.
///
/// The new streaming message is inserted directly after the last existing reply to that
/// prompt (or after the prompt itself) with the next `retry_index`.
pub fn retry(
    snapshot: &ConversationSnapshot,
    node_id: &NodeId,
    reply_to_message_id: &MessageId,
) -> Result<RetryStarted, OpError> {
    if !snapshot.contains_node(node_id) {
        return Err(OpError::not_found(ObjectKind::Node, node_id));
    }
    let bucket = snapshot.messages(node_id);
    let prompt_idx = bucket
        .iter()
        .position(|message| message.id() == reply_to_message_id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Message, reply_to_message_id))?;
    let prompt = &bucket[prompt_idx];
    if !prompt.is_user() {
        return Err(OpError::NotAPrompt {
            id: reply_to_message_id.to_string(),
        });
    }

    let variants: Vec<(usize, &ChatMessage)> = bucket
        .iter()
        .enumerate()
        .filter(|(_, message)| message.is_assistant() && message.is_reply_to(reply_to_message_id))
        .collect();
    let insert_at = variants.last().map_or(prompt_idx + 1, |(idx, _)| idx + 1);
    let retry_index = u32::try_from(variants.len()).unwrap_or(u32::MAX).saturating_add(1);
    let prior_replies = variants
        .iter()
        .map(|(_, message)| message.content())
        .filter(|content| !content.is_empty() && *content != INTERRUPTED_PLACEHOLDER)
        .map(ToOwned::to_owned)
        .collect();
    let prompt_text = prompt.content().to_owned();

    let placeholder =
        ChatMessage::pending_reply(node_id.clone(), reply_to_message_id.clone(), retry_index);
    let reply = PendingReply {
        node_id: node_id.clone(),
        message_id: placeholder.id().clone(),
        prompt_message_id: reply_to_message_id.clone(),
        prompt: prompt_text,
        prior_replies,
    };

    let mut next = snapshot.clone();
    if let Some(bucket) = next.messages_mut(node_id) {
        bucket.insert(insert_at, placeholder);
    }

    Ok(RetryStarted {
        snapshot: next,
        retry_index,
        reply,
    })
}

/// Appends streamed text to one message. Messages that are no longer streaming are left alone.
pub fn apply_stream_delta(
    snapshot: &ConversationSnapshot,
    message_id: &MessageId,
    delta: &str,
) -> ConversationSnapshot {
    let mut next = snapshot.clone();
    if let Some(message) = next.find_message_mut(message_id) {
        if message.is_streaming() {
            message.push_content(delta);
        }
    }
    next
}

/// Marks a streaming message as finished.
///
/// Interrupted replies keep whatever partial text they received; an interrupted reply with no
/// text at all gets [`INTERRUPTED_PLACEHOLDER`].
pub fn finish_stream(
    snapshot: &ConversationSnapshot,
    message_id: &MessageId,
    outcome: StreamOutcome,
) -> ConversationSnapshot {
    let mut next = snapshot.clone();
    if let Some(message) = next.find_message_mut(message_id) {
        if message.is_streaming() {
            message.set_streaming(false);
            if outcome.is_interrupted() && message.content().is_empty() {
                message.set_content(INTERRUPTED_PLACEHOLDER);
            }
        }
    }
    next
}
