// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::ids::{MessageId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Provenance of a message created from a quoted text selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quote {
    pub text: Option<String>,
    pub preview: Option<String>,
    pub message_id: Option<MessageId>,
    pub node_id: Option<NodeId>,
}

impl Quote {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.preview.is_none()
            && self.message_id.is_none()
            && self.node_id.is_none()
    }
}

/// One utterance in a node's message bucket.
///
/// Assistant replies point at the user message they answer via `reply_to_message_id`; all
/// replies to the same prompt form a retry group ordered by `retry_index` (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    id: MessageId,
    node_id: NodeId,
    role: Role,
    content: String,
    reply_to_message_id: Option<MessageId>,
    retry_index: Option<u32>,
    is_streaming: bool,
    quote: Quote,
}

impl ChatMessage {
    pub fn new(id: MessageId, node_id: NodeId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            node_id,
            role,
            content: content.into(),
            reply_to_message_id: None,
            retry_index: None,
            is_streaming: false,
            quote: Quote::default(),
        }
    }

    pub fn user(node_id: NodeId, content: impl Into<String>) -> Self {
        Self::new(MessageId::fresh("m-user"), node_id, Role::User, content)
    }

    /// An empty, streaming assistant reply to `reply_to`.
    pub fn pending_reply(node_id: NodeId, reply_to: MessageId, retry_index: u32) -> Self {
        let mut message = Self::new(MessageId::fresh("m-assistant"), node_id, Role::Assistant, "");
        message.reply_to_message_id = Some(reply_to);
        message.retry_index = Some(retry_index);
        message.is_streaming = true;
        message
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn set_id(&mut self, id: MessageId) {
        self.id = id;
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn set_node_id(&mut self, node_id: NodeId) {
        self.node_id = node_id;
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn push_content(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    pub fn reply_to_message_id(&self) -> Option<&MessageId> {
        self.reply_to_message_id.as_ref()
    }

    pub fn set_reply_to_message_id(&mut self, reply_to_message_id: Option<MessageId>) {
        self.reply_to_message_id = reply_to_message_id;
    }

    pub fn retry_index(&self) -> Option<u32> {
        self.retry_index
    }

    pub fn set_retry_index(&mut self, retry_index: Option<u32>) {
        self.retry_index = retry_index;
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn set_streaming(&mut self, is_streaming: bool) {
        self.is_streaming = is_streaming;
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn set_quote(&mut self, quote: Quote) {
        self.quote = quote;
    }

    pub fn is_reply_to(&self, prompt_id: &MessageId) -> bool {
        self.is_assistant() && self.reply_to_message_id.as_ref() == Some(prompt_id)
    }
}
