// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Branch creation.
//!
//! A branch is a new child node whose bucket starts as a copy of its source node's history up
//! to the chosen message. A linear conversation is first split into one node per turn so the
//! branch hangs off the exact turn it was created from.

use std::collections::HashMap;

use super::turn::PendingReply;
use super::{ObjectKind, OpError};
use crate::layout::{next_branch_position, resolve_non_overlapping_position, ResolveRequest};
use crate::model::title::{branch_title, quote_preview};
use crate::model::{
    ChatMessage, ConversationSnapshot, GraphNode, MessageId, NodeId, Quote, Role,
};
use crate::topology::build_turn_topology;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchMode {
    /// Copy the history and continue from it.
    Clone,
    /// Copy the history and ask a follow-up about a quoted passage.
    Selection { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRequest {
    pub mode: BranchMode,
    pub source_node_id: NodeId,
    pub source_message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchCreated {
    pub snapshot: ConversationSnapshot,
    pub node_id: NodeId,
    /// The source node after a linear conversation was split into turns.
    pub source_node_id: NodeId,
    /// Set in selection mode: the placeholder answering the quoted follow-up.
    pub reply: Option<PendingReply>,
}

fn selection_prompt(text: &str) -> String {
    let quoted = text
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Let's continue from this passage. Treat the quoted text as the priority context and \
         answer with it first in mind:\n\n{quoted}"
    )
}

/// Copies `bucket` into `node_id` with fresh message ids.
///
/// Reply links are remapped to the copies; links to messages outside the copy are dropped.
fn copy_history(bucket: &[ChatMessage], node_id: &NodeId) -> Vec<ChatMessage> {
    let fresh_ids: HashMap<&MessageId, MessageId> = bucket
        .iter()
        .map(|message| {
            let prefix = match message.role() {
                Role::User => "m-user",
                Role::Assistant => "m-assistant",
            };
            (message.id(), MessageId::fresh(prefix))
        })
        .collect();

    bucket
        .iter()
        .map(|message| {
            let mut copy = message.clone();
            if let Some(id) = fresh_ids.get(message.id()) {
                copy.set_id(id.clone());
            }
            copy.set_node_id(node_id.clone());
            copy.set_streaming(false);
            copy.set_reply_to_message_id(
                message
                    .reply_to_message_id()
                    .and_then(|reply_to| fresh_ids.get(reply_to))
                    .cloned(),
            );
            copy
        })
        .collect()
}

/// Splits a single-node conversation into turns and returns the node now holding
/// `source_message_id`.
fn promote_linear(
    snapshot: &mut ConversationSnapshot,
    source_message_id: &MessageId,
    created_at: &str,
) -> Result<NodeId, OpError> {
    let Some(root) = snapshot.nodes().first() else {
        return Err(OpError::not_found(ObjectKind::Message, source_message_id));
    };
    let topology = build_turn_topology(snapshot.messages(root.id()), created_at);
    let source_node_id = topology
        .node_for_message(source_message_id)
        .cloned()
        .ok_or_else(|| OpError::not_found(ObjectKind::Message, source_message_id))?;

    *snapshot.nodes_mut() = topology.nodes;
    *snapshot.messages_by_node_mut() = topology.messages_by_node;
    snapshot.set_active_node_id(topology.last_node_id);
    Ok(source_node_id)
}

/// Creates a branch below the node holding `request.source_message_id`.
///
/// The new node becomes active. Its position starts at the next free slot next to the source
/// node and is then pushed down until it overlaps nothing.
pub fn create_branch(
    snapshot: &ConversationSnapshot,
    request: &BranchRequest,
    created_at: &str,
) -> Result<BranchCreated, OpError> {
    let selection = match &request.mode {
        BranchMode::Clone => None,
        BranchMode::Selection { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Err(OpError::Empty { field: "selection" });
            }
            Some(text)
        }
    };

    if !snapshot.contains_node(&request.source_node_id) {
        return Err(OpError::not_found(ObjectKind::Node, &request.source_node_id));
    }
    let source_message = snapshot
        .messages(&request.source_node_id)
        .iter()
        .find(|message| message.id() == &request.source_message_id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Message, &request.source_message_id))?;
    let source_content = source_message.content().to_owned();

    let mut next = snapshot.clone();
    let source_node_id = if next.is_linear() {
        promote_linear(&mut next, &request.source_message_id, created_at)?
    } else {
        request.source_node_id.clone()
    };

    // Retry variants dropped while promoting are no longer in the bucket; branch from the
    // whole turn in that case.
    let source_bucket = next.messages(&source_node_id);
    let cut = source_bucket
        .iter()
        .position(|message| message.id() == &request.source_message_id)
        .map_or(source_bucket.len(), |idx| idx + 1);

    let node_id = NodeId::fresh_node();
    let mut bucket = copy_history(&source_bucket[..cut], &node_id);

    let title = branch_title(selection.unwrap_or(&source_content));
    let title = if title.is_empty() {
        next.node(&source_node_id)
            .map(|node| node.title().to_owned())
            .unwrap_or_default()
    } else {
        title
    };

    let reply = selection.map(|text| {
        let mut prompt = ChatMessage::user(node_id.clone(), selection_prompt(text));
        prompt.set_quote(Quote {
            text: Some(text.to_owned()),
            preview: Some(quote_preview(text)),
            message_id: Some(request.source_message_id.clone()),
            node_id: Some(source_node_id.clone()),
        });
        let placeholder = ChatMessage::pending_reply(node_id.clone(), prompt.id().clone(), 1);
        let reply = PendingReply {
            node_id: node_id.clone(),
            message_id: placeholder.id().clone(),
            prompt_message_id: prompt.id().clone(),
            prompt: prompt.content().to_owned(),
            prior_replies: Vec::new(),
        };
        bucket.push(prompt);
        bucket.push(placeholder);
        reply
    });

    let candidate = next_branch_position(next.nodes(), &source_node_id);
    next.nodes_mut().push(GraphNode::new(
        node_id.clone(),
        Some(source_node_id.clone()),
        title,
        created_at,
        candidate,
    ));
    next.messages_by_node_mut().insert(node_id.clone(), bucket);

    let position = resolve_non_overlapping_position(&ResolveRequest::new(
        next.nodes(),
        next.messages_by_node(),
        &node_id,
        candidate,
    ));
    if let Some(node) = next.node_mut(&node_id) {
        node.set_position(position);
    }
    next.set_active_node_id(node_id.clone());

    tracing::debug!(
        node_id = %node_id,
        source_node_id = %source_node_id,
        selection = selection.is_some(),
        "branch created"
    );

    Ok(BranchCreated {
        snapshot: next,
        node_id,
        source_node_id,
        reply,
    })
}
