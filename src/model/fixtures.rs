// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#[cfg(test)]
use std::collections::BTreeMap;

use super::ids::{ConversationId, NodeId};
#[cfg(test)]
use super::ids::MessageId;
#[cfg(test)]
use super::message::{ChatMessage, Role};
use super::node::{GraphNode, Position};
use super::snapshot::ConversationSnapshot;
use super::title::DEFAULT_CONVERSATION_TITLE;
use super::workspace::{ModelProviderSettings, WorkspaceConversation, WorkspaceState};

pub(crate) const ROOT_POSITION: Position = Position { x: 40.0, y: 140.0 };

#[cfg(test)]
fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

#[cfg(test)]
fn mid(value: &str) -> MessageId {
    MessageId::new(value).expect("message id")
}

/// A conversation with a single empty root node.
pub(crate) fn seed_snapshot(created_at: &str) -> ConversationSnapshot {
    ConversationSnapshot::with_root(GraphNode::new(
        NodeId::seed_root(),
        None,
        DEFAULT_CONVERSATION_TITLE,
        created_at,
        ROOT_POSITION,
    ))
}

pub(crate) fn seed_conversation(created_at: &str) -> WorkspaceConversation {
    WorkspaceConversation::new(
        ConversationId::fresh_conversation(),
        DEFAULT_CONVERSATION_TITLE,
        created_at,
        created_at,
        seed_snapshot(created_at),
    )
}

pub(crate) fn seed_workspace(created_at: &str) -> WorkspaceState {
    let conversation = seed_conversation(created_at);
    let active = conversation.id().clone();
    WorkspaceState::from_parts_unchecked(
        vec![conversation],
        active,
        Vec::new(),
        ModelProviderSettings::default(),
    )
}

/// Linear root-only conversation; each turn is `user` followed by one assistant reply that
/// links back to it. Message ids are `u<n>` / `a<n>` (1-based).
#[cfg(test)]
pub(crate) fn linear_snapshot(turns: &[(&str, &str)]) -> ConversationSnapshot {
    let root = NodeId::seed_root();
    let mut bucket = Vec::new();
    for (idx, (user, assistant)) in turns.iter().enumerate() {
        let turn = idx + 1;
        let user_id = mid(&format!("u{turn}"));
        bucket.push(ChatMessage::new(user_id.clone(), root.clone(), Role::User, *user));
        let mut reply =
            ChatMessage::new(mid(&format!("a{turn}")), root.clone(), Role::Assistant, *assistant);
        reply.set_reply_to_message_id(Some(user_id));
        reply.set_retry_index(Some(1));
        bucket.push(reply);
    }

    let node = GraphNode::new(
        root.clone(),
        None,
        "Starting question",
        "2026-01-01T00:00:00.000Z",
        ROOT_POSITION,
    );
    ConversationSnapshot::from_parts(vec![node], BTreeMap::from([(root.clone(), bucket)]), root)
        .expect("fixture snapshot")
}

/// Root with two children (`left`, `right`); `right` has one grandchild (`deep`).
#[cfg(test)]
pub(crate) fn branched_snapshot() -> ConversationSnapshot {
    let at = "2026-01-01T00:00:00.000Z";
    let root = NodeId::seed_root();
    let left = nid("left");
    let right = nid("right");
    let deep = nid("deep");

    let nodes = vec![
        GraphNode::new(root.clone(), None, "Root", at, Position::new(40.0, 140.0)),
        GraphNode::new(left.clone(), Some(root.clone()), "Left", at, Position::new(680.0, 140.0)),
        GraphNode::new(right.clone(), Some(root.clone()), "Right", at, Position::new(680.0, 520.0)),
        GraphNode::new(deep.clone(), Some(right.clone()), "Deep", at, Position::new(1320.0, 520.0)),
    ];

    let mut messages = BTreeMap::new();
    for node_id in [&root, &left, &right, &deep] {
        let user_id = mid(&format!("{node_id}-u"));
        let mut reply = ChatMessage::new(
            mid(&format!("{node_id}-a")),
            node_id.clone(),
            Role::Assistant,
            format!("answer in {node_id}"),
        );
        reply.set_reply_to_message_id(Some(user_id.clone()));
        reply.set_retry_index(Some(1));
        messages.insert(
            node_id.clone(),
            vec![
                ChatMessage::new(user_id, node_id.clone(), Role::User, format!("ask in {node_id}")),
                reply,
            ],
        );
    }

    ConversationSnapshot::from_parts(nodes, messages, right).expect("fixture snapshot")
}
