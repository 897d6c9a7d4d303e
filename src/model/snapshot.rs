// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashSet};

use super::ids::{MessageId, NodeId};
use super::message::ChatMessage;
use super::node::GraphNode;
use super::tags::ConversationTag;
use super::title;

/// The full state of one conversation: the node tree, one message bucket per node, the active
/// node pointer and the conversation's tags.
///
/// Snapshots are values. Operations in [`crate::ops`] take a snapshot by reference and return
/// a new one; a snapshot handed out earlier never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    nodes: Vec<GraphNode>,
    messages_by_node: BTreeMap<NodeId, Vec<ChatMessage>>,
    active_node_id: NodeId,
    conversation_tags: Vec<ConversationTag>,
    dismissed_auto_tags: Vec<String>,
}

impl ConversationSnapshot {
    /// Assembles a snapshot, adding an empty bucket for every node that lacks one and falling
    /// back to the first node when `active_node_id` is unknown.
    ///
    /// Returns `None` when `nodes` is empty.
    pub fn from_parts(
        nodes: Vec<GraphNode>,
        mut messages_by_node: BTreeMap<NodeId, Vec<ChatMessage>>,
        active_node_id: NodeId,
    ) -> Option<Self> {
        let first = nodes.first()?.id().clone();
        for node in &nodes {
            messages_by_node.entry(node.id().clone()).or_default();
        }
        let active_node_id = if nodes.iter().any(|node| node.id() == &active_node_id) {
            active_node_id
        } else {
            first
        };

        Some(Self {
            nodes,
            messages_by_node,
            active_node_id,
            conversation_tags: Vec::new(),
            dismissed_auto_tags: Vec::new(),
        })
    }

    /// A snapshot holding only `root`, with an empty bucket and `root` active.
    pub fn with_root(root: GraphNode) -> Self {
        let root_id = root.id().clone();
        Self {
            messages_by_node: BTreeMap::from([(root_id.clone(), Vec::new())]),
            nodes: vec![root],
            active_node_id: root_id,
            conversation_tags: Vec::new(),
            dismissed_auto_tags: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<GraphNode> {
        &mut self.nodes
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id() == node_id)
    }

    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|node| node.id() == node_id)
    }

    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.node(node_id).is_some()
    }

    pub fn root(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.is_root())
    }

    pub fn children_of<'a>(&'a self, parent_id: &'a NodeId) -> impl Iterator<Item = &'a GraphNode> {
        self.nodes
            .iter()
            .filter(move |node| node.parent_id() == Some(parent_id))
    }

    /// True while the conversation has never been branched.
    pub fn is_linear(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn messages_by_node(&self) -> &BTreeMap<NodeId, Vec<ChatMessage>> {
        &self.messages_by_node
    }

    pub fn messages_by_node_mut(&mut self) -> &mut BTreeMap<NodeId, Vec<ChatMessage>> {
        &mut self.messages_by_node
    }

    pub fn messages(&self, node_id: &NodeId) -> &[ChatMessage] {
        self.messages_by_node
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Bucket of a known node, created empty on first use. `None` for unknown nodes.
    pub fn messages_mut(&mut self, node_id: &NodeId) -> Option<&mut Vec<ChatMessage>> {
        if !self.contains_node(node_id) {
            return None;
        }
        Some(self.messages_by_node.entry(node_id.clone()).or_default())
    }

    /// Finds a message anywhere in the snapshot.
    pub fn find_message(&self, message_id: &MessageId) -> Option<&ChatMessage> {
        self.nodes
            .iter()
            .flat_map(|node| self.messages(node.id()))
            .find(|message| message.id() == message_id)
    }

    pub fn find_message_mut(&mut self, message_id: &MessageId) -> Option<&mut ChatMessage> {
        self.messages_by_node
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .find(|message| message.id() == message_id)
    }

    /// Content of the first user message, walking nodes in insertion order.
    pub fn first_user_text(&self) -> Option<&str> {
        self.nodes
            .iter()
            .flat_map(|node| self.messages(node.id()))
            .find(|message| message.is_user())
            .map(ChatMessage::content)
    }

    pub fn derived_title(&self) -> String {
        title::conversation_title_from(self.first_user_text())
    }

    pub fn active_node_id(&self) -> &NodeId {
        &self.active_node_id
    }

    /// Points the snapshot at `node_id`. Unknown ids are ignored and `false` is returned.
    pub fn set_active_node_id(&mut self, node_id: NodeId) -> bool {
        if !self.contains_node(&node_id) {
            return false;
        }
        self.active_node_id = node_id;
        true
    }

    pub fn conversation_tags(&self) -> &[ConversationTag] {
        &self.conversation_tags
    }

    pub fn set_conversation_tags(&mut self, tags: Vec<ConversationTag>) {
        self.conversation_tags = tags;
    }

    pub fn dismissed_auto_tags(&self) -> &[String] {
        &self.dismissed_auto_tags
    }

    pub fn set_dismissed_auto_tags(&mut self, dismissed: Vec<String>) {
        self.dismissed_auto_tags = dismissed;
    }

    /// Checks the tree invariant: one root, every parent resolves, no cycles.
    pub fn is_well_formed_tree(&self) -> bool {
        let ids: HashSet<&NodeId> = self.nodes.iter().map(GraphNode::id).collect();
        if ids.len() != self.nodes.len() {
            return false;
        }
        if self.nodes.iter().filter(|node| node.is_root()).count() != 1 {
            return false;
        }

        let parents: BTreeMap<&NodeId, Option<&NodeId>> = self
            .nodes
            .iter()
            .map(|node| (node.id(), node.parent_id()))
            .collect();

        self.nodes.iter().all(|node| {
            let mut steps = 0usize;
            let mut cursor = node.parent_id();
            while let Some(parent_id) = cursor {
                let Some(next) = parents.get(parent_id) else {
                    return false;
                };
                steps += 1;
                if steps > self.nodes.len() {
                    return false;
                }
                cursor = *next;
            }
            true
        })
    }
}
